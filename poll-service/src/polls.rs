//! Poll catalog endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::PollError;
use crate::metrics::record_poll_created;
use crate::state::AppState;
use crate::store::{Poll, PollOption};
use crate::types::{
    CreatePollRequest, PollList, PollListQuery, PollQuery, PollStatsResponse, PollView,
};
use crate::utils::is_blank;

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 10;

/// Validate a creation request and build the poll it describes.
///
/// Option ids are positional, "1" through "n".
pub fn build_poll(req: CreatePollRequest, now: DateTime<Utc>) -> Result<Poll, PollError> {
    let title = req.title.trim().to_string();
    if title.is_empty() {
        return Err(PollError::invalid("Poll title is required"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(PollError::InvalidInput(format!(
            "Title must be at most {} characters",
            MAX_TITLE_LEN
        )));
    }

    let description = req.description.unwrap_or_default().trim().to_string();
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(PollError::InvalidInput(format!(
            "Description must be at most {} characters",
            MAX_DESCRIPTION_LEN
        )));
    }

    if req.options.len() < MIN_OPTIONS {
        return Err(PollError::InvalidInput(format!(
            "At least {} options are required",
            MIN_OPTIONS
        )));
    }
    if req.options.len() > MAX_OPTIONS {
        return Err(PollError::InvalidInput(format!(
            "Maximum {} options allowed",
            MAX_OPTIONS
        )));
    }
    if req.options.iter().any(|text| is_blank(text)) {
        return Err(PollError::invalid("Option cannot be empty"));
    }

    if let Some(ends_at) = req.ends_at {
        if ends_at <= now {
            return Err(PollError::invalid("End time must be in the future"));
        }
    }

    Ok(Poll {
        id: uuid::Uuid::new_v4().simple().to_string(),
        title,
        description,
        options: req
            .options
            .iter()
            .enumerate()
            .map(|(i, text)| PollOption {
                id: (i + 1).to_string(),
                text: text.trim().to_string(),
            })
            .collect(),
        is_active: true,
        allow_multiple_votes: req.allow_multiple_votes,
        ends_at: req.ends_at,
        created_by: req.created_by.filter(|s| !is_blank(s)),
        created_at: now,
    })
}

/// Handle GET /polls
pub async fn list_polls(
    State(state): State<AppState>,
    Query(query): Query<PollListQuery>,
) -> Result<Json<PollList>, PollError> {
    let created_by = query.created_by.filter(|s| !is_blank(s));
    info!("GET /polls - Poll list requested (created_by={:?})", created_by);

    let now = Utc::now();
    let polls = state
        .ledger
        .list_polls(created_by.as_deref())
        .await?
        .into_iter()
        .map(|(poll, tally)| PollView::new(poll, &tally, now))
        .collect();

    Ok(Json(PollList { polls }))
}

/// Handle GET /polls/stats
pub async fn poll_stats(
    State(state): State<AppState>,
) -> Result<Json<PollStatsResponse>, PollError> {
    info!("GET /polls/stats - Summary requested");

    let summary = state.ledger.summary(Utc::now()).await?;
    Ok(Json(summary.into()))
}

/// Handle POST /polls
pub async fn create_poll(
    State(state): State<AppState>,
    payload: Result<Json<CreatePollRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PollView>), PollError> {
    let Json(req) = payload?;
    info!("POST /polls - Creating poll {:?}", req.title);

    let now = Utc::now();
    let poll = build_poll(req, now)?;
    state.ledger.create_poll(&poll).await?;
    record_poll_created();

    info!(
        "Poll {} created with {} options",
        poll.id,
        poll.options.len()
    );

    let view = PollView::new(poll, &Default::default(), now);
    Ok((StatusCode::CREATED, Json(view)))
}

/// Handle GET /polls/{poll_id}
pub async fn get_poll(
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
    Query(query): Query<PollQuery>,
) -> Result<Json<PollView>, PollError> {
    info!("GET /polls/{} - Poll requested", poll_id);

    let (poll, tally) = state.ledger.poll_with_tally(&poll_id).await?;
    let mut view = PollView::new(poll, &tally, Utc::now());

    if let Some(user_id) = query.user_id.filter(|s| !is_blank(s)) {
        let record = state.ledger.vote_record(&poll_id, &user_id).await?;
        view = view.with_voter(record);
    }

    Ok(Json(view))
}

/// Handle POST /polls/{poll_id}/close
pub async fn close_poll(
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
) -> Result<Json<PollView>, PollError> {
    info!("POST /polls/{}/close - Closing poll", poll_id);

    let (poll, tally) = state.ledger.close_poll(&poll_id).await?;
    Ok(Json(PollView::new(poll, &tally, Utc::now())))
}
