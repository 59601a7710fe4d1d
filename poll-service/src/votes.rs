//! Vote submission and tally endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Json,
    Extension,
};
use tracing::{info, warn};

use crate::error::PollError;
use crate::ledger::Voter;
use crate::metrics::{record_vote_outcome, VoteOutcome};
use crate::middleware::ClientIp;
use crate::state::AppState;
use crate::types::{TallyResponse, VoteRequest, VoteResponse};

/// Handle POST /polls/{poll_id}/vote
pub async fn submit_vote(
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
    Extension(ClientIp(client)): Extension<ClientIp>,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> Result<Json<VoteResponse>, PollError> {
    let result = match payload {
        Ok(Json(req)) => {
            let voter = Voter::from_request(req.user_id, client);
            state.ledger.submit_vote(&poll_id, voter, req.option_ids).await
        }
        Err(rejection) => Err(PollError::from(rejection)),
    };

    match result {
        Ok(vote) => {
            record_vote_outcome(VoteOutcome::Success);
            info!(
                "POST /polls/{}/vote - Recorded {} option(s), poll total {}",
                poll_id,
                vote.voted_options.len(),
                vote.poll_total
            );
            Ok(Json(VoteResponse {
                success: true,
                message: "Vote recorded successfully".to_string(),
                total_votes: vote.voted_options.len(),
                voted_options: vote.voted_options,
                poll_total_votes: vote.poll_total,
            }))
        }
        Err(e) => {
            record_vote_outcome(VoteOutcome::from(&e));
            if e.is_retryable() {
                warn!("POST /polls/{}/vote - {}", poll_id, e);
            } else {
                info!("POST /polls/{}/vote - Rejected: {}", poll_id, e);
            }
            Err(e)
        }
    }
}

/// Handle GET /polls/{poll_id}/vote
pub async fn get_tally(
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
) -> Result<Json<TallyResponse>, PollError> {
    info!("GET /polls/{}/vote - Tally requested", poll_id);

    let tally = state.ledger.get_tally(&poll_id).await.map_err(|e| {
        if e.is_retryable() {
            warn!("GET /polls/{}/vote - {}", poll_id, e);
        }
        e
    })?;

    Ok(Json(tally.into()))
}
