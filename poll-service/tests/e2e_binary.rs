mod common;
use common::setup_server;

use poll_service::types::{PollView, TallyResponse, VoteResponse};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
#[serial_test::serial]
async fn e2e_binary_endpoints() -> anyhow::Result<()> {
    let (base_url, _guard) = setup_server(&[]).await?;
    let client = reqwest::Client::new();

    // Test GET /healthz
    let health = client.get(format!("{}/healthz", base_url)).send().await?;
    assert!(health.status().is_success());

    // Test POST /polls
    let resp = client
        .post(format!("{}/polls", base_url))
        .json(&json!({
            "title": "What's your favorite programming language?",
            "description": "Choose your preferred language for web development",
            "options": ["JavaScript", "Python", "Rust"],
            "allowMultipleVotes": false,
            "createdBy": "user1"
        }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let poll: PollView = resp.json().await?;
    assert_eq!(poll.options.len(), 3);
    assert_eq!(poll.total_votes, 0);
    assert!(poll.is_active);

    // Test POST /polls/{id}/vote
    let vote: VoteResponse = client
        .post(format!("{}/polls/{}/vote", base_url, poll.id))
        .json(&json!({ "optionIds": ["3"], "userId": "u1" }))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    assert!(vote.success);
    assert_eq!(vote.voted_options, vec!["3".to_string()]);
    assert_eq!(vote.total_votes, 1);
    assert_eq!(vote.poll_total_votes, 1);

    // Second vote by the same user → 409
    let again = client
        .post(format!("{}/polls/{}/vote", base_url, poll.id))
        .json(&json!({ "optionIds": ["1"], "userId": "u1" }))
        .send()
        .await?;
    assert_eq!(again.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = again.json().await?;
    assert_eq!(body["error"], "You have already voted on this poll");

    // Test GET /polls/{id}/vote
    let tally: TallyResponse = client
        .get(format!("{}/polls/{}/vote", base_url, poll.id))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    assert_eq!(tally.poll_id, poll.id);
    assert_eq!(tally.votes.get("1"), Some(&0));
    assert_eq!(tally.votes.get("3"), Some(&1));
    assert_eq!(tally.total_votes, 1);

    // Test GET /polls/{id} with the voter's view
    let view: PollView = client
        .get(format!("{}/polls/{}?userId=u1", base_url, poll.id))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    assert_eq!(view.has_voted, Some(true));
    assert_eq!(view.user_votes, Some(vec!["3".to_string()]));
    assert_eq!(view.options[2].votes, 1);

    // Unknown poll → 404 on both vote routes
    let missing = client
        .get(format!("{}/polls/missing-poll/vote", base_url))
        .send()
        .await?;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    // Test GET /admin/stats without header → 401
    let stats_no_hdr = client
        .get(format!("{}/admin/stats", base_url))
        .send()
        .await?;
    assert_eq!(stats_no_hdr.status(), StatusCode::UNAUTHORIZED);

    // Test GET /admin/stats with correct token → 200
    let stats_ok: serde_json::Value = client
        .get(format!("{}/admin/stats", base_url))
        .header("x-metrics-token", "test-token")
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let votes = stats_ok["vote_total"].as_array().unwrap();
    let count = |outcome: &str| {
        votes
            .iter()
            .find(|v| v["outcome"] == outcome)
            .and_then(|v| v["count"].as_u64())
    };
    assert_eq!(count("success"), Some(1));
    assert_eq!(count("conflict"), Some(1));
    assert_eq!(stats_ok["polls_created_total"], 1);
    assert_eq!(stats_ok["storage"]["backend"], "sqlite");

    Ok(())
}

#[tokio::test]
#[serial_test::serial]
async fn e2e_per_client_anonymous_voting() -> anyhow::Result<()> {
    let (base_url, _guard) = setup_server(&[
        ("ANONYMOUS_VOTING", "per-client"),
        ("TRUST_PROXY_HEADERS", "true"),
    ])
    .await?;
    let client = reqwest::Client::new();

    let poll: PollView = client
        .post(format!("{}/polls", base_url))
        .json(&json!({ "title": "Lunch?", "options": ["Pizza", "Sushi"] }))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    for ip in ["203.0.113.1", "203.0.113.2"] {
        let resp = client
            .post(format!("{}/polls/{}/vote", base_url, poll.id))
            .header("x-forwarded-for", ip)
            .json(&json!({ "optionIds": ["2"] }))
            .send()
            .await?;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let repeat = client
        .post(format!("{}/polls/{}/vote", base_url, poll.id))
        .header("x-forwarded-for", "203.0.113.1")
        .json(&json!({ "optionIds": ["1"] }))
        .send()
        .await?;
    assert_eq!(repeat.status(), StatusCode::CONFLICT);

    let tally: TallyResponse = client
        .get(format!("{}/polls/{}/vote", base_url, poll.id))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(tally.votes.get("2"), Some(&2));
    assert_eq!(tally.total_votes, 2);

    Ok(())
}

#[tokio::test]
#[serial_test::serial]
async fn e2e_per_client_ignores_forwarded_header_by_default() -> anyhow::Result<()> {
    let (base_url, _guard) = setup_server(&[("ANONYMOUS_VOTING", "per-client")]).await?;
    let client = reqwest::Client::new();

    let poll: PollView = client
        .post(format!("{}/polls", base_url))
        .json(&json!({ "title": "Dinner?", "options": ["Curry", "Tacos"] }))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    // Both requests come from 127.0.0.1, whatever the header claims.
    let mut statuses = Vec::new();
    for ip in ["198.51.100.1", "198.51.100.2"] {
        let resp = client
            .post(format!("{}/polls/{}/vote", base_url, poll.id))
            .header("x-forwarded-for", ip)
            .json(&json!({ "optionIds": ["1"] }))
            .send()
            .await?;
        statuses.push(resp.status());
    }
    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::CONFLICT]);

    Ok(())
}
