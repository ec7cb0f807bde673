//! End-to-end pipeline scenarios, mirroring the literal walkthroughs in
//! SPEC_FULL.md (empty catalog, matched folder, country rejection with and
//! without the test bypass, CPC inheritance, bidfloor gate, revshare clamp).

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use dsp_bidder::catalog::sqlite::SqliteCatalogSource;
use dsp_bidder::codec::OpaqueIdCodec;
use dsp_bidder::dispatcher::{handle_bid, AppState};
use dsp_bidder::metrics::Metrics;
use dsp_bidder::pricing::SimplePolicy;
use dsp_bidder::recall::SqliteRecallSink;
use dsp_bidder::response::BidResponse;
use dsp_bidder::snapshot::SnapshotPublisher;
use tower::ServiceExt;

async fn seeded_state(sql: &str) -> AppState {
    let source = SqliteCatalogSource::open_in_memory().unwrap();
    if !sql.is_empty() {
        source.exec_batch(sql).unwrap();
    }
    let publisher = Arc::new(SnapshotPublisher::new(Arc::new(SimplePolicy)));
    publisher.reload(&source).await.unwrap();

    AppState {
        publisher,
        recall_sink: Arc::new(SqliteRecallSink::open_in_memory().unwrap()),
        codec: Arc::new(OpaqueIdCodec::from_config("0123456789abcdef:fedcba9876543210").unwrap()),
        test_only: false,
        metrics: Arc::new(Metrics::new()),
    }
}

fn bid_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/bid")
        .header("host", "dsp.example.com")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn post(state: AppState, body: &str) -> axum::response::Response {
    let app = axum::Router::new()
        .route("/bid", axum::routing::post(handle_bid))
        .with_state(state);
    app.oneshot(bid_request(body)).await.unwrap()
}

#[tokio::test]
async fn s1_empty_catalog_yields_no_content() {
    let state = seeded_state("").await;
    let response = post(state, r#"{"random255":0}"#).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn s2_matched_folder_returns_priced_bid() {
    let sql = "INSERT INTO folders (id, parent_id, active, cpc, creatives) VALUES (1, NULL, 1, 500, '9');
               INSERT INTO creatives (id, redirect_url) VALUES (9, 'http://ads.example/click?cpc={cpc}&n={network}');";
    let state = seeded_state(sql).await;

    let response = post(state, r#"{"random255":0,"impressions":[{"bidfloor":0}]}"#).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed: BidResponse = serde_json::from_slice(&body).unwrap();
    let bid = &parsed.seat_bids[0].bids[0];
    assert_eq!(bid.price, 490.0);
    assert!(bid.url.contains("cpc=0.005000"));
}

#[tokio::test]
async fn s3_country_mismatch_is_rejected_unless_request_is_test() {
    let sql = "INSERT INTO pseudonyms (dimension, value, id) VALUES ('country', 'US', 1), ('country', 'FR', 2);
               INSERT INTO folders (id, parent_id, active, cpc, country, creatives) VALUES (1, NULL, 1, 500, '1', '9');
               INSERT INTO creatives (id, redirect_url) VALUES (9, 'http://ads.example/click');";
    let state = seeded_state(sql).await;

    let response = post(
        state.clone(),
        r#"{"random255":0,"device":{"geo":{"country":"FR"}}}"#,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = post(
        state,
        r#"{"random255":0,"test":true,"device":{"geo":{"country":"FR"}}}"#,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn s4_child_folder_inherits_parent_cpc() {
    let sql = "INSERT INTO folders (id, parent_id, active, cpc, creatives) VALUES (1, NULL, 1, 300, '');
               INSERT INTO folders (id, parent_id, active, cpc, creatives) VALUES (2, 1, 1, 0, '9');
               INSERT INTO creatives (id, redirect_url) VALUES (9, 'http://ads.example/click?cpc={cpc}');";
    let state = seeded_state(sql).await;

    let response = post(state, r#"{"random255":0}"#).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed: BidResponse = serde_json::from_slice(&body).unwrap();
    assert!(parsed.seat_bids[0].bids[0].url.contains("cpc=0.003000"));
}

#[tokio::test]
async fn s5_bidfloor_above_folder_cpc_is_rejected() {
    let sql = "INSERT INTO folders (id, parent_id, active, cpc, creatives) VALUES (1, NULL, 1, 200, '9');
               INSERT INTO creatives (id, redirect_url) VALUES (9, 'http://ads.example/click');";
    let state = seeded_state(sql).await;

    let response = post(state, r#"{"random255":0,"impressions":[{"bidfloor":250}]}"#).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn s6_test_only_mode_suppresses_non_test_traffic() {
    let sql = "INSERT INTO folders (id, parent_id, active, cpc, creatives) VALUES (1, NULL, 1, 500, '9');
               INSERT INTO creatives (id, redirect_url) VALUES (9, 'http://ads.example/click');";
    let mut state = seeded_state(sql).await;
    state.test_only = true;

    let response = post(state.clone(), r#"{"random255":0}"#).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = post(state, r#"{"random255":0,"test":true}"#).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn malformed_body_yields_server_error() {
    let state = seeded_state("").await;
    let response = post(state, "not json").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
