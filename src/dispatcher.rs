//! C10 — request dispatcher: the axum HTTP entrypoint driving
//! C6 → C7 → C8 → C4 → C9 for a single request (spec §4.6).

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::codec::OpaqueIdCodec;
use crate::eligibility;
use crate::error::BidError;
use crate::flight::DemandFlight;
use crate::metrics::Metrics;
use crate::pricing::{self, UrlTokens};
use crate::recall::{RecallRecord, RecallSink};
use crate::request;
use crate::response::{self, Bid, Outcome, SeatBid};
use crate::snapshot::SnapshotPublisher;

#[derive(Clone)]
pub struct AppState {
    pub publisher: Arc<SnapshotPublisher>,
    pub recall_sink: Arc<dyn RecallSink>,
    pub codec: Arc<OpaqueIdCodec>,
    pub test_only: bool,
    pub metrics: Arc<Metrics>,
}

/// axum handler for `POST /bid`. Acquires the current snapshot once, builds a
/// [`DemandFlight`], and runs the pipeline inside a spawned task so that a
/// panic anywhere in it is caught at this boundary rather than taking down
/// the listener (spec §4.6, §7 `PolicyError`).
pub async fn handle_bid(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let snapshot = state.publisher.current();
    let host = headers
        .get(axum::http::header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    state.metrics.requests_total.increment(1);

    let pipeline = {
        let state = state.clone();
        tokio::spawn(async move { run_pipeline(snapshot, host, body, state).await })
    };

    match pipeline.await {
        Ok(response) => response,
        Err(join_err) => {
            let err = BidError::Policy(join_err.to_string());
            tracing::error!(error = %err, "bidding pipeline panicked, returning default status");
            state.metrics.errors_total.increment(1);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn run_pipeline(
    snapshot: Arc<crate::snapshot::Snapshot>,
    host: String,
    body: Bytes,
    state: AppState,
) -> Response {
    let start = std::time::Instant::now();

    let resolved = match request::normalize(&body, &snapshot) {
        Ok(resolved) => resolved,
        Err(decode_err) => {
            let mut flight = DemandFlight::new(snapshot, Default::default(), host);
            flight.set_error(BidError::Decode(decode_err));
            return write_response(flight, &state).await;
        }
    };

    let mut flight = DemandFlight::new(snapshot, resolved, host);
    flight.win_url = request::win_url(&flight.host);

    find_client(&mut flight);
    prepare_response(&mut flight, &state).await;
    let response = write_response(flight, &state).await;

    tracing::info!(elapsed_us = start.elapsed().as_micros() as u64, "bid request handled");
    response
}

/// C7 + C8: run the eligibility filter, then hand the eligible set to the
/// pluggable selector if non-empty (spec §4.3-§4.4). Mirrors the original's
/// `FindClient`.
fn find_client(flight: &mut DemandFlight) {
    if flight.has_error() {
        return;
    }

    let (eligible, total_cpc) = eligibility::filter(&flight.snapshot.folders, &flight.request);
    if eligible.is_empty() {
        tracing::debug!("no eligible folder found");
        return;
    }

    let policy = flight.snapshot.policy.clone();
    policy.select_folder_and_creative(flight, &eligible, total_cpc);
}

/// C8 pricing + C5 codec + C4 recall persistence + URL expansion. Mirrors the
/// original's `PrepareResponse`: the whole path runs unconditionally once a
/// folder was selected, and the error slot gates only the final append to
/// the response (SPEC_FULL.md §C.8).
async fn prepare_response(flight: &mut DemandFlight, state: &AppState) {
    if flight.folder_id == 0 {
        return;
    }

    let policy = flight.snapshot.policy.clone();
    let revshare = policy.calculate_revshare(flight);
    let price = pricing::bid_price(flight.full_price, revshare);
    flight.margin = pricing::margin(flight.full_price, price);

    let click_id = policy.generate_click_id(flight);

    let record = RecallRecord::from_flight(flight);
    match state.recall_sink.save(&record).await {
        Ok(id) => flight.recall_id = id,
        Err(err) => flight.set_error(BidError::Persistence(err.to_string())),
    }

    let opaque_clickid = state.codec.encrypt(flight.recall_id.to_string().as_bytes());

    let creative = flight.snapshot.creatives.by_id(flight.creative_id);
    let network = flight.snapshot.pseudonyms.network.label(flight.request.network_id);
    let subnetwork = flight.snapshot.pseudonyms.subnetwork.label(flight.request.subnetwork_id);
    let brand = flight.snapshot.pseudonyms.brand.label(flight.request.brand_id);
    let brand_url = flight.snapshot.pseudonyms.brand_slug.label(flight.request.brand_id);
    let vertical = flight.snapshot.pseudonyms.vertical.label(flight.request.vertical_id);
    let cpc = pricing::format_cpc(flight.full_price);

    flight.click_url = creative
        .map(|creative| {
            pricing::expand_url(
                &creative.redirect_url,
                &UrlTokens {
                    click_id: &click_id,
                    opaque_clickid: &opaque_clickid,
                    network: &network,
                    subnetwork: &subnetwork,
                    brand: &brand,
                    brand_url: &brand_url,
                    vertical: &vertical,
                    cpc: &cpc,
                    placement: &flight.request.raw.site.placement,
                },
            )
        })
        .unwrap_or_default();

    if flight.has_error() {
        tracing::warn!(error = ?flight.error, "error occurred while preparing response");
        return;
    }

    flight.response.seat_bids.push(SeatBid {
        bids: vec![Bid {
            id: flight.recall_id.to_string(),
            price,
            win_url: flight.win_url.clone(),
            url: flight.click_url.clone(),
        }],
    });
}

/// C9: classify the flight into HTTP 500 / 204 / 200 + JSON body (spec §4.5).
async fn write_response(flight: DemandFlight, state: &AppState) -> Response {
    let had_error = flight.has_error();
    let request_is_test = flight.request.raw.test;
    let outcome = response::classify(flight.response, had_error, state.test_only, request_is_test);

    match outcome {
        Outcome::Error => {
            state.metrics.errors_total.increment(1);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Outcome::NoContent => {
            state.metrics.no_bid_total.increment(1);
            StatusCode::NO_CONTENT.into_response()
        }
        Outcome::Bid(body) => match serde_json::to_vec(&body) {
            Ok(json) => {
                state.metrics.bids_total.increment(1);
                (
                    StatusCode::OK,
                    [(axum::http::header::CONTENT_LENGTH, json.len().to_string())],
                    json,
                )
                    .into_response()
            }
            Err(err) => {
                let err = BidError::Encode(err);
                tracing::error!(error = %err, "failed to encode bid response");
                state.metrics.errors_total.increment(1);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        },
    }
}
