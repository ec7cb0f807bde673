//! C9 — response writer: RTB response JSON or a no-content / error status
//! (spec §4.5, §6).

use serde::{Deserialize, Serialize};

/// One bid within a seat bid (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bid {
    pub id: String,
    pub price: f64,
    #[serde(rename = "winUrl")]
    pub win_url: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SeatBid {
    pub bids: Vec<Bid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BidResponse {
    #[serde(rename = "seatBids")]
    pub seat_bids: Vec<SeatBid>,
}

/// The three possible outcomes for the HTTP response (spec §4.5).
pub enum Outcome {
    Error,
    NoContent,
    Bid(BidResponse),
}

/// Applies test-only-mode suppression (spec §4.5): if the deployment only
/// wants test traffic and the inbound request isn't flagged test, any
/// accumulated seat bid is discarded before classification.
pub fn classify(mut response: BidResponse, had_error: bool, test_only: bool, request_is_test: bool) -> Outcome {
    if had_error {
        return Outcome::Error;
    }
    if test_only && !request_is_test && !response.seat_bids.is_empty() {
        tracing::info!("test-only mode: discarding bid for non-test request");
        response.seat_bids.clear();
    }
    if response.seat_bids.is_empty() {
        Outcome::NoContent
    } else {
        Outcome::Bid(response)
    }
}
