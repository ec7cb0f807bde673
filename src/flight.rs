//! `DemandFlight` — per-request mutable state bound to the snapshot acquired
//! at request entry (spec §3, §9 "Per-request mutable state with a read-only
//! snapshot reference").

use std::sync::Arc;
use std::time::Instant;

use crate::error::BidError;
use crate::request::ResolvedRequest;
use crate::response::BidResponse;
use crate::snapshot::Snapshot;

/// Constructed on HTTP entry, destroyed on response flush. Ownership is
/// exclusive to the handling task (spec §3).
pub struct DemandFlight {
    pub snapshot: Arc<Snapshot>,
    pub request: ResolvedRequest,
    pub host: String,

    pub folder_id: i64,
    pub creative_id: i64,
    /// Pre-revshare price, in the same micro-units as CPC.
    pub full_price: i64,
    pub margin: i64,
    pub recall_id: i64,
    pub win_url: String,
    pub click_url: String,

    pub response: BidResponse,
    pub error: Option<BidError>,

    pub start_time: Instant,
}

impl DemandFlight {
    pub fn new(snapshot: Arc<Snapshot>, request: ResolvedRequest, host: String) -> Self {
        Self {
            snapshot,
            request,
            host,
            folder_id: 0,
            creative_id: 0,
            full_price: 0,
            margin: 0,
            recall_id: 0,
            win_url: String::new(),
            click_url: String::new(),
            response: BidResponse::default(),
            error: None,
            start_time: Instant::now(),
        }
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn set_error(&mut self, err: BidError) {
        if self.error.is_none() {
            tracing::warn!(error = %err, "recording pipeline error");
            self.error = Some(err);
        }
    }
}
