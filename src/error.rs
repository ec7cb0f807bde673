//! Error taxonomy for the bidding pipeline.
//!
//! The pipeline carries a single error slot (see [`crate::flight::DemandFlight`]).
//! `CatalogError` is deliberately never written there — a missing dimension
//! pseudonym resolves to id 0 and is only logged (spec §7).

use thiserror::Error;

/// Errors that can be recorded in a [`crate::flight::DemandFlight`]'s error slot.
#[derive(Debug, Error)]
pub enum BidError {
    /// Malformed request body.
    #[error("failed to decode bid request: {0}")]
    Decode(#[from] serde_json::Error),

    /// Recall sink failed to persist the flight.
    #[error("recall sink failure: {0}")]
    Persistence(String),

    /// Response serialization failure.
    #[error("failed to encode bid response: {0}")]
    Encode(serde_json::Error),

    /// The pluggable selector/pricer panicked.
    #[error("bidding policy panicked: {0}")]
    Policy(String),
}

/// Errors from loading a fresh [`crate::snapshot::Snapshot`] from the catalog source.
///
/// A `CatalogLoadError` aborts the reload cycle with no publication (spec §4.1);
/// it never reaches a request's error slot.
#[derive(Debug, Error)]
pub enum CatalogLoadError {
    #[error("failed to load folders: {0}")]
    Folders(#[source] anyhow::Error),
    #[error("failed to load creatives: {0}")]
    Creatives(#[source] anyhow::Error),
    #[error("failed to load users: {0}")]
    Users(#[source] anyhow::Error),
    #[error("failed to load pseudonyms: {0}")]
    Pseudonyms(#[source] anyhow::Error),
}
