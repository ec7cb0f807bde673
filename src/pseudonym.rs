//! C1 — dimension pseudonym tables.
//!
//! Bidirectional maps between opaque external strings and dense per-snapshot
//! integer ids, one per targeting dimension. IDs are stable only within the
//! snapshot that produced them (spec §3).

use std::collections::HashMap;

/// One dimension's forward (string -> id) and inverse (id -> string) tables.
#[derive(Debug, Clone, Default)]
pub struct DimensionTable {
    forward: HashMap<String, i64>,
    inverse: HashMap<i64, String>,
}

impl DimensionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, value: impl Into<String>, id: i64) {
        let value = value.into();
        self.inverse.insert(id, value.clone());
        self.forward.insert(value, id);
    }

    /// Resolve a raw string to its id, or 0 with the miss logged (spec §3: "Missing
    /// lookups are not errors: they produce id=0 and are logged").
    pub fn resolve(&self, raw: &str, dimension: &str) -> i64 {
        match self.forward.get(raw) {
            Some(&id) => id,
            None => {
                tracing::debug!(dimension, raw, "dimension pseudonym not found, using id 0");
                0
            }
        }
    }

    /// Inverse lookup used by URL template expansion; empty string on miss.
    pub fn label(&self, id: i64) -> String {
        self.inverse.get(&id).cloned().unwrap_or_default()
    }
}

/// The full set of nine dimension tables carried by a [`crate::snapshot::Snapshot`].
#[derive(Debug, Clone, Default)]
pub struct Pseudonyms {
    pub country: DimensionTable,
    pub network: DimensionTable,
    pub subnetwork: DimensionTable,
    pub network_type: DimensionTable,
    pub device_type: DimensionTable,
    pub brand: DimensionTable,
    pub brand_slug: DimensionTable,
    pub vertical: DimensionTable,
    pub gender: DimensionTable,
}
