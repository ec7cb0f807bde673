//! C2 (bundle) + C3 (publisher) — the immutable catalog snapshot and its
//! hot-reload publication.
//!
//! Publication is a single atomic pointer store (`ArcSwap::store`); acquisition
//! is a single atomic pointer load (`ArcSwap::load_full`) captured once per
//! request (spec §4.1, §5). Stale snapshots are reclaimed by `Arc` refcounting
//! once the last in-flight reader drops its clone — no explicit GC needed.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;

use crate::catalog::{CatalogSource, Creatives, Folders, Users};
use crate::error::CatalogLoadError;
use crate::pricing::BiddingPolicy;
use crate::pseudonym::Pseudonyms;

/// The immutable bundle a request reads from: folders, creatives, users,
/// pseudonyms, plus a pricing policy handle (spec §3 "Snapshot").
pub struct Snapshot {
    pub folders: Folders,
    pub creatives: Creatives,
    pub users: Users,
    pub pseudonyms: Pseudonyms,
    pub policy: Arc<dyn BiddingPolicy>,
}

impl Snapshot {
    fn empty(policy: Arc<dyn BiddingPolicy>) -> Self {
        Self {
            folders: Folders::default(),
            creatives: Creatives::default(),
            users: Users::default(),
            pseudonyms: Pseudonyms::default(),
            policy,
        }
    }
}

/// Single-writer, multiple-reader publisher. Readers call [`SnapshotPublisher::current`]
/// once per request; the writer calls [`SnapshotPublisher::reload`] on a periodic
/// external schedule (spec §4.1).
pub struct SnapshotPublisher {
    current: ArcSwap<Snapshot>,
    policy: Arc<dyn BiddingPolicy>,
}

impl SnapshotPublisher {
    /// Builds a publisher with an empty snapshot; callers must run [`Self::reload`]
    /// at least once before accepting traffic (spec §4.1: "The first successful
    /// cycle must complete before the HTTP endpoint accepts traffic").
    pub fn new(policy: Arc<dyn BiddingPolicy>) -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::empty(policy.clone())),
            policy,
        }
    }

    /// The pointer a request acquires at entry. Cheap: one atomic load plus
    /// an `Arc` clone.
    pub fn current(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Run one reload cycle: load fresh folders, creatives, users, and
    /// pseudonyms from `source`, assemble a new snapshot, and publish it
    /// atomically. On any partial failure, the cycle aborts with no
    /// publication and the old snapshot remains active (spec §4.1).
    ///
    /// The policy handle is reused across cycles — it is stateless
    /// configuration, not reloaded catalog data.
    pub async fn reload(&self, source: &dyn CatalogSource) -> Result<(), CatalogLoadError> {
        let folders = source.load_folders().await?;
        let creatives = source.load_creatives().await?;
        let users = source.load_users().await?;
        let pseudonyms = source.load_pseudonyms().await?;

        let snapshot = Snapshot {
            folders: Folders::from_vec(folders),
            creatives: Creatives::from_vec(creatives),
            users: Users::from_vec(users),
            pseudonyms,
            policy: self.policy.clone(),
        };

        self.current.store(Arc::new(snapshot));
        Ok(())
    }

}

/// Ticks `interval` and invokes `on_tick` forever. Extracted as a free
/// function so callers (see `main.rs`) can fold in their own side effects
/// (metrics, tracing) around each reload cycle.
pub async fn run_on_interval<F, Fut>(interval: Duration, mut on_tick: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        on_tick().await;
    }
}
