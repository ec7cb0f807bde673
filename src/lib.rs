//! DSP bidding core — RTB request handling pipeline plus the hot-reloadable
//! catalog snapshot index. See SPEC_FULL.md for the full component map
//! (C1–C10).

pub mod catalog;
pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod eligibility;
pub mod error;
pub mod flight;
pub mod metrics;
pub mod middleware;
pub mod pricing;
pub mod pseudonym;
pub mod recall;
pub mod request;
pub mod response;
pub mod snapshot;
