//! Request-logging middleware (spec §6 ambient observability, see SPEC_FULL.md §B).

pub mod logging;

pub use logging::request_logging;
