//! Observability for strata
//!
//! - JSON-lines logging, silent unless a level is configured
//! - Typed events with fixed severities
//! - Per-execution work counters
//!
//! Nothing here feeds back into planning or execution.

mod events;
mod logger;
mod stats;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use stats::{ExecutionStats, StatsSnapshot};

/// Log a lifecycle event
pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
