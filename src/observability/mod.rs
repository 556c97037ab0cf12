//! Observability for the chunk store
//!
//! - Structured JSON logging with a process-wide severity threshold
//! - Per-store counters
//! - Begin/complete scopes for multi-step operations
//!
//! Observability is read-only: nothing here changes what the store does.
//!
//! # Usage
//!
//! ```ignore
//! use chunkdb::observability::{log_event_with_fields, Event, Logger, Severity};
//!
//! Logger::set_min_severity(Severity::Trace);
//! log_event_with_fields(Event::ChunkFreed, &[("chunk_ptr", "128")]);
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::ObservationScope;

/// Log an event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log an event with fields at its own severity
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}

/// Whether events of this kind are currently written.
///
/// Guards call sites that would otherwise format fields for nothing.
pub fn event_enabled(event: Event) -> bool {
    Logger::enabled(event.severity())
}
