//! Observability for aeroquery
//!
//! Structured logging through `tracing`, keyed by an explicit event vocabulary.
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No control flow depends on a log call
//! 3. Every line carries an `event` field from [`Event`]
//!
//! The library never installs a subscriber; the embedding process does.

mod events;

pub use events::Event;

/// Log a lifecycle event with string fields at INFO (WARN for rejections)
///
/// Fields are rendered in alphabetical key order so identical events
/// produce identical lines.
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let mut sorted: Vec<_> = fields.iter().collect();
    sorted.sort_by_key(|(k, _)| *k);
    let rendered = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(" ");

    if event.is_rejection() {
        tracing::warn!(event = event.as_str(), "{}", rendered);
    } else {
        tracing::info!(event = event.as_str(), "{}", rendered);
    }
}
