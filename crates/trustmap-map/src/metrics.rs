//! Update metrics
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! embedding application installs a recorder.

/// Update cycles by outcome
pub const UPDATES_TOTAL: &str = "trustmap_updates_total";
/// Chunks accepted by ingestion
pub const CHUNKS_TOTAL: &str = "trustmap_chunks_total";
/// Entries in the active backend after the last applied update
pub const BACKEND_ENTRIES: &str = "trustmap_backend_entries";

pub fn describe_metrics() {
    metrics::describe_counter!(UPDATES_TOTAL, "Map update cycles by outcome");
    metrics::describe_counter!(CHUNKS_TOTAL, "Content chunks received by map ingestion");
    metrics::describe_gauge!(BACKEND_ENTRIES, "Entries in the active map backend");
}

pub(crate) fn record_update(map: &str, outcome: &'static str) {
    metrics::counter!(UPDATES_TOTAL, "map" => map.to_string(), "outcome" => outcome).increment(1);
}

pub(crate) fn record_chunk(map: &str) {
    metrics::counter!(CHUNKS_TOTAL, "map" => map.to_string()).increment(1);
}

pub(crate) fn record_entries(map: &str, entries: usize) {
    metrics::gauge!(BACKEND_ENTRIES, "map" => map.to_string()).set(entries as f64);
}
