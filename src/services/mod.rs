/// Drift repair of the cached slot counter.
pub mod consistency;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Time-driven status transitions.
pub mod lifecycle;
/// Match creation, lookup, cancellation and roster entry edits.
pub mod match_service;
/// Promotion of queued users into free slots.
pub mod queue_processor;
/// Join/leave operations on the roster and the waiting queue.
pub mod roster_service;
/// Batch and single-match status update passes.
pub mod status_updater;
/// Storage connection supervisor toggling degraded mode.
pub mod storage_supervisor;

#[cfg(test)]
pub(crate) mod test_support;
