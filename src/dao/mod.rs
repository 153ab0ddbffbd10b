/// Match persistence backends.
pub mod match_store;
/// Database model definitions.
pub mod models;
/// Guarded atomic mutations understood by every backend.
pub mod patch;
/// Storage abstraction layer for database operations.
pub mod storage;
