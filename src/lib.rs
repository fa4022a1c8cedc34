// trailhead - social trail/event planning backend.
//
// Architecture, leaves first: the document store (`store`) offers typed,
// timestamped CRUD per collection; concept modules (`concepts`) each own one
// collection and their invariants; the error taxonomy (`error`) and the
// formatter registry (`responses`) defer cross-concept message rendering to
// the boundary; the synchronization layer (`sync`) composes concepts into
// cross-entity workflows; `api` is the thin HTTP surface over it all.

pub mod api;
pub mod app_state;
pub mod concepts;
pub mod config;
pub mod error;
pub mod id_generator;
pub mod responses;
pub mod store;
pub mod sync;

pub use error::{AppError, AppResult, ErrorCode, ErrorKind};
