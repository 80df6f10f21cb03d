//! Durable state for the setlist assembler: the job store (§4.7, behind
//! the `db` feature) and the content-addressed result cache (§4.9, always
//! available). Owns every place this system touches a database or the
//! filesystem for anything other than audio I/O — core logic never reads
//! or writes durable state directly.

pub mod cache;
#[cfg(feature = "db")]
pub mod db;
pub mod errors;

pub use cache::ResultCache;
pub use errors::{StorageError, StorageResult};
