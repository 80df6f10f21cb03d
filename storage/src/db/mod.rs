//! Database bootstrap and the job-store schema/CRUD layer.
//!
//! Mirrors the teacher's `init_database`/`init_test_database` split, but
//! table registration here is a handful of raw `DEFINE TABLE`/`DEFINE
//! FIELD` statements run once at startup rather than a derive macro —
//! `job` is the only table this crate owns, so the macro's indirection
//! buys nothing.

pub mod job_store;

use std::path::Path;

use surrealdb::engine::local::{Db, Mem, SurrealKV};
use surrealdb::Surreal;

const JOB_SCHEMA: &str = "
DEFINE TABLE IF NOT EXISTS job SCHEMALESS;
DEFINE FIELD IF NOT EXISTS job_type ON job TYPE string;
DEFINE FIELD IF NOT EXISTS status ON job TYPE string;
DEFINE FIELD IF NOT EXISTS progress ON job TYPE float;
DEFINE FIELD IF NOT EXISTS stage ON job TYPE string;
DEFINE FIELD IF NOT EXISTS error_message ON job TYPE option<string>;
DEFINE FIELD IF NOT EXISTS request ON job TYPE object;
DEFINE FIELD IF NOT EXISTS result ON job TYPE option<object>;
DEFINE FIELD IF NOT EXISTS created_at ON job TYPE number;
DEFINE FIELD IF NOT EXISTS updated_at ON job TYPE number;
DEFINE FIELD IF NOT EXISTS content_hash ON job TYPE option<string>;
DEFINE INDEX IF NOT EXISTS job_status_idx ON job FIELDS status;
DEFINE INDEX IF NOT EXISTS job_created_idx ON job FIELDS created_at;
";

async fn register_tables(db: &Surreal<Db>) -> surrealdb::Result<()> {
    db.query(JOB_SCHEMA).await?.check()?;
    Ok(())
}

/// Opens the on-disk store at `path`, creating it if absent, and ensures
/// the job table/fields exist.
///
/// # Errors
/// Returns an error if the backing `SurrealKV` store cannot be opened or
/// the schema statements fail.
pub async fn init_database(path: &Path) -> surrealdb::Result<Surreal<Db>> {
    let db = Surreal::new::<SurrealKV>(path).await?;
    db.use_ns("setlist").use_db("jobs").await?;
    register_tables(&db).await?;
    Ok(db)
}

/// In-memory store for tests: same namespace/schema, no filesystem.
///
/// # Errors
/// Returns an error if the in-memory engine fails to start or the schema
/// statements fail.
pub async fn init_test_database() -> surrealdb::Result<Surreal<Db>> {
    let db = Surreal::new::<Mem>(()).await?;
    db.use_ns("test").use_db("test").await?;
    register_tables(&db).await?;
    Ok(db)
}
