//! SQLite store for People Say excerpts.
//!
//! The database is written once by [`populate`] and opened read-only by
//! everything else.

pub mod error;
pub mod guard;
pub mod populate;
pub mod profile;
pub mod retriever;
pub mod schema;

pub use error::StoreError;
pub use guard::validate_read_only_sql;
pub use populate::{init_from_csv, PopulateOutcome};
pub use profile::{profile, ColumnProfile, ValueCount};
pub use retriever::{execute, open_read_only, SqliteRetriever};
