//! Database layer for data persistence and access.
//!
//! Data lives in SQLite, accessed through SQLx. Ids are UUIDs stored as 16-byte blobs and
//! timestamps are RFC 3339 strings in UTC, so they sort correctly as text.
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  (API request handlers)
//! └──────┬──────┘
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - queries)
//! └──────┬──────┘
//!        ↓
//! ┌─────────────┐
//! │   Models    │  (db::models - database records)
//! └──────┬──────┘
//!        ↓
//! ┌─────────────┐
//! │   SQLite    │
//! └─────────────┘
//! ```
//!
//! - [`handlers`]: Repository implementations
//! - [`models`]: Database record structures
//! - [`errors`]: Database-specific error types
//!
//! Migrations live in `migrations/` and are embedded with [`crate::migrator`]:
//!
//! ```ignore
//! tinymeets::migrator().run(&pool).await?;
//! ```
//!
//! Multi-row writes open a transaction on the connection they were given, so repositories can be
//! built from either a pooled connection or an outer transaction.

pub mod errors;
pub mod handlers;
pub mod models;
