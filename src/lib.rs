//! # gridquery
//!
//! Server-side data shaping for data-grid requests. A grid posts a query
//! (filters, searches, sort keys, grouping, paging, aggregates) and gets
//! back the shaped page of an in-memory record set.
//!
//! ## Usage
//!
//! ```bash
//! gridquery run --data orders.json --request request.json [--pretty]
//! gridquery check --request request.json
//! ```
//!
//! ## Modules
//!
//! - `app` - Logging, fatal error reporting and CLI runtime configuration
//! - `config` - Shaping defaults loaded from TOML and the environment
//! - `error` - Coded error types shared by every stage
//! - `query` - Record access, predicate compilation and the query pipeline
//! - `testing` - Order fixtures, builders and result assertions
pub mod app;
pub mod config;
pub mod error;
pub mod query;

pub mod testing;

pub use error::{QueryError, Result};
pub use query::{QueryPipeline, QueryRequest, QueryResult};
