//! # Spanscope
//!
//! Analytical queries over a span-oriented telemetry store.
//!
//! Spanscope turns a small set of question patterns (recent activity, text
//! search, slow requests, exceptions, endpoint statistics, trace lookup and
//! ad-hoc SQL) into bounded queries against the Logfire query API, then
//! normalizes and renders the rows.
//!
//! ## Architecture
//!
//! - **Query**: validated filter values and pattern query building
//! - **Backend**: query execution with an out-of-band time bound
//! - **Pipeline**: build, execute and normalize, alone or as a batch
//! - **Present**: text and JSON rendering
//!
//! ## Quick Start
//!
//! ```bash
//! export LOGFIRE_READ_TOKEN=pylf_v1_us_...
//!
//! # What happened in the last five minutes
//! spanscope recent
//!
//! # Requests slower than two seconds today
//! spanscope slow --min-ms 2000 --hours 24
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod backend;
pub mod config;
pub mod credentials;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod present;
pub mod query;

pub use config::Config;
pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::backend::{LogfireClient, QueryBackend, QueryExecutor};
    pub use crate::config::Config;
    pub use crate::credentials::{load_credential, require_credential, ReadToken};
    pub use crate::error::{Error, Result};
    pub use crate::models::*;
    pub use crate::pipeline::Pipeline;
    pub use crate::present::{OutputMode, Presenter};
    pub use crate::query::QueryBuilder;
}
