//! Retention resizing for circular multi-resolution time-series stores.
//!
//! A store keeps one circular archive per resolution. Resizing re-bins the
//! data recorded under the old archive set into a newly specified one:
//! same-or-finer targets receive raw copies, coarser targets receive
//! threshold-gated aggregates anchored to the newest sample.

pub mod error;
pub mod fit;
pub mod migrate;
pub mod rebin;
pub mod schema;
pub mod store;
pub mod swap;

pub use error::{Error, Result};
pub use migrate::{Migration, MigrationStats};
pub use schema::{parse_retention, RetentionSpec, Schema};
pub use store::{FetchedSeries, Store, StoreInfo};
pub use swap::{resize, ResizeRequest};
