//! Capabilities of the backing time-series store.
//!
//! The migration engine never touches a store's on-disk layout. It consumes
//! the `Store` trait: read the archive set, create a fresh store, fetch one
//! archive's window as a fixed-interval slot sequence, append points, and
//! reduce a bucket with a named aggregation method.

mod json;

use std::path::Path;

use crate::schema::{RetentionSpec, Schema};
use crate::Result;

pub use json::{JsonStore, AGGREGATION_METHODS};

/// Archive set and write-time aggregation settings of an existing store.
#[derive(Debug, Clone)]
pub struct StoreInfo {
    pub archives: Vec<RetentionSpec>,
    pub x_files_factor: f64,
    pub aggregation_method: String,
}

/// One fetched window: `values` holds exactly `(end - start) / step` slots
/// in time order, `None` where no sample is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedSeries {
    pub start: u64,
    pub end: u64,
    pub step: u64,
    pub values: Vec<Option<f64>>,
}

impl FetchedSeries {
    /// Slot timestamps paired with their values, oldest first.
    pub fn points(&self) -> impl Iterator<Item = (u64, Option<f64>)> + '_ {
        let start = self.start;
        let step = self.step;
        self.values
            .iter()
            .enumerate()
            .map(move |(i, v)| (start + i as u64 * step, *v))
    }
}

pub trait Store {
    /// Describe an existing store.
    fn info(&self, path: &Path) -> Result<StoreInfo>;

    /// Create a fresh, empty store. Fails if `path` exists or the schema
    /// violates the store's creation rules.
    fn create(
        &self,
        path: &Path,
        schema: &Schema,
        x_files_factor: f64,
        aggregation_method: &str,
    ) -> Result<()>;

    /// Fetch `(from, until]` quantized to the serving archive's grid. Fails
    /// if the window lies entirely outside stored retention.
    fn fetch(&self, path: &Path, from: u64, until: u64, now: u64) -> Result<FetchedSeries>;

    /// Append `(timestamp, value)` points. The store rounds timestamps onto
    /// its own slot grid; absent samples are never passed in.
    fn append_points(&self, path: &Path, points: &[(u64, f64)]) -> Result<()>;

    /// Reduce one bucket's present values with a named method. `bucket` is
    /// the full bucket including missing slots, for methods that weigh
    /// absence; `present` is non-empty.
    fn reduce(&self, method: &str, present: &[f64], bucket: &[Option<f64>]) -> Result<f64>;
}
