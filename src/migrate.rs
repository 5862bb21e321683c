//! Migration driver: re-bins one store's archives into a new schema.
//!
//! Old archives are processed finest first. Each takes an exclusive fetch
//! window: the finest archive covers the newest span, and every coarser one
//! covers what lies beyond the previous window, so the windows partition
//! `[now - oldest retention, now]`. Per archive, target selection decides
//! which new specs receive the data; the refine target gets raw copies of
//! the newest samples, the coarsen target gets the re-bucketed remainder.
//! `force` is the single escape hatch for intentional data loss, and every
//! drop it permits is logged.

use std::path::Path;

use log::{debug, info, warn};

use crate::fit::select_fit;
use crate::rebin::rebin_newest_aligned;
use crate::schema::{RetentionSpec, Schema};
use crate::store::Store;
use crate::{Error, Result};

/// Settings for one migration run.
#[derive(Debug, Clone)]
pub struct Migration {
    pub x_files_factor: f64,
    pub aggregation_method: String,
    pub force: bool,
    pub now: u64,
}

/// What a run wrote and dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationStats {
    pub archives_migrated: usize,
    pub archives_dropped: usize,
    pub points_written: u64,
}

impl Migration {
    /// Migrate every old archive's data from `src` into `dst`, which must
    /// already exist with `new_schema`. `old_archives` is ordered finest
    /// first. The source is only read; on error the destination is left
    /// partially written for the caller to discard.
    pub fn run<S: Store>(
        &self,
        store: &S,
        src: &Path,
        dst: &Path,
        old_archives: &[RetentionSpec],
        new_schema: &Schema,
    ) -> Result<MigrationStats> {
        let mut remaining = new_schema.specs().to_vec();
        let mut stats = MigrationStats::default();

        let mut window_end = self.now;
        for (pos, old) in old_archives.iter().enumerate() {
            let from = self.now.saturating_sub(old.retention());

            let fit = select_fit(*old, &mut remaining);
            if fit.best.is_none() && fit.exact.is_none() {
                if !self.force {
                    return Err(Error::UnfittableArchive {
                        precision: old.precision,
                        points: old.points,
                    });
                }
                // Everything from here on is coarser and equally unmatchable.
                stats.archives_dropped = old_archives.len() - pos;
                warn!("dropping archive {old} and all older data (forced)");
                break;
            }
            let covered = fit.covered();
            if covered < old.retention() {
                if !self.force {
                    return Err(Error::InsufficientRetention {
                        precision: old.precision,
                        retention: old.retention(),
                        available: covered,
                    });
                }
                warn!("truncating archive {old} to its newest {covered}s (forced)");
            }

            let series = store.fetch(src, from, window_end, self.now)?;
            info!(
                "migrating archive {old}: {} slots at {}s",
                series.values.len(),
                series.step
            );

            // Newest samples the refine target holds verbatim.
            let raw_keep = match fit.best {
                Some(best) => {
                    ((best.retention() / series.step) as usize).min(series.values.len())
                }
                None => 0,
            };
            let split = series.values.len() - raw_keep;
            if raw_keep > 0 {
                let raw_start = series.start + split as u64 * series.step;
                stats.points_written +=
                    append_present(store, dst, raw_start, series.step, &series.values[split..])?;
            }

            // The older remainder is re-bucketed onto the coarsen target's
            // grid, one bucket per `exact.precision / old.precision` samples.
            if let Some(exact) = fit.exact {
                let older = &series.values[..split];
                if !older.is_empty() {
                    let rebinned = rebin_newest_aligned(
                        older,
                        series.start,
                        series.step,
                        exact.precision,
                        self.x_files_factor,
                        |present, bucket| {
                            store.reduce(&self.aggregation_method, present, bucket)
                        },
                    )?;
                    stats.points_written += append_present(
                        store,
                        dst,
                        rebinned.start,
                        rebinned.step,
                        &rebinned.values,
                    )?;
                }
            }

            stats.archives_migrated += 1;
            window_end = from;
        }

        Ok(stats)
    }
}

/// Append the present slots of a fixed-interval sequence, skipping absent
/// ones entirely.
fn append_present<S: Store>(
    store: &S,
    dst: &Path,
    start: u64,
    step: u64,
    values: &[Option<f64>],
) -> Result<u64> {
    let points: Vec<(u64, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (start + i as u64 * step, v)))
        .collect();
    if points.is_empty() {
        return Ok(0);
    }
    debug!("appending {} points starting at {}", points.len(), start);
    store.append_points(dst, &points)?;
    Ok(points.len() as u64)
}
