//! Newest-aligned re-bucketing of fixed-interval samples.
//!
//! Coarsening walks the input from its newest sample backward so that every
//! output bucket ends on a multiple of the new precision, matching the
//! boundaries the target store uses itself. The newest bucket is irregular:
//! it holds only the samples between the last full boundary and the newest
//! timestamp. A bucket is reduced only when enough of its slots hold
//! samples; otherwise it resolves to absent. The output is reversed back
//! into chronological order and anchored so its exclusive end is the first
//! new-precision boundary past the newest input sample.

use crate::{Error, Result};

/// A re-bucketed sequence on the new precision grid. `values` holds
/// `(end - start) / step` slots in time order.
#[derive(Debug, Clone, PartialEq)]
pub struct Rebinned {
    pub start: u64,
    pub end: u64,
    pub step: u64,
    pub values: Vec<Option<f64>>,
}

/// Re-bucket `values` (time order, `old_step` apart, starting at `start`)
/// onto the coarser `new_step` grid. `reduce` receives each bucket's present
/// samples plus the full bucket, and `threshold` is the minimum fraction of
/// present samples required to aggregate at all.
///
/// `new_step` must be a coarser multiple of `old_step`; the caller
/// establishes that via target selection.
pub fn rebin_newest_aligned<F>(
    values: &[Option<f64>],
    start: u64,
    old_step: u64,
    new_step: u64,
    threshold: f64,
    mut reduce: F,
) -> Result<Rebinned>
where
    F: FnMut(&[f64], &[Option<f64>]) -> Result<f64>,
{
    debug_assert!(old_step > 0 && new_step > old_step && new_step % old_step == 0);

    if values.is_empty() {
        return Ok(Rebinned {
            start,
            end: start,
            step: new_step,
            values: Vec::new(),
        });
    }

    let newest = start + (values.len() as u64 - 1) * old_step;
    let offset = newest % new_step;
    let per_bucket = (new_step / old_step) as usize;

    // Samples between the last full boundary and the newest timestamp form
    // the irregular newest bucket.
    let lead = ((offset / old_step) as usize + 1).min(values.len());

    let mut out = Vec::with_capacity(values.len() / per_bucket + 2);
    let mut hi = values.len();
    let mut lo = hi - lead;
    loop {
        let bucket = &values[lo..hi];
        // The newest bucket is judged against its own irregular size; every
        // other bucket against the full size, so a short oldest bucket is
        // penalized rather than quietly promoted.
        let total = if hi == values.len() { lead } else { per_bucket };
        out.push(reduce_bucket(bucket, total, threshold, &mut reduce)?);
        if lo == 0 {
            break;
        }
        hi = lo;
        lo = hi.saturating_sub(per_bucket);
    }
    out.reverse();

    let end = newest - offset + new_step;
    let start = end - out.len() as u64 * new_step;
    Ok(Rebinned {
        start,
        end,
        step: new_step,
        values: out,
    })
}

fn reduce_bucket<F>(
    bucket: &[Option<f64>],
    total: usize,
    threshold: f64,
    reduce: &mut F,
) -> Result<Option<f64>>
where
    F: FnMut(&[f64], &[Option<f64>]) -> Result<f64>,
{
    if total == 0 {
        return Err(Error::Corrupt("empty aggregation bucket"));
    }
    let present: Vec<f64> = bucket.iter().filter_map(|v| *v).collect();
    if present.is_empty() || (present.len() as f64) / (total as f64) < threshold {
        return Ok(None);
    }
    reduce(&present, bucket).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn average(present: &[f64], _bucket: &[Option<f64>]) -> Result<f64> {
        Ok(present.iter().sum::<f64>() / present.len() as f64)
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let out = rebin_newest_aligned(&[], 600, 60, 300, 0.5, average).expect("rebin");
        assert!(out.values.is_empty());
        assert_eq!(out.start, out.end);
    }

    #[test]
    fn aligned_input_groups_exactly() {
        // 10 minute-samples starting on a 300s boundary and ending just
        // before one: two full buckets, no irregular lead.
        let values: Vec<Option<f64>> = (0..10).map(|i| Some(i as f64)).collect();
        let out = rebin_newest_aligned(&values, 600, 60, 300, 0.0, average).expect("rebin");

        assert_eq!(out.step, 300);
        assert_eq!(out.start, 600);
        assert_eq!(out.end, 1200);
        assert_eq!(out.values, vec![Some(2.0), Some(7.0)]);
    }

    #[test]
    fn newest_bucket_is_irregular() {
        // Newest sample lands on a 300s boundary, so it forms a bucket of
        // one; the five before it form a full bucket.
        let values: Vec<Option<f64>> = (0..6).map(|i| Some(i as f64)).collect();
        let out = rebin_newest_aligned(&values, 600, 60, 300, 0.5, average).expect("rebin");

        // Samples at 600..840 form the older bucket, 900 stands alone.
        assert_eq!(out.end, 1200);
        assert_eq!(out.start, 600);
        assert_eq!(out.values, vec![Some(2.0), Some(5.0)]);
    }

    #[test]
    fn completeness_threshold_is_boundary_inclusive() {
        // Three of five present: 0.6 >= 0.5 aggregates. Two of five: 0.4
        // resolves to absent. Exactly at the threshold aggregates.
        let three = [Some(1.0), None, Some(2.0), Some(3.0), None];
        let out = rebin_newest_aligned(&three, 600, 60, 300, 0.5, average).expect("rebin");
        assert_eq!(out.values, vec![Some(2.0)]);

        let two = [Some(1.0), None, None, Some(3.0), None];
        let out = rebin_newest_aligned(&two, 600, 60, 300, 0.5, average).expect("rebin");
        assert_eq!(out.values, vec![None]);

        let out = rebin_newest_aligned(&two, 600, 60, 300, 0.4, average).expect("rebin");
        assert_eq!(out.values, vec![Some(2.0)]);
    }

    #[test]
    fn all_missing_bucket_is_absent_even_at_zero_threshold() {
        let values = [None, None, None, None, None];
        let out = rebin_newest_aligned(&values, 600, 60, 300, 0.0, average).expect("rebin");
        assert_eq!(out.values, vec![None]);
    }

    #[test]
    fn short_oldest_bucket_is_judged_against_full_size() {
        // Start off the 300s grid: the newest five samples (900..1140) form
        // the lead bucket and only three (720..840) are left for the oldest
        // one. Three slots out of a nominal five misses a 0.7 threshold
        // even though all three are present.
        let values: Vec<Option<f64>> = (0..8).map(|i| Some(i as f64)).collect();
        let out = rebin_newest_aligned(&values, 720, 60, 300, 0.7, average).expect("rebin");

        assert_eq!(out.values.len(), 2);
        assert_eq!(out.values[1], Some(5.0));
        assert_eq!(out.values[0], None);

        let out = rebin_newest_aligned(&values, 720, 60, 300, 0.5, average).expect("rebin");
        assert_eq!(out.values[0], Some(1.0));
    }

    #[test]
    fn output_is_anchored_to_the_newest_boundary() {
        // Newest sample at 1500 is already on the 300s grid.
        let values: Vec<Option<f64>> = (0..16).map(|i| Some(i as f64)).collect();
        let out = rebin_newest_aligned(&values, 600, 60, 300, 0.0, average).expect("rebin");

        assert_eq!(out.end % 300, 0);
        let newest_out = out.end - out.step;
        let newest_in = 600 + 15 * 60;
        assert!(newest_in - newest_out < 300);
        assert_eq!(out.end, newest_in + 300);
        assert_eq!(
            out.values.len() as u64,
            (out.end - out.start) / out.step
        );
    }

    #[test]
    fn chronological_order_is_preserved() {
        // Distinct bucket averages must come out oldest first.
        let values: Vec<Option<f64>> = (0..15).map(|i| Some(if i < 5 { 1.0 } else { 9.0 })).collect();
        let out = rebin_newest_aligned(&values, 600, 60, 300, 0.5, average).expect("rebin");
        assert_eq!(out.values, vec![Some(1.0), Some(9.0), Some(9.0)]);
    }
}
