//! Target selection: which new archives receive one old archive's data.
//!
//! A new spec is a refine target when its precision is the same or finer and
//! divides the old precision evenly (raw copy, no aggregation). It is a
//! coarsen target when its precision is a coarser multiple of the old one
//! (data must be re-bucketed). Scanning the not-yet-consumed new specs finest
//! first, the last refine candidate seen wins (the closest lossless match),
//! a candidate whose span is subsumed by the old archive's is consumed, and
//! the scan stops at the first candidate wide enough to absorb everything
//! the old archive still holds.

use crate::schema::RetentionSpec;

/// Targets selected for one old archive. `best` receives raw copies,
/// `exact` receives aggregates of whatever `best` does not absorb.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FitPair {
    pub best: Option<RetentionSpec>,
    pub exact: Option<RetentionSpec>,
}

impl FitPair {
    /// Widest span any selected target covers.
    pub fn covered(&self) -> u64 {
        let best = self.best.map_or(0, |s| s.retention());
        let exact = self.exact.map_or(0, |s| s.retention());
        best.max(exact)
    }
}

/// Select targets for `old` from the remaining new specs, consuming the ones
/// this old archive fully satisfies. `remaining` must be ordered finest
/// first. Returns an empty pair when nothing is compatible.
pub fn select_fit(old: RetentionSpec, remaining: &mut Vec<RetentionSpec>) -> FitPair {
    let mut fit = FitPair::default();

    let mut idx = 0;
    while idx < remaining.len() {
        let cand = remaining[idx];
        let refine = cand.precision <= old.precision && old.precision % cand.precision == 0;
        let coarsen = cand.precision > old.precision && cand.precision % old.precision == 0;
        if !refine && !coarsen {
            idx += 1;
            continue;
        }

        let consumed = if refine {
            fit.best = Some(cand);
            cand.retention() <= old.retention()
        } else {
            fit.exact = Some(cand);
            cand.retention() == old.retention()
        };
        if consumed {
            remaining.remove(idx);
        } else {
            idx += 1;
        }

        // A span at least as wide as the old archive's takes all the data
        // this archive still holds; coarser new specs stay for older ones.
        if cand.retention() >= old.retention() {
            break;
        }
    }

    fit
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(precision: u64, points: u64) -> RetentionSpec {
        RetentionSpec::new(precision, points).expect("spec")
    }

    #[test]
    fn identical_spec_is_best_fit_and_consumed() {
        let mut remaining = vec![spec(60, 1440)];
        let fit = select_fit(spec(60, 1440), &mut remaining);
        assert_eq!(fit.best, Some(spec(60, 1440)));
        assert_eq!(fit.exact, None);
        assert!(remaining.is_empty());
    }

    #[test]
    fn finer_divisor_refines() {
        let mut remaining = vec![spec(30, 2880)];
        let fit = select_fit(spec(60, 1440), &mut remaining);
        assert_eq!(fit.best, Some(spec(30, 2880)));
        assert_eq!(fit.exact, None);
        assert!(remaining.is_empty());
    }

    #[test]
    fn coarser_multiple_with_equal_span_is_exact_fit() {
        let mut remaining = vec![spec(300, 288)];
        let fit = select_fit(spec(60, 1440), &mut remaining);
        assert_eq!(fit.best, None);
        assert_eq!(fit.exact, Some(spec(300, 288)));
        assert!(remaining.is_empty());
    }

    #[test]
    fn best_and_exact_split_a_long_archive() {
        // Old minute data for a week; new schema keeps a day of minutes and
        // a week of five-minute aggregates.
        let mut remaining = vec![spec(60, 1440), spec(300, 2016)];
        let fit = select_fit(spec(60, 10080), &mut remaining);
        assert_eq!(fit.best, Some(spec(60, 1440)));
        assert_eq!(fit.exact, Some(spec(300, 2016)));
        assert!(remaining.is_empty());
    }

    #[test]
    fn incompatible_precisions_are_skipped() {
        let mut remaining = vec![spec(90, 960)];
        let fit = select_fit(spec(60, 1440), &mut remaining);
        assert_eq!(fit, FitPair::default());
        assert_eq!(remaining.len(), 1);
    }

    #[test]
    fn wider_target_absorbs_but_is_not_consumed() {
        // The new archive outlives this old one; it must stay available for
        // older, coarser archives.
        let mut remaining = vec![spec(60, 10080)];
        let fit = select_fit(spec(60, 1440), &mut remaining);
        assert_eq!(fit.best, Some(spec(60, 10080)));
        assert_eq!(remaining.len(), 1);
    }

    #[test]
    fn scan_stops_at_absorbing_candidate() {
        // The 300s spec absorbs the whole old span, so the coarser 3600s
        // spec is never considered for this archive.
        let mut remaining = vec![spec(300, 2016), spec(3600, 336)];
        let fit = select_fit(spec(60, 1440), &mut remaining);
        assert_eq!(fit.exact, Some(spec(300, 2016)));
        assert_eq!(remaining, vec![spec(300, 2016), spec(3600, 336)]);
    }

    #[test]
    fn closest_refine_candidate_wins() {
        // Both 15s and 30s refine a 60s archive; the later, closer one wins
        // and both are consumed as their spans are subsumed.
        let mut remaining = vec![spec(15, 240), spec(30, 240), spec(60, 1440)];
        let fit = select_fit(spec(60, 1440), &mut remaining);
        assert_eq!(fit.best, Some(spec(60, 1440)));
        assert!(remaining.is_empty());
    }

    #[test]
    fn no_candidates_returns_empty_pair() {
        let mut remaining = Vec::new();
        let fit = select_fit(spec(3600, 168), &mut remaining);
        assert_eq!(fit, FitPair::default());
    }

    #[test]
    fn covered_reports_widest_target() {
        let fit = FitPair {
            best: Some(spec(60, 1440)),
            exact: Some(spec(300, 2016)),
        };
        assert_eq!(fit.covered(), 604800);
        assert_eq!(FitPair::default().covered(), 0);
    }
}
