//! File-backed reference store: one JSON document per store.
//!
//! This is not a binary circular layout. It is a plain serde_json snapshot
//! honoring the same capability contract: fetch windows quantized to the
//! serving archive's grid, points placed into the finest archive covering
//! their age, and threshold-gated downsample propagation into coarser
//! archives on write.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::schema::{RetentionSpec, Schema};
use crate::store::{FetchedSeries, Store, StoreInfo};
use crate::{Error, Result};

/// Aggregation methods the reference store understands.
pub const AGGREGATION_METHODS: &[&str] = &["average", "sum", "min", "max", "last", "avg_zero"];

#[derive(Debug, Serialize, Deserialize)]
struct Document {
    x_files_factor: f64,
    aggregation_method: String,
    archives: Vec<ArchiveDoc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ArchiveDoc {
    precision: u64,
    points: u64,
    #[serde(default)]
    slots: BTreeMap<u64, f64>,
}

impl ArchiveDoc {
    fn spec(&self) -> RetentionSpec {
        RetentionSpec {
            precision: self.precision,
            points: self.points,
        }
    }

    fn retention(&self) -> u64 {
        self.precision * self.points
    }
}

/// Store backend reading and writing JSON documents.
///
/// The reference time `now` is injected at construction so placement and
/// retention decisions are deterministic under test.
#[derive(Debug, Clone)]
pub struct JsonStore {
    now: u64,
}

impl JsonStore {
    pub fn new(now: u64) -> Self {
        Self { now }
    }

    fn load(&self, path: &Path) -> Result<Document> {
        if !path.exists() {
            return Err(Error::Missing(path.to_path_buf()));
        }
        let doc: Document = serde_json::from_str(&fs::read_to_string(path)?)?;
        if doc.archives.is_empty() {
            return Err(Error::Corrupt("store has no archives"));
        }
        Ok(doc)
    }

    fn save(&self, path: &Path, doc: &Document) -> Result<()> {
        fs::write(path, serde_json::to_string(doc)?)?;
        Ok(())
    }
}

impl Store for JsonStore {
    fn info(&self, path: &Path) -> Result<StoreInfo> {
        let doc = self.load(path)?;
        Ok(StoreInfo {
            archives: doc.archives.iter().map(ArchiveDoc::spec).collect(),
            x_files_factor: doc.x_files_factor,
            aggregation_method: doc.aggregation_method,
        })
    }

    fn create(
        &self,
        path: &Path,
        schema: &Schema,
        x_files_factor: f64,
        aggregation_method: &str,
    ) -> Result<()> {
        if path.exists() {
            return Err(Error::Exists(path.to_path_buf()));
        }
        if !(0.0..=1.0).contains(&x_files_factor) {
            return Err(Error::Threshold(x_files_factor));
        }
        if !AGGREGATION_METHODS.contains(&aggregation_method) {
            return Err(Error::UnknownMethod(aggregation_method.to_string()));
        }
        // Creation rules beyond the schema invariant: consecutive archives
        // must downsample evenly and each coarser archive must cover more
        // time than the one before it.
        for pair in schema.specs().windows(2) {
            if pair[1].precision % pair[0].precision != 0 {
                return Err(Error::Schema("consecutive precisions must divide evenly"));
            }
            if pair[1].retention() <= pair[0].retention() {
                return Err(Error::Schema("coarser archives must cover more time"));
            }
        }

        let doc = Document {
            x_files_factor,
            aggregation_method: aggregation_method.to_string(),
            archives: schema
                .specs()
                .iter()
                .map(|spec| ArchiveDoc {
                    precision: spec.precision,
                    points: spec.points,
                    slots: BTreeMap::new(),
                })
                .collect(),
        };
        self.save(path, &doc)
    }

    fn fetch(&self, path: &Path, from: u64, until: u64, now: u64) -> Result<FetchedSeries> {
        let doc = self.load(path)?;
        let max_retention = doc
            .archives
            .iter()
            .map(ArchiveDoc::retention)
            .max()
            .unwrap_or(0);
        let oldest = now.saturating_sub(max_retention);
        if from >= until || until <= oldest || from >= now {
            return Err(Error::BadFetchWindow { from, until });
        }
        let from = from.max(oldest);
        let until = until.min(now);

        // The finest archive whose span reaches back to `from` serves the
        // whole window.
        let age = now - from;
        let archive = doc
            .archives
            .iter()
            .find(|a| a.retention() >= age)
            .or_else(|| doc.archives.last())
            .ok_or(Error::Corrupt("store has no archives"))?;
        let step = archive.precision;

        // First slot strictly after `from`, last slot covering `until`.
        let start = from - from % step + step;
        let mut end = until - until % step + step;
        if end <= start {
            end = start + step;
        }

        let values = (start..end)
            .step_by(step as usize)
            .map(|ts| archive.slots.get(&ts).copied())
            .collect();
        Ok(FetchedSeries {
            start,
            end,
            step,
            values,
        })
    }

    fn append_points(&self, path: &Path, points: &[(u64, f64)]) -> Result<()> {
        let mut doc = self.load(path)?;
        let method = doc.aggregation_method.clone();
        let threshold = doc.x_files_factor;

        for &(ts, value) in points {
            if ts > self.now {
                continue;
            }
            let age = self.now - ts;
            let Some(idx) = doc.archives.iter().position(|a| a.retention() >= age) else {
                // Older than everything the store keeps.
                continue;
            };
            let precision = doc.archives[idx].precision;
            doc.archives[idx].slots.insert(ts - ts % precision, value);

            // Propagate down while each coarser bucket stays complete enough.
            for j in idx + 1..doc.archives.len() {
                let coarse_precision = doc.archives[j].precision;
                let slot = ts - ts % coarse_precision;
                let fine = &doc.archives[j - 1];
                let per = (coarse_precision / fine.precision) as usize;
                let bucket: Vec<Option<f64>> = (0..per)
                    .map(|k| fine.slots.get(&(slot + k as u64 * fine.precision)).copied())
                    .collect();
                let present: Vec<f64> = bucket.iter().filter_map(|v| *v).collect();
                if present.is_empty() || (present.len() as f64) / (per as f64) < threshold {
                    break;
                }
                let reduced = self.reduce(&method, &present, &bucket)?;
                doc.archives[j].slots.insert(slot, reduced);
            }
        }

        for archive in &mut doc.archives {
            let min_ts = self.now.saturating_sub(archive.retention());
            archive.slots.retain(|ts, _| *ts > min_ts);
        }
        self.save(path, &doc)
    }

    fn reduce(&self, method: &str, present: &[f64], bucket: &[Option<f64>]) -> Result<f64> {
        if present.is_empty() {
            return Err(Error::Corrupt("aggregate called with no samples"));
        }
        let value = match method {
            "average" => present.iter().sum::<f64>() / present.len() as f64,
            "sum" => present.iter().sum(),
            "min" => present.iter().copied().fold(f64::INFINITY, f64::min),
            "max" => present.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            "last" => present[present.len() - 1],
            "avg_zero" => present.iter().sum::<f64>() / bucket.len().max(1) as f64,
            other => return Err(Error::UnknownMethod(other.to_string())),
        };
        Ok(value)
    }
}
