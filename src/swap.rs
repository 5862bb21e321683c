//! Resize sequencing: create, migrate, then swap the stores.
//!
//! The new store is built under a temporary name and only renamed into
//! place after the whole migration succeeds, so a failure at any step
//! leaves the original untouched. The original survives as a `.bak` file
//! unless the caller asks otherwise.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::migrate::{Migration, MigrationStats};
use crate::schema::Schema;
use crate::store::Store;
use crate::{Error, Result};

/// One resize request against an existing store.
#[derive(Debug, Clone)]
pub struct ResizeRequest {
    pub path: PathBuf,
    pub schema: Schema,
    /// Defaults to the old store's value when absent.
    pub x_files_factor: Option<f64>,
    /// Defaults to the old store's method when absent.
    pub aggregation_method: Option<String>,
    /// Permit dropped or truncated archives.
    pub force: bool,
    /// Write the migrated store here and leave the original in place.
    pub newfile: Option<PathBuf>,
    /// Keep the `.bak` copy of the original after a successful swap.
    pub keep_backup: bool,
    pub now: u64,
}

/// Resize the store at `request.path` onto `request.schema`.
pub fn resize<S: Store>(store: &S, request: &ResizeRequest) -> Result<MigrationStats> {
    if !request.path.exists() {
        return Err(Error::Missing(request.path.clone()));
    }
    let info = store.info(&request.path)?;
    let old = Schema::from_specs(info.archives)?;
    if old == request.schema {
        return Err(Error::UnchangedSchema);
    }
    if let Some(xff) = request.x_files_factor {
        if !(0.0..=1.0).contains(&xff) {
            return Err(Error::Threshold(xff));
        }
    }
    let x_files_factor = request.x_files_factor.unwrap_or(info.x_files_factor);
    let aggregation_method = request
        .aggregation_method
        .clone()
        .unwrap_or(info.aggregation_method);

    let target = match &request.newfile {
        Some(path) => path.clone(),
        None => {
            let tmp = sibling(&request.path, ".tmp");
            if tmp.exists() {
                info!("removing stale temporary store {}", tmp.display());
                fs::remove_file(&tmp)?;
            }
            tmp
        }
    };

    info!(
        "creating store {} with schema {}",
        target.display(),
        request.schema
    );
    store.create(&target, &request.schema, x_files_factor, &aggregation_method)?;

    let migration = Migration {
        x_files_factor,
        aggregation_method,
        force: request.force,
        now: request.now,
    };
    let stats = match migration.run(store, &request.path, &target, old.specs(), &request.schema) {
        Ok(stats) => stats,
        Err(err) => {
            // Abandon the partial store; the original was never touched.
            let _ = fs::remove_file(&target);
            return Err(err);
        }
    };

    if request.newfile.is_some() {
        return Ok(stats);
    }

    let backup = sibling(&request.path, ".bak");
    info!("renaming original store to {}", backup.display());
    fs::rename(&request.path, &backup)?;
    if let Err(err) = fs::rename(&target, &request.path) {
        fs::rename(&backup, &request.path)?;
        return Err(Error::Swap(err));
    }
    if !request.keep_backup {
        info!("unlinking backup {}", backup.display());
        fs::remove_file(&backup)?;
    }
    Ok(stats)
}

/// `path` with `suffix` appended to its full file name.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}
