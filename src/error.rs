use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid retention '{0}': {1}")]
    Retention(String, &'static str),
    #[error("invalid schema: {0}")]
    Schema(&'static str),
    #[error("x-files-factor must be within [0, 1], got {0}")]
    Threshold(f64),
    #[error("store file does not exist: {0}")]
    Missing(PathBuf),
    #[error("store file already exists: {0}")]
    Exists(PathBuf),
    #[error("the new retention matches the old retention, nothing to do")]
    UnchangedSchema,
    #[error("archive {precision}:{points} fits no new archive; pass --force to drop its data")]
    UnfittableArchive { precision: u64, points: u64 },
    #[error(
        "archive {precision}s spanning {retention}s only fits new archives spanning \
         {available}s; pass --force to truncate"
    )]
    InsufficientRetention {
        precision: u64,
        retention: u64,
        available: u64,
    },
    #[error("unknown aggregation method '{0}'")]
    UnknownMethod(String),
    #[error("fetch window [{from}, {until}) lies outside stored retention")]
    BadFetchWindow { from: u64, until: u64 },
    #[error("corrupt store document: {0}")]
    Corrupt(&'static str),
    #[error("swap failed, original store restored: {0}")]
    Swap(#[source] std::io::Error),
    #[error("store document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
