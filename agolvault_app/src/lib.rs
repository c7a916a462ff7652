mod error;
mod export;
mod runner;
mod session;

pub use error::AppError;
pub use export::{BulkReport, ExportReport, FeatureExporter};
pub use runner::{BackupMode, BackupOptions, BackupSummary, run_backup, run_backup_with_clock};
pub use session::BackupSession;
