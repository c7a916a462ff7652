use std::path::PathBuf;

use agolvault_core::time::{Clock, SystemClock};
use agolvault_portal::{Credentials, PortalClient, PortalConfig, RestTransport, types::ContentListing};

use crate::{AppError, BackupSession, FeatureExporter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackupMode {
    /// Export every hosted feature service in the content listing.
    Bulk,
    /// Export exactly one named feature service.
    Single { item_name: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackupOptions {
    pub save_location: PathBuf,
    pub mode: BackupMode,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackupSummary {
    pub session_root: PathBuf,
    pub snapshot_path: PathBuf,
    pub services_exported: usize,
    pub feature_classes_written: usize,
    pub layers_skipped: usize,
}

pub async fn run_backup<T>(
    transport: T,
    config: PortalConfig,
    credentials: &Credentials,
    options: &BackupOptions,
) -> Result<BackupSummary, AppError>
where
    T: RestTransport,
{
    run_backup_with_clock(transport, config, credentials, options, SystemClock).await
}

/// One full backup run, strictly sequential: authenticate, resolve the
/// organization from the user profile, create the stamped session, snapshot
/// the content listing, then export. The first fatal error aborts the run;
/// if authentication is rejected nothing below it is ever attempted.
pub async fn run_backup_with_clock<T, K>(
    transport: T,
    config: PortalConfig,
    credentials: &Credentials,
    options: &BackupOptions,
    clock: K,
) -> Result<BackupSummary, AppError>
where
    T: RestTransport,
    K: Clock,
{
    let started_at = clock.now();
    let client = PortalClient::connect_with_clock(transport, config, credentials, clock).await?;

    let profile = client.get_user(&credentials.username).await?;
    log::info!(
        "backing up content of {} (org {})",
        profile.username,
        profile.org_id
    );

    let session = BackupSession::create(&options.save_location, started_at)?;
    let raw_listing = client.get_user_content(&credentials.username).await?;
    let snapshot_path = session.write_item_snapshot(&raw_listing)?;

    let exporter = FeatureExporter::new(&client, profile.org_id.clone());
    let summary = match &options.mode {
        BackupMode::Bulk => {
            let listing: ContentListing = serde_json::from_value(raw_listing)?;
            let report = exporter.export_bulk(&listing, session.root()).await?;
            BackupSummary {
                session_root: session.root().to_path_buf(),
                snapshot_path,
                services_exported: report.exported.len(),
                feature_classes_written: report.feature_classes_written(),
                layers_skipped: report.layers_skipped(),
            }
        }
        BackupMode::Single { item_name } => {
            let report = exporter.export_single(item_name, session.root()).await?;
            BackupSummary {
                session_root: session.root().to_path_buf(),
                snapshot_path,
                services_exported: 1,
                feature_classes_written: report.feature_classes.len(),
                layers_skipped: report.skipped_layers.len(),
            }
        }
    };

    log::info!(
        "finished: {} feature classes across {} services ({} layers skipped)",
        summary.feature_classes_written,
        summary.services_exported,
        summary.layers_skipped
    );
    Ok(summary)
}
