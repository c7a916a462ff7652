use std::path::PathBuf;

use agolvault_app::{BackupMode, BackupOptions, run_backup};
use anyhow::Context;
use clap::Args;

use crate::cli::common::{build_transport, load_portal_config, resolve_credentials};

#[derive(Debug, Args)]
pub(crate) struct BackupCommand {
    /// Directory the stamped backup session is created under.
    save_location: PathBuf,

    #[arg(long)]
    username: String,

    /// Portal password; falls back to the AGOL_PASSWORD environment variable.
    #[arg(long)]
    password: Option<String>,

    /// Export every hosted feature service the user owns.
    #[arg(long, conflicts_with = "item")]
    batch: bool,

    /// Export exactly one named feature service.
    #[arg(long)]
    item: Option<String>,
}

impl BackupCommand {
    pub(crate) async fn run(&self) -> anyhow::Result<()> {
        let config = load_portal_config();
        let credentials = resolve_credentials(&self.username, self.password.clone())?;
        let transport = build_transport(&config)?;

        let mode = if self.batch {
            println!("\nBACKUP FEATURE LAYERS");
            println!("=====================");
            BackupMode::Bulk
        } else {
            let item_name = self
                .item
                .clone()
                .context("provide --item NAME, or run with --batch")?;
            println!("\nEXPORT SINGLE FEATURES");
            println!("======================");
            BackupMode::Single { item_name }
        };

        let options = BackupOptions {
            save_location: self.save_location.clone(),
            mode,
        };
        let summary = run_backup(transport, config, &credentials, &options).await?;

        println!("Session: {}", summary.session_root.display());
        println!("Snapshot: {}", summary.snapshot_path.display());
        println!(
            "Feature classes written: {} across {} services ({} layers skipped)",
            summary.feature_classes_written, summary.services_exported, summary.layers_skipped
        );
        println!("\nfinished");
        Ok(())
    }
}
