use clap::{ArgAction, Parser, Subcommand};

use crate::cli::{backup::BackupCommand, whoami::WhoamiCommand};

pub(crate) fn get_args() -> CliOpts {
    CliOpts::parse()
}

#[derive(Debug, Parser)]
#[command(version = clap::crate_version!(), about = "ArcGIS Online content backup")]
pub(crate) struct CliOpts {
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    subcmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Back up hosted feature services into a stamped session directory.
    Backup(BackupCommand),

    /// Authenticate and show the user's profile.
    Whoami(WhoamiCommand),
}

impl CliOpts {
    pub(crate) fn verbose(&self) -> u8 {
        self.verbose
    }

    pub(crate) async fn run(&self) -> anyhow::Result<()> {
        match &self.subcmd {
            Command::Backup(cmd) => cmd.run().await,
            Command::Whoami(cmd) => cmd.run().await,
        }
    }
}
