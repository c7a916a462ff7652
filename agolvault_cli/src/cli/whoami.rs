use agolvault_core::time::Timestamp;
use agolvault_portal::PortalClient;
use clap::Args;

use crate::cli::common::{build_transport, load_portal_config, resolve_credentials};

#[derive(Debug, Args)]
pub(crate) struct WhoamiCommand {
    #[arg(long)]
    username: String,

    /// Portal password; falls back to the AGOL_PASSWORD environment variable.
    #[arg(long)]
    password: Option<String>,
}

impl WhoamiCommand {
    pub(crate) async fn run(&self) -> anyhow::Result<()> {
        let config = load_portal_config();
        let credentials = resolve_credentials(&self.username, self.password.clone())?;
        let transport = build_transport(&config)?;

        let client = PortalClient::connect(transport, config, &credentials).await?;
        let profile = client.get_user(&credentials.username).await?;

        let now = Timestamp::now();
        let valid_for = client
            .token()
            .expires_at
            .signed_duration_since(now)
            .num_seconds();

        println!("Username: {}", profile.username);
        println!("Org: {}", profile.org_id);
        println!(
            "Name: {}",
            profile.full_name.as_deref().unwrap_or("<unknown>")
        );
        println!("Email: {}", profile.email.as_deref().unwrap_or("<unknown>"));
        println!(
            "Token valid until (epoch): {} ({})",
            client.token().expires_at.as_epoch_secs(),
            if valid_for >= 0 {
                format!("in {valid_for}s")
            } else {
                format!("expired {}s ago", -valid_for)
            }
        );
        Ok(())
    }
}
