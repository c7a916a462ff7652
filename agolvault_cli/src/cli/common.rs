use std::env;

use agolvault_portal::{Credentials, HttpTransport, PortalConfig};
use anyhow::Context;

pub(crate) fn load_portal_config() -> PortalConfig {
    let mut config = PortalConfig::default();
    if let Ok(url) = env::var("AGOL_PORTAL_URL") {
        config.referer = url.clone();
        config.portal_url = url;
    }
    if let Ok(url) = env::var("AGOL_SERVICES_URL") {
        config.services_url = url;
    }
    if let Ok(agent) = env::var("AGOL_USER_AGENT") {
        config.user_agent = agent;
    }
    config
}

pub(crate) fn resolve_credentials(
    username: &str,
    explicit_password: Option<String>,
) -> anyhow::Result<Credentials> {
    let password = explicit_password
        .or_else(|| env::var("AGOL_PASSWORD").ok())
        .context("password is required; provide --password or set AGOL_PASSWORD")?;

    Ok(Credentials {
        username: username.to_owned(),
        password,
    })
}

pub(crate) fn build_transport(config: &PortalConfig) -> anyhow::Result<HttpTransport> {
    HttpTransport::new(config).context("failed to create portal transport")
}
