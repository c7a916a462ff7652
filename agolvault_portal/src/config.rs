use std::time::Duration;

use url::Url;

use crate::{PortalError, PortalResult};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortalConfig {
    pub portal_url: String,
    pub services_url: String,
    pub referer: String,
    pub user_agent: String,
    pub token_expiration_minutes: u32,
    pub request_timeout: Duration,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            portal_url: "https://www.arcgis.com".to_owned(),
            services_url: "https://services.arcgis.com".to_owned(),
            referer: "https://www.arcgis.com".to_owned(),
            user_agent: concat!("agolvault/", env!("CARGO_PKG_VERSION")).to_owned(),
            token_expiration_minutes: 60,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl PortalConfig {
    pub fn validate(&self) -> PortalResult<()> {
        if Url::parse(&self.portal_url).is_err() {
            return Err(PortalError::InvalidConfig(
                "portal_url must be an absolute URL",
            ));
        }
        if Url::parse(&self.services_url).is_err() {
            return Err(PortalError::InvalidConfig(
                "services_url must be an absolute URL",
            ));
        }
        if self.referer.trim().is_empty() {
            return Err(PortalError::InvalidConfig("referer must be set"));
        }
        if self.user_agent.trim().is_empty() {
            return Err(PortalError::InvalidConfig("user_agent must be set"));
        }
        if self.token_expiration_minutes == 0 {
            return Err(PortalError::InvalidConfig(
                "token_expiration_minutes must be positive",
            ));
        }
        Ok(())
    }

    pub(crate) fn portal_base(&self) -> &str {
        self.portal_url.trim_end_matches('/')
    }

    pub(crate) fn services_base(&self) -> &str {
        self.services_url.trim_end_matches('/')
    }
}
