use async_trait::async_trait;
use serde_json::Value;

use crate::{PortalResult, config::PortalConfig};

/// One request parameter; keys are fixed by the vendor API.
pub type Param = (&'static str, String);

/// Seam over the HTTP layer. The portal reports API-level failure inside an
/// HTTP 200 body, so implementations only decode JSON; the sentinel check
/// happens in the client above this trait.
#[async_trait]
pub trait RestTransport {
    async fn get_json(&self, url: &str, params: &[Param]) -> PortalResult<Value>;
    async fn post_form(&self, url: &str, params: &[Param]) -> PortalResult<Value>;
}

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &PortalConfig) -> PortalResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RestTransport for HttpTransport {
    async fn get_json(&self, url: &str, params: &[Param]) -> PortalResult<Value> {
        log::trace!("GET {url}");
        let response = self.client.get(url).query(params).send().await?;
        Ok(response.error_for_status()?.json().await?)
    }

    async fn post_form(&self, url: &str, params: &[Param]) -> PortalResult<Value> {
        log::trace!("POST {url}");
        let response = self.client.post(url).form(params).send().await?;
        Ok(response.error_for_status()?.json().await?)
    }
}
