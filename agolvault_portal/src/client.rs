use agolvault_core::{
    ids::{LayerId, OrgId},
    time::{Clock, SystemClock, Timestamp},
};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    PortalError, PortalResult,
    config::PortalConfig,
    token::{Credentials, Token},
    transport::{Param, RestTransport},
    types::{ServiceMetadata, UserProfile},
};

/// Authenticated portal session. `connect` obtains the token up front; if the
/// token request is rejected no client is handed out, so no later API call
/// can be attempted with missing credentials.
#[derive(Debug)]
pub struct PortalClient<T, K = SystemClock>
where
    T: RestTransport,
    K: Clock,
{
    transport: T,
    config: PortalConfig,
    token: Token,
    clock: K,
}

impl<T> PortalClient<T, SystemClock>
where
    T: RestTransport,
{
    pub async fn connect(
        transport: T,
        config: PortalConfig,
        credentials: &Credentials,
    ) -> PortalResult<Self> {
        Self::connect_with_clock(transport, config, credentials, SystemClock).await
    }
}

impl<T, K> PortalClient<T, K>
where
    T: RestTransport,
    K: Clock,
{
    pub async fn connect_with_clock(
        transport: T,
        config: PortalConfig,
        credentials: &Credentials,
        clock: K,
    ) -> PortalResult<Self> {
        config.validate()?;
        let token = generate_token(&transport, &config, credentials).await?;
        log::debug!(
            "authenticated as {} (token valid until epoch {})",
            credentials.username,
            token.expires_at.as_epoch_secs()
        );

        Ok(Self {
            transport,
            config,
            token,
            clock,
        })
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub async fn get_user(&self, username: &str) -> PortalResult<UserProfile> {
        let url = format!(
            "{}/sharing/rest/community/users/{username}",
            self.config.portal_base()
        );
        let value = self.request(&url, Vec::new()).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Raw content listing for a user. Returned undecoded because the backup
    /// session persists it verbatim; use [`crate::types::ContentListing`] to
    /// read the typed item set out of it.
    pub async fn get_user_content(&self, username: &str) -> PortalResult<Value> {
        let url = format!(
            "{}/sharing/rest/content/users/{username}",
            self.config.portal_base()
        );
        self.request(&url, Vec::new()).await
    }

    pub async fn service_layers(
        &self,
        org_id: &OrgId,
        service: &str,
    ) -> PortalResult<ServiceMetadata> {
        let url = self.feature_server_url(org_id, service);
        let value = self.request(&url, Vec::new()).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Unfiltered full-attribute dump of one layer, kept as raw JSON: it is
    /// written to disk before any conversion happens.
    pub async fn query_layer(
        &self,
        org_id: &OrgId,
        service: &str,
        layer_id: LayerId,
    ) -> PortalResult<Value> {
        let url = format!(
            "{}/{layer_id}/query",
            self.feature_server_url(org_id, service)
        );
        let extra = vec![("outFields", "*".to_owned()), ("where", "1=1".to_owned())];
        self.request(&url, extra).await
    }

    fn feature_server_url(&self, org_id: &OrgId, service: &str) -> String {
        format!(
            "{}/{org_id}/arcgis/rest/services/{service}/FeatureServer",
            self.config.services_base()
        )
    }

    async fn request(&self, url: &str, extra: Vec<Param>) -> PortalResult<Value> {
        let mut params = self.session_params()?;
        params.extend(extra);
        let value = self.transport.get_json(url, &params).await?;
        reject_api_error(value)
    }

    fn session_params(&self) -> PortalResult<Vec<Param>> {
        let now = self.clock.now();
        if self.token.is_expired(now) {
            return Err(PortalError::TokenExpired {
                expired_at_epoch_secs: self.token.expires_at.as_epoch_secs(),
            });
        }

        Ok(vec![
            ("token", self.token.value.clone()),
            ("f", "json".to_owned()),
        ])
    }
}

async fn generate_token<T: RestTransport>(
    transport: &T,
    config: &PortalConfig,
    credentials: &Credentials,
) -> PortalResult<Token> {
    let url = format!("{}/sharing/rest/generateToken", config.portal_base());
    let params = vec![
        ("username", credentials.username.clone()),
        ("password", credentials.password.clone()),
        ("expiration", config.token_expiration_minutes.to_string()),
        ("client", "referer".to_owned()),
        ("referer", config.referer.clone()),
        ("f", "json".to_owned()),
    ];

    let value = transport.post_form(&url, &params).await?;
    let value = reject_api_error(value).map_err(into_auth_rejection)?;

    let decoded: TokenResponse = serde_json::from_value(value)?;
    let expires_at = Timestamp::from_epoch_millis(decoded.expires).ok_or_else(|| {
        PortalError::UnexpectedPayload(format!("token expiry out of range: {}", decoded.expires))
    })?;

    Ok(Token {
        value: decoded.token,
        expires_at,
    })
}

fn into_auth_rejection(error: PortalError) -> PortalError {
    match error {
        PortalError::Api { message, details } => PortalError::Auth { message, details },
        other => other,
    }
}

/// The portal reports API-level failure inside an HTTP 200 body; a top-level
/// `error` key is the sentinel and must never be treated as success.
fn reject_api_error(value: Value) -> PortalResult<Value> {
    let Some(error) = value.get("error") else {
        return Ok(value);
    };

    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("portal reported an unspecified error")
        .to_owned();
    let details = error
        .get("details")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();

    Err(PortalError::Api { message, details })
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
    expires: i64,
}
