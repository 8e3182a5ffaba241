//! Identity provider hook: turning a login code into an identity.
//!
//! Playgate never sees a password. The client obtains a one-time
//! `code` from its platform and the backend trades it, together with
//! the app's credentials, for two things:
//!
//! - a stable **external identity** (what the handle is derived from)
//! - a per-session **session key** (what the profile payload is
//!   encrypted with)
//!
//! [`IdentityProvider`] is that exchange as a trait, so production can
//! use [`HttpIdentityProvider`] while tests plug in a canned one.

use std::future::Future;

use playgate_protocol::IdentityResponse;

use crate::SessionError;

/// What a successful code exchange yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSession {
    pub external_identity: String,
    /// Base64 AES key for the client's encrypted payload.
    pub session_key: String,
    pub union_identity: Option<String>,
}

impl From<IdentityResponse> for ProviderSession {
    fn from(resp: IdentityResponse) -> Self {
        Self {
            external_identity: resp.external_identity,
            session_key: resp.session_key,
            union_identity: resp.union_identity,
        }
    }
}

/// Exchanges a client login code for an identity.
///
/// # Example
///
/// ```rust
/// use playgate_session::{IdentityProvider, ProviderSession, SessionError};
///
/// /// Treats the code itself as the identity. Development only.
/// struct EchoProvider;
///
/// impl IdentityProvider for EchoProvider {
///     async fn exchange(&self, code: &str) -> Result<ProviderSession, SessionError> {
///         Ok(ProviderSession {
///             external_identity: code.to_string(),
///             session_key: String::new(),
///             union_identity: None,
///         })
///     }
/// }
/// ```
pub trait IdentityProvider: Send + Sync + 'static {
    /// Trades `code` for an identity.
    ///
    /// # Errors
    /// [`SessionError::Upstream`] if the provider is unreachable, times
    /// out, or rejects the code.
    fn exchange(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<ProviderSession, SessionError>> + Send;
}

#[cfg(feature = "http")]
pub use exchange::{DEFAULT_ENDPOINT, HttpIdentityProvider, HttpProviderConfig};

#[cfg(feature = "http")]
mod exchange {
    use std::time::Duration;

    use playgate_protocol::IdentityResponse;
    use tracing::debug;

    use super::{IdentityProvider, ProviderSession};
    use crate::SessionError;

    /// Default code-exchange endpoint (`jscode2session`).
    pub const DEFAULT_ENDPOINT: &str = "https://api.weixin.qq.com/sns/jscode2session";

    /// Where and as whom to call the provider.
    #[derive(Debug, Clone)]
    pub struct HttpProviderConfig {
        pub endpoint: String,
        pub app_id: String,
        pub app_secret: String,
        /// Upper bound for the whole exchange, connect included.
        /// Default: 5 seconds.
        pub timeout: Duration,
    }

    impl Default for HttpProviderConfig {
        fn default() -> Self {
            Self {
                endpoint: DEFAULT_ENDPOINT.to_string(),
                app_id: String::new(),
                app_secret: String::new(),
                timeout: Duration::from_secs(5),
            }
        }
    }

    /// An [`IdentityProvider`] that performs the exchange over HTTPS.
    ///
    /// Sends `GET {endpoint}?appid=..&secret=..&js_code=..&grant_type=authorization_code`
    /// and decodes the JSON reply as an [`IdentityResponse`].
    #[derive(Debug, Clone)]
    pub struct HttpIdentityProvider {
        client: reqwest::Client,
        config: HttpProviderConfig,
    }

    impl HttpIdentityProvider {
        pub fn new(config: HttpProviderConfig) -> Result<Self, SessionError> {
            let client = reqwest::Client::builder()
                .timeout(config.timeout)
                .build()
                .map_err(|e| SessionError::Upstream(format!("building http client: {e}")))?;
            Ok(Self { client, config })
        }

        pub fn config(&self) -> &HttpProviderConfig {
            &self.config
        }
    }

    impl IdentityProvider for HttpIdentityProvider {
        async fn exchange(&self, code: &str) -> Result<ProviderSession, SessionError> {
            let resp = self
                .client
                .get(&self.config.endpoint)
                .query(&[
                    ("appid", self.config.app_id.as_str()),
                    ("secret", self.config.app_secret.as_str()),
                    ("js_code", code),
                    ("grant_type", "authorization_code"),
                ])
                .send()
                .await
                .map_err(|e| SessionError::Upstream(format!("request failed: {e}")))?;

            let status = resp.status();
            if !status.is_success() {
                return Err(SessionError::Upstream(format!("provider returned {status}")));
            }

            let body: IdentityResponse = resp
                .json()
                .await
                .map_err(|e| SessionError::Upstream(format!("malformed provider reply: {e}")))?;

            if !body.is_ok() {
                return Err(SessionError::Upstream(format!(
                    "provider rejected code: errcode {} ({})",
                    body.error_code, body.error_message
                )));
            }
            if body.external_identity.is_empty() {
                return Err(SessionError::Upstream(
                    "provider reply carries no identity".into(),
                ));
            }

            debug!(identity = %body.external_identity, "code exchanged");
            Ok(body.into())
        }
    }
}
