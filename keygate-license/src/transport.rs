//! Transport abstraction: send a form body, receive the raw reply.
//!
//! The handshake never talks to the network directly, so tests and host
//! applications can substitute their own transport.

use crate::error::LicenseResult;
use async_trait::async_trait;
use std::sync::Arc;

/// Delivers one request body to the activation server.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Posts `body` and returns the raw response bytes.
    ///
    /// Transport failures, timeouts and non-success statuses are
    /// [`LicenseError::Network`](crate::LicenseError::Network).
    async fn post(&self, body: String) -> LicenseResult<Vec<u8>>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn post(&self, body: String) -> LicenseResult<Vec<u8>> {
        (**self).post(body).await
    }
}

#[cfg(feature = "online")]
pub use http::HttpTransport;

#[cfg(feature = "online")]
mod http {
    use super::Transport;
    use crate::config::ServerConfig;
    use crate::error::{LicenseError, LicenseResult};
    use async_trait::async_trait;
    use reqwest::header::{ACCEPT, CONTENT_TYPE};
    use reqwest::Client;
    use tracing::{debug, warn};

    /// HTTP POST to the configured endpoint.
    #[derive(Debug, Clone)]
    pub struct HttpTransport {
        client: Client,
        url: String,
    }

    impl HttpTransport {
        /// Creates a transport with the endpoint and timeout from `config`.
        pub fn new(config: &ServerConfig) -> LicenseResult<Self> {
            let client = Client::builder()
                .timeout(config.timeout())
                .build()
                .map_err(|e| LicenseError::Network(format!("failed to create HTTP client: {e}")))?;

            Ok(Self {
                client,
                url: config.server_url.clone(),
            })
        }

        /// Returns the endpoint URL.
        #[must_use]
        pub fn url(&self) -> &str {
            &self.url
        }
    }

    #[async_trait]
    impl Transport for HttpTransport {
        async fn post(&self, body: String) -> LicenseResult<Vec<u8>> {
            let response = self
                .client
                .post(&self.url)
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .header(ACCEPT, "application/json")
                .body(body)
                .send()
                .await
                .map_err(|e| {
                    warn!("Activation request failed: {e}");
                    LicenseError::Network(e.to_string())
                })?;

            let status = response.status();
            if !status.is_success() {
                return Err(LicenseError::Network(format!("server returned HTTP {status}")));
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| LicenseError::Network(format!("failed to read response: {e}")))?;

            debug!(status = status.as_u16(), len = bytes.len(), "Activation response received");
            Ok(bytes.to_vec())
        }
    }
}

/// A scripted transport for testing.
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    type Responder = dyn Fn(&str) -> LicenseResult<Vec<u8>> + Send + Sync;

    /// Records every request body and answers from a closure.
    pub struct ScriptedTransport {
        responder: Box<Responder>,
        requests: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        /// Creates a transport that answers each body with `responder(body)`.
        pub fn new<F>(responder: F) -> Self
        where
            F: Fn(&str) -> LicenseResult<Vec<u8>> + Send + Sync + 'static,
        {
            Self {
                responder: Box::new(responder),
                requests: Mutex::new(Vec::new()),
            }
        }

        /// Returns the bodies posted so far, in order.
        pub fn requests(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .clone()
        }

        /// Returns the number of bodies posted so far.
        pub fn request_count(&self) -> usize {
            self.requests().len()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn post(&self, body: String) -> LicenseResult<Vec<u8>> {
            let reply = (self.responder)(&body);
            self.requests
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(body);
            reply
        }
    }
}
