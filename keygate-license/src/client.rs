//! One awaitable method per server API, each a single round trip.

use crate::card::{parse_server_version, CardCredentials, CardReply};
use crate::config::ServerConfig;
use crate::device::DeviceIdentity;
use crate::error::{LicenseError, LicenseResult};
use crate::license::License;
use crate::messages::friendly_message;
use crate::params::{format_timestamp, keys, ApiCall, RequestParams};
use crate::request::RequestBuilder;
use crate::response::{ResponseVerifier, VerifiedResponse};
use crate::transport::Transport;
use chrono::{Local, Utc};
use tracing::{debug, info, warn};

/// Server-issued token scoping one verification attempt.
///
/// Deliberately neither `Clone` nor serializable: it lives only as long
/// as the attempt that obtained it.
#[derive(Debug, PartialEq, Eq)]
pub struct Session(String);

impl Session {
    /// The raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Client for a BSPHP-style activation server.
pub struct BsphpClient<T> {
    config: ServerConfig,
    builder: RequestBuilder,
    verifier: ResponseVerifier,
    transport: T,
}

impl<T: Transport> BsphpClient<T> {
    /// Creates a client, validating the configuration.
    pub fn new(config: ServerConfig, transport: T) -> LicenseResult<Self> {
        config.validate()?;
        let builder = RequestBuilder::new(config.cipher()?, config.input_template()?);
        let verifier = ResponseVerifier::new(config.cipher()?, config.output_template()?);
        Ok(Self {
            config,
            builder,
            verifier,
            transport,
        })
    }

    /// The client configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    fn params(&self, api: ApiCall) -> RequestParams {
        RequestParams::for_api(api, &self.config, &Local::now())
    }

    /// Fresh anti-hijack code for one request.
    fn anti_hijack_code() -> String {
        format_timestamp(&Local::now())
    }

    /// Builds, sends and verifies one request.
    async fn round_trip(&self, params: RequestParams) -> LicenseResult<VerifiedResponse> {
        let api = params.api().unwrap_or_default().to_string();
        let sent_code = params.get(keys::ANTI_HIJACK).map(str::to_owned);

        let envelope = self.builder.build(&params)?;
        debug!(api = %api, "Sending activation request");
        let raw = self.transport.post(envelope.to_form_body()).await?;

        self.verifier.verify(&raw, sent_code.as_deref()).inspect_err(|e| {
            warn!(api = %api, "Response rejected: {e}");
        })
    }

    /// Acquires a session token (`BSphpSeSsL.in`).
    pub async fn session(&self) -> LicenseResult<Session> {
        let response = self.round_trip(self.params(ApiCall::Session)).await?;
        if response.data.is_empty() {
            return Err(LicenseError::MalformedResponse(
                "server returned an empty session token".to_string(),
            ));
        }
        info!("Session obtained");
        Ok(Session(response.data))
    }

    /// Reads the server-side application version (`v.in`).
    pub async fn version(&self, session: &Session) -> LicenseResult<String> {
        let params = self
            .params(ApiCall::Version)
            .session(session.as_str())
            .anti_hijack_code(&Self::anti_hijack_code());
        let response = self.round_trip(params).await?;
        let version = parse_server_version(&response.data).to_string();
        info!(server = %version, client = %self.config.app_version, "Version received");
        Ok(version)
    }

    /// Logs in with a card (`login.ic`).
    ///
    /// A refusal is [`LicenseError::ServerRejected`] carrying the server
    /// code and the translated user-facing message.
    pub async fn login_card(
        &self,
        session: &Session,
        credentials: &CardCredentials,
        device: &dyn DeviceIdentity,
    ) -> LicenseResult<License> {
        let params = self
            .params(ApiCall::LoginCard)
            .session(session.as_str())
            .anti_hijack_code(&Self::anti_hijack_code())
            .device(&device.device_key(), &device.online_mark())
            .card(credentials.number(), credentials.password());
        let response = self.round_trip(params).await?;

        match CardReply::parse(&response.data) {
            CardReply::Accepted {
                device_key,
                verify_data,
                expire_date,
            } => {
                info!(expire_date = %expire_date, "Card accepted");
                Ok(License::new(
                    credentials.number(),
                    device_key,
                    verify_data,
                    expire_date,
                    Utc::now(),
                ))
            }
            CardReply::Rejected {
                code,
                server_message,
            } => {
                warn!(code = %code, server_message = %server_message, "Card rejected");
                let message = friendly_message(&code, &server_message).to_string();
                Err(LicenseError::ServerRejected { code, message })
            }
        }
    }

    /// Reads the application announcement (`gg.in`).
    pub async fn announcement(&self, session: &Session) -> LicenseResult<String> {
        let params = self
            .params(ApiCall::Announcement)
            .session(session.as_str())
            .anti_hijack_code(&Self::anti_hijack_code());
        let response = self.round_trip(params).await?;
        Ok(response.data)
    }
}
