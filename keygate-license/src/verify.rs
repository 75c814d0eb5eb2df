//! The session → version → card verification sequence.
//!
//! ```text
//! Idle → SessionRequested → SessionObtained → VersionRequested
//!      → VersionMatched → CardVerifying → Verified | Rejected
//! ```
//!
//! Each stage awaits one round trip and the first failure ends the attempt.
//! There are no retries; a new attempt starts again from `Idle` with a new
//! [`Verification`], so no session or nonce survives from an earlier one.

use crate::card::CardCredentials;
use crate::client::{BsphpClient, Session};
use crate::device::DeviceIdentity;
use crate::error::{ErrorKind, LicenseError, LicenseResult};
use crate::license::License;
use crate::store::LicenseSink;
use crate::transport::Transport;
use tracing::{info, warn};

/// A stage of one verification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationState {
    Idle,
    SessionRequested,
    SessionObtained,
    VersionRequested,
    VersionMatched,
    CardVerifying,
    Verified(License),
    Rejected {
        kind: ErrorKind,
        code: Option<String>,
        message: String,
    },
}

impl VerificationState {
    /// Returns true for `Verified` and `Rejected`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Verified(_) | Self::Rejected { .. })
    }

    fn outcome(&self) -> Option<VerificationOutcome> {
        match self {
            Self::Verified(license) => Some(VerificationOutcome::Verified(license.clone())),
            Self::Rejected {
                kind,
                code,
                message,
            } => Some(VerificationOutcome::Rejected {
                kind: *kind,
                code: code.clone(),
                message: message.clone(),
            }),
            _ => None,
        }
    }
}

impl From<VerificationOutcome> for VerificationState {
    fn from(outcome: VerificationOutcome) -> Self {
        match outcome {
            VerificationOutcome::Verified(license) => Self::Verified(license),
            VerificationOutcome::Rejected {
                kind,
                code,
                message,
            } => Self::Rejected {
                kind,
                code,
                message,
            },
        }
    }
}

/// Final result of an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified(License),
    /// `code` is the server's error code for card rejections.
    Rejected {
        kind: ErrorKind,
        code: Option<String>,
        message: String,
    },
}

impl VerificationOutcome {
    /// The license, if verification succeeded.
    #[must_use]
    pub fn license(&self) -> Option<&License> {
        match self {
            Self::Verified(license) => Some(license),
            Self::Rejected { .. } => None,
        }
    }

    /// Returns true if verification succeeded.
    #[must_use]
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified(_))
    }
}

/// One verification attempt.
#[derive(Debug)]
pub struct Verification {
    state: VerificationState,
    history: Vec<VerificationState>,
}

impl Default for Verification {
    fn default() -> Self {
        Self::new()
    }
}

impl Verification {
    /// A fresh attempt in `Idle`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: VerificationState::Idle,
            history: vec![VerificationState::Idle],
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &VerificationState {
        &self.state
    }

    /// Every state visited so far, starting with `Idle`.
    #[must_use]
    pub fn history(&self) -> &[VerificationState] {
        &self.history
    }

    fn enter(&mut self, state: VerificationState) {
        self.history.push(state.clone());
        self.state = state;
    }

    /// Runs the full sequence to a terminal state.
    ///
    /// May only be called once per attempt; a second call returns the
    /// outcome already reached without touching the network. If an earlier
    /// call was cancelled before finishing, the attempt ends as
    /// [`ErrorKind::Interrupted`].
    pub async fn run<T: Transport>(
        &mut self,
        client: &BsphpClient<T>,
        credentials: &CardCredentials,
        device: &dyn DeviceIdentity,
    ) -> VerificationOutcome {
        if let Some(outcome) = self.state.outcome() {
            return outcome;
        }

        let outcome = if self.state == VerificationState::Idle {
            match self.drive(client, credentials, device).await {
                Ok(license) => {
                    info!(card = %license.card_number(), "Verification succeeded");
                    VerificationOutcome::Verified(license)
                }
                Err(e) => {
                    warn!("Verification failed: {e}");
                    VerificationOutcome::Rejected {
                        kind: e.kind(),
                        code: e.server_code().map(str::to_owned),
                        message: e.user_message(),
                    }
                }
            }
        } else {
            // An earlier run was dropped mid-flight; its session is gone.
            warn!(state = ?self.state, "Verification was interrupted");
            VerificationOutcome::Rejected {
                kind: ErrorKind::Interrupted,
                code: None,
                message: ErrorKind::Interrupted.user_message().to_string(),
            }
        };

        self.enter(outcome.clone().into());
        outcome
    }

    async fn drive<T: Transport>(
        &mut self,
        client: &BsphpClient<T>,
        credentials: &CardCredentials,
        device: &dyn DeviceIdentity,
    ) -> LicenseResult<License> {
        self.enter(VerificationState::SessionRequested);
        let session: Session = client.session().await?;
        self.enter(VerificationState::SessionObtained);

        self.enter(VerificationState::VersionRequested);
        let server_version = client.version(&session).await?;
        let expected = &client.config().app_version;
        if &server_version != expected {
            return Err(LicenseError::VersionMismatch {
                expected: expected.clone(),
                actual: server_version,
            });
        }
        self.enter(VerificationState::VersionMatched);

        self.enter(VerificationState::CardVerifying);
        client.login_card(&session, credentials, device).await
    }
}

/// Runs a fresh attempt and hands a verified license to `sink`.
///
/// A sink failure after successful verification is reported as a
/// `Storage` rejection.
pub async fn verify_and_store<T: Transport>(
    client: &BsphpClient<T>,
    credentials: &CardCredentials,
    device: &dyn DeviceIdentity,
    sink: &dyn LicenseSink,
) -> VerificationOutcome {
    let outcome = Verification::new().run(client, credentials, device).await;
    if let VerificationOutcome::Verified(license) = &outcome {
        if let Err(e) = sink.save(license) {
            warn!("Failed to persist license: {e}");
            return VerificationOutcome::Rejected {
                kind: e.kind(),
                code: None,
                message: e.user_message(),
            };
        }
    }
    outcome
}
