//! Card-key activation against a BSPHP-style licensing server.
//!
//! This crate handles:
//! - Canonical request parameters and their encryption and signing
//! - Verification of encrypted, signed server replies (with anti-hijack echo)
//! - The session → version → card-login sequence
//! - Device identity and hand-off of the resulting license
//!
//! # Wire format
//!
//! Requests are form bodies `json=ok&sgin=<md5>&parameter=<ciphertext>`,
//! where the ciphertext is the 3DES-CBC encryption of the sorted
//! `k=v&k=v` parameter string. Replies are the same cipher over a JSON
//! document `{"response": {data, date, unix, microtime, appsafecode, sgin}}`.
//!
//! # Example
//!
//! ```no_run
//! use keygate_license::{
//!     BsphpClient, CardCredentials, HostDevice, HttpTransport, ServerConfig, Verification,
//! };
//!
//! # async fn demo() -> keygate_license::LicenseResult<()> {
//! let config = ServerConfig::from_file("keygate.json")?;
//! let transport = HttpTransport::new(&config)?;
//! let client = BsphpClient::new(config, transport)?;
//!
//! let outcome = Verification::new()
//!     .run(&client, &CardCredentials::new("CARD-0001"), &HostDevice::detect_for("my-app"))
//!     .await;
//! println!("verified: {}", outcome.is_verified());
//! # Ok(())
//! # }
//! ```

mod card;
mod client;
mod config;
mod device;
mod error;
mod license;
mod messages;
mod params;
mod request;
mod response;
mod store;
pub mod transport;
mod verify;

pub use card::{
    parse_server_version, CardCredentials, CardReply, SUCCESS_CODE, SUCCESS_STATUS, UNKNOWN_CODE,
};
pub use client::{BsphpClient, Session};
pub use config::{ServerConfig, DEFAULT_TIMEOUT_SECS};
pub use device::{DeviceIdentity, HostDevice, KeySource, StaticDevice, DEVICE_KEY_FILE_NAME};
pub use error::{ErrorKind, LicenseError, LicenseResult};
pub use license::{License, EXPIRE_DATE_FORMAT, EXPIRE_DISPLAY_FORMAT, UNKNOWN_EXPIRY};
pub use messages::{friendly_message, RejectReason};
pub use params::{format_timestamp, keys, ApiCall, RequestParams, TIMESTAMP_FORMAT};
pub use request::{encode_payload, EncryptedEnvelope, RequestBuilder, ENVELOPE_MARKER};
pub use response::{ResponseVerifier, ServerEnvelope, VerifiedResponse};
pub use store::{FileLicenseStore, LicenseSink, MemoryLicenseStore, LICENSE_FILE_NAME};
pub use transport::Transport;
pub use verify::{verify_and_store, Verification, VerificationOutcome, VerificationState};

#[cfg(feature = "online")]
pub use transport::HttpTransport;
