//! Shared test helpers: a fixture configuration and an in-process fake of
//! the activation server built on the same primitives.

#![allow(dead_code)]

use keygate_crypto::{PayloadCipher, SignTemplate};
use keygate_license::transport::mock::ScriptedTransport;
use keygate_license::{BsphpClient, LicenseResult, ServerConfig};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const CLIENT_VERSION: &str = "v1.0";

/// A configuration with fixture secrets.
pub fn test_config() -> ServerConfig {
    ServerConfig::from_json_str(
        r#"{
            "server_url": "http://127.0.0.1:9/AppEn.php?appid=1&m=fixture",
            "mutual_key": "mk-fixture",
            "encrypt_password": "fixture-password",
            "iv": "bsphp666",
            "input_sign_template": "in[KEY]sig",
            "output_sign_template": "out[KEY]sig",
            "app_version": "v1.0"
        }"#,
    )
    .unwrap()
}

fn cipher(config: &ServerConfig) -> PayloadCipher {
    PayloadCipher::new(&config.encrypt_password, &config.iv).unwrap()
}

/// What the fake server saw in one request.
#[derive(Debug, Clone)]
pub struct DecodedRequest {
    pub form: BTreeMap<String, String>,
    pub params: BTreeMap<String, String>,
    pub canonical: String,
}

impl DecodedRequest {
    pub fn param(&self, key: &str) -> &str {
        self.params.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn api(&self) -> &str {
        self.param("api")
    }
}

/// Parses a form body the way the server does, checking the request
/// signature and decrypting the parameters.
pub fn decode_request(config: &ServerConfig, body: &str) -> DecodedRequest {
    let form: BTreeMap<String, String> = body
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_string(), urlencoding::decode(v).unwrap().into_owned()))
        .collect();

    assert_eq!(form["json"], "ok");
    let ciphertext = &form["parameter"];
    let input = SignTemplate::new(config.input_sign_template.as_str()).unwrap();
    assert_eq!(form["sgin"], input.sign(ciphertext), "request signature mismatch");

    let canonical = cipher(config).decrypt_string(ciphertext).unwrap();
    let params = canonical
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    DecodedRequest {
        form,
        params,
        canonical,
    }
}

/// Builds an encrypted, correctly signed reply.
pub fn signed_reply(config: &ServerConfig, data: &str, appsafecode: &str) -> Vec<u8> {
    reply_with_signature(config, data, appsafecode, None)
}

/// Builds an encrypted reply; `sgin` overrides the correct signature.
pub fn reply_with_signature(
    config: &ServerConfig,
    data: &str,
    appsafecode: &str,
    sgin: Option<&str>,
) -> Vec<u8> {
    let date = "2025-06-01 12:00:00";
    let unix = "1748750400";
    let microtime = "0.12345600 1748750400";
    let output = SignTemplate::new(config.output_sign_template.as_str()).unwrap();
    let correct = output.sign_parts(&[data, date, unix, microtime, appsafecode]);
    let document = serde_json::json!({
        "response": {
            "data": data,
            "date": date,
            "unix": unix,
            "microtime": microtime,
            "appsafecode": appsafecode,
            "sgin": sgin.unwrap_or(&correct),
        }
    });
    encrypt_document(config, &document.to_string())
}

/// Encrypts arbitrary text as the server would.
pub fn encrypt_document(config: &ServerConfig, text: &str) -> Vec<u8> {
    cipher(config).encrypt(text).unwrap().into_bytes()
}

/// Canned answers per API.
#[derive(Debug, Clone)]
pub struct FakeServer {
    pub session: String,
    pub version: String,
    pub card: String,
    pub announcement: String,
    /// When set, replies echo this instead of the request's code.
    pub forced_safe_code: Option<String>,
    /// When set, replies carry this signature instead of the correct one.
    pub forced_signature: Option<String>,
}

impl Default for FakeServer {
    fn default() -> Self {
        Self {
            session: "S1".to_string(),
            version: "v1.0|https://example.invalid/update|".to_string(),
            card: "01|1081|DEV42|VDATA|2026-01-01 00:00:00|||||".to_string(),
            announcement: "维护通知".to_string(),
            forced_safe_code: None,
            forced_signature: None,
        }
    }
}

impl FakeServer {
    pub fn respond(&self, config: &ServerConfig, body: &str) -> LicenseResult<Vec<u8>> {
        let request = decode_request(config, body);
        let data = match request.api() {
            "BSphpSeSsL.in" => &self.session,
            "v.in" => &self.version,
            "login.ic" => &self.card,
            "gg.in" => &self.announcement,
            other => panic!("unexpected api {other}"),
        };
        let safe_code = self
            .forced_safe_code
            .clone()
            .unwrap_or_else(|| request.param("appsafecode").to_string());
        Ok(reply_with_signature(
            config,
            data,
            &safe_code,
            self.forced_signature.as_deref(),
        ))
    }

    /// A transport answering from this fake.
    pub fn transport(self, config: &ServerConfig) -> Arc<ScriptedTransport> {
        let config = config.clone();
        Arc::new(ScriptedTransport::new(move |body| self.respond(&config, body)))
    }
}

/// A client wired to `server`, plus the shared transport for inspection.
pub fn client_for(server: FakeServer) -> (BsphpClient<Arc<ScriptedTransport>>, Arc<ScriptedTransport>) {
    let config = test_config();
    let transport = server.transport(&config);
    let client = BsphpClient::new(config, Arc::clone(&transport)).unwrap();
    (client, transport)
}

/// Decodes every request the transport has seen.
pub fn decoded_requests(transport: &ScriptedTransport) -> Vec<DecodedRequest> {
    let config = test_config();
    transport
        .requests()
        .iter()
        .map(|body| decode_request(&config, body))
        .collect()
}
