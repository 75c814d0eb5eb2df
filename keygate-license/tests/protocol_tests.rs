mod common;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{Local, TimeZone};
use common::{encrypt_document, reply_with_signature, signed_reply, test_config};
use keygate_crypto::{encrypt, md5_hex, CipherIv, CipherKey, PayloadCipher, SignTemplate};
use keygate_license::{
    encode_payload, keys, ApiCall, ErrorKind, LicenseError, RequestBuilder, RequestParams,
    ResponseVerifier, ServerEnvelope, ENVELOPE_MARKER,
};
use pretty_assertions::assert_eq;

const CANONICAL_FIXTURE: &str =
    "api=BSphpSeSsL.in&date=2024/01/01#00:00:00&md5=&mutualkey=mk-fixture";
const CANONICAL_CIPHERTEXT: &str = "Y9C7w95hA8pYshW1gG1hxE1cRseCdUSVu21UEFYG4kyNVdM9CGtZCA3HzkliDcSp4o2DqEmTAPXtGOZPYCjDG5SDTdWcQTOL";

fn cipher() -> PayloadCipher {
    PayloadCipher::new("fixture-password", "bsphp666").unwrap()
}

fn builder() -> RequestBuilder {
    RequestBuilder::new(cipher(), SignTemplate::new("in[KEY]sig").unwrap())
}

fn verifier() -> ResponseVerifier {
    ResponseVerifier::new(cipher(), SignTemplate::new("out[KEY]sig").unwrap())
}

fn session_params() -> RequestParams {
    let at = Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    RequestParams::for_api(ApiCall::Session, &test_config(), &at)
}

// ── Parameters ──────────────────────────────────────────────────

#[test]
fn session_params_render_canonical_fixture() {
    assert_eq!(session_params().canonical(), CANONICAL_FIXTURE);
}

#[test]
fn api_names() {
    assert_eq!(ApiCall::Session.name(), "BSphpSeSsL.in");
    assert_eq!(ApiCall::Version.name(), "v.in");
    assert_eq!(ApiCall::LoginCard.name(), "login.ic");
    assert_eq!(ApiCall::Announcement.to_string(), "gg.in");
}

#[test]
fn builder_methods_set_wire_keys() {
    let params = RequestParams::new()
        .session("S")
        .anti_hijack_code("C")
        .device("K", "K_1")
        .card("N", "P");

    assert_eq!(params.get(keys::SESSION), Some("S"));
    assert_eq!(params.get("appsafecode"), Some("C"));
    assert_eq!(params.get("key"), Some("K"));
    assert_eq!(params.get("maxoror"), Some("K_1"));
    assert_eq!(params.get("icid"), Some("N"));
    assert_eq!(params.get("icpwd"), Some("P"));
    assert_eq!(params.len(), 6);
}

#[test]
fn duplicate_key_keeps_last_value() {
    let params = RequestParams::new().with("api", "a").with("api", "b");
    assert_eq!(params.len(), 1);
    assert_eq!(params.canonical(), "api=b");
}

#[test]
fn params_from_iterator() {
    let params: RequestParams = [("b", "2"), ("a", "1")].into_iter().collect();
    assert_eq!(params.canonical(), "a=1&b=2");
    assert!(!params.is_empty());
}

// ── Request building ────────────────────────────────────────────

#[test]
fn build_matches_known_ciphertext_and_signature() {
    let envelope = builder().build(&session_params()).unwrap();

    assert_eq!(envelope.marker, ENVELOPE_MARKER);
    assert_eq!(envelope.signature, "87fc0d7eef1a696f48435d78bd11bd28");
    assert_eq!(envelope.payload, encode_payload(CANONICAL_CIPHERTEXT));
}

#[test]
fn signature_covers_unencoded_ciphertext() {
    let envelope = builder().build(&session_params()).unwrap();
    let decoded = urlencoding::decode(&envelope.payload).unwrap();

    assert_eq!(decoded, CANONICAL_CIPHERTEXT);
    assert_eq!(
        envelope.signature,
        md5_hex(format!("in{CANONICAL_CIPHERTEXT}sig").as_bytes())
    );
}

#[test]
fn plus_is_percent_encoded() {
    // "hello" encrypts to "+FUrGH8U4rw=".
    let encoded = encode_payload("+FUrGH8U4rw=");
    assert!(!encoded.contains('+'));
    assert!(encoded.starts_with("%2B"));
    assert_eq!(urlencoding::decode(&encoded).unwrap(), "+FUrGH8U4rw=");
}

#[test]
fn form_body_layout() {
    let envelope = builder().build(&session_params()).unwrap();
    let body = envelope.to_form_body();

    assert!(body.starts_with("json=ok&sgin=87fc0d7eef1a696f48435d78bd11bd28&parameter="));
    assert_eq!(body.matches('&').count(), 2);
}

#[test]
fn build_is_deterministic() {
    let a = builder().build(&session_params()).unwrap();
    let b = builder().build(&session_params()).unwrap();
    assert_eq!(a, b);
}

// ── Response verification ───────────────────────────────────────

#[test]
fn verifies_signed_reply() {
    let raw = signed_reply(&test_config(), "S1", "2024/01/01#00:00:01");
    let response = verifier().verify(&raw, Some("2024/01/01#00:00:01")).unwrap();

    assert_eq!(response.data, "S1");
    assert_eq!(response.appsafecode, "2024/01/01#00:00:01");
    assert_eq!(response.unix, "1748750400");
}

#[test]
fn echo_check_skipped_when_nothing_was_sent() {
    let raw = signed_reply(&test_config(), "S1", "");
    assert!(verifier().verify(&raw, None).is_ok());
}

#[test]
fn tampered_signature_is_rejected() {
    let raw = reply_with_signature(&test_config(), "S1", "", Some("deadbeef"));
    let err = verifier().verify(&raw, None).unwrap_err();
    assert!(matches!(err, LicenseError::SignatureInvalid));
}

#[test]
fn signature_for_other_data_is_rejected() {
    let template = SignTemplate::new("out[KEY]sig").unwrap();
    let other = template.sign_parts(&["S2", "2025-06-01 12:00:00", "1748750400", "0.12345600 1748750400", ""]);
    let raw = reply_with_signature(&test_config(), "S1", "", Some(&other));

    assert!(matches!(
        verifier().verify(&raw, None),
        Err(LicenseError::SignatureInvalid)
    ));
}

#[test]
fn mismatched_echo_is_hijack() {
    let raw = signed_reply(&test_config(), "v1.0", "2000/01/01#00:00:00");
    let err = verifier()
        .verify(&raw, Some("2024/01/01#00:00:01"))
        .unwrap_err();

    match err {
        LicenseError::HijackSuspected { sent, received } => {
            assert_eq!(sent, "2024/01/01#00:00:01");
            assert_eq!(received, "2000/01/01#00:00:00");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn numeric_fields_are_accepted() {
    let template = SignTemplate::new("out[KEY]sig").unwrap();
    let sgin = template.sign_parts(&["ok", "d", "1700000000", "0.5", ""]);
    let json = format!(
        r#"{{"response":{{"data":"ok","date":"d","unix":1700000000,"microtime":0.5,"appsafecode":null,"sgin":"{sgin}"}}}}"#
    );
    let raw = encrypt_document(&test_config(), &json);

    let response = verifier().verify(&raw, None).unwrap();
    assert_eq!(response.unix, "1700000000");
    assert_eq!(response.microtime, "0.5");
    assert_eq!(response.appsafecode, "");
}

#[test]
fn reply_with_line_breaks_still_verifies() {
    let raw = signed_reply(&test_config(), "S1", "");
    let text = String::from_utf8(raw).unwrap();
    let (head, tail) = text.split_at(text.len() / 2);
    let wrapped = format!("{head}\r\n{tail}\n");

    assert!(verifier().verify(wrapped.as_bytes(), None).is_ok());
}

#[test]
fn missing_response_object_is_malformed() {
    let raw = encrypt_document(&test_config(), r#"{"data":"S1"}"#);
    let err = verifier().verify(&raw, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedResponse);
}

#[test]
fn non_json_plaintext_is_malformed() {
    let raw = encrypt_document(&test_config(), "<html>502</html>");
    let err = verifier().verify(&raw, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedResponse);
}

#[test]
fn non_utf8_plaintext_is_malformed() {
    let ciphertext = encrypt(
        &CipherKey::derive("fixture-password"),
        &CipherIv::default(),
        &[0xff, 0xfe, 0x00, 0x7b],
    )
    .unwrap();
    let raw = STANDARD.encode(ciphertext);

    let err = verifier().verify(raw.as_bytes(), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedResponse);
}

#[test]
fn non_utf8_raw_bytes_are_malformed() {
    let err = verifier().verify(&[0xc3, 0x28], None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedResponse);
}

#[test]
fn wrong_password_reply_fails_to_decrypt() {
    let raw = b"+FUrGH8U4rw=";
    let other = ResponseVerifier::new(
        PayloadCipher::new("other-password", "bsphp666").unwrap(),
        SignTemplate::new("out[KEY]sig").unwrap(),
    );
    let err = other.verify(raw, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DecryptionFailure);
}

#[test]
fn empty_reply_fails_to_decrypt() {
    let err = verifier().verify(b"", None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DecryptionFailure);
}

#[test]
fn envelope_signature_material_order() {
    let env = ServerEnvelope {
        data: "a".into(),
        date: "b".into(),
        unix: "c".into(),
        microtime: "d".into(),
        appsafecode: "e".into(),
        sgin: "ignored".into(),
    };
    assert_eq!(env.signature_material(), "abcde");
}
