mod common;

use common::{decode_request, signed_reply, test_config};
use keygate_license::{BsphpClient, ErrorKind, HttpTransport, LicenseError, ServerConfig, Transport};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

fn config_for(server: &MockServer) -> ServerConfig {
    let mut cfg = test_config();
    cfg.server_url = format!("{}/AppEn.php?appid=1&m=fixture", server.uri());
    cfg.timeout_secs = 5;
    cfg
}

/// Answers like the real server: decrypts the request, echoes its code.
struct EchoResponder {
    data: &'static str,
}

impl Respond for EchoResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let config = test_config();
        let body = String::from_utf8_lossy(&request.body);
        let decoded = decode_request(&config, &body);
        let reply = signed_reply(&config, self.data, decoded.param("appsafecode"));
        ResponseTemplate::new(200).set_body_bytes(reply)
    }
}

#[tokio::test]
async fn posts_form_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/AppEn.php"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("json=ok&sgin="))
        .respond_with(ResponseTemplate::new(200).set_body_string("payload"))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&config_for(&server)).unwrap();
    let raw = transport
        .post("json=ok&sgin=abc&parameter=xyz".to_string())
        .await
        .unwrap();

    assert_eq!(raw, b"payload");
}

#[tokio::test]
async fn non_success_status_is_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&config_for(&server)).unwrap();
    let err = transport.post("json=ok".to_string()).await.unwrap_err();

    assert!(matches!(err, LicenseError::Network(_)));
}

#[tokio::test]
async fn unreachable_server_is_network_error() {
    let mut cfg = test_config();
    cfg.server_url = "http://127.0.0.1:1/AppEn.php".to_string();
    let transport = HttpTransport::new(&cfg).unwrap();

    let err = transport.post("json=ok".to_string()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NetworkError);
}

#[tokio::test]
async fn client_round_trip_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(EchoResponder { data: "S1" })
        .mount(&server)
        .await;

    let config = config_for(&server);
    let transport = HttpTransport::new(&config).unwrap();
    assert!(transport.url().starts_with(&server.uri()));

    let client = BsphpClient::new(config, transport).unwrap();
    let session = client.session().await.unwrap();
    assert_eq!(session.as_str(), "S1");

    // Version replies must echo the code; the responder does.
    assert_eq!(client.version(&session).await.unwrap(), "S1");
}
