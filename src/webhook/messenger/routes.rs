//! Messenger webhook endpoint handlers
//!
//! - `GET /webhook`: subscription handshake
//! - `POST /webhook`: signed event callbacks
//! - `GET /authorize`: end of the account linking flow
//!
//! # Security
//!
//! The POST endpoint buffers the raw body, checks its `x-hub-signature`
//! against the app secret and only then parses it. The platform retries any
//! callback that does not get a 200 within 20 seconds, so once the body is
//! accepted the answer is always 200, whatever the outbound calls did.

use super::{
    handler,
    schemas::WebhookEnvelope,
    security::{self, VerifyOutcome},
};
use crate::{consts, errors::WebhookError, metric, webhook::AppState};
use ntex::{util::Bytes, web};
use serde::Deserialize;
use subtle::ConstantTimeEq;
use tracing::Instrument;

/// Query parameters for webhook verification
#[derive(Debug, Default, Deserialize)]
pub struct VerifyQuery {
    /// The mode parameter, should be "subscribe"
    #[serde(rename = "hub.mode", default)]
    pub mode: Option<String>,
    /// The token configured in the app dashboard
    #[serde(rename = "hub.verify_token", default)]
    pub verify_token: Option<String>,
    /// The challenge string to echo back
    #[serde(rename = "hub.challenge", default)]
    pub challenge: Option<String>,
}

/// Query parameters sent by the platform to the account linking URL
#[derive(Debug, Default, Deserialize)]
pub struct AuthorizeQuery {
    #[serde(default)]
    pub account_linking_token: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
}

/// Webhook verification endpoint (GET)
///
/// # Returns
/// - 200 with challenge string if verification succeeds
/// - 403 if verification fails
#[web::get("/webhook")]
pub async fn verify(
    query: web::types::Query<VerifyQuery>,
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    if query.mode.as_deref() != Some(consts::SUBSCRIBE_MODE) {
        logfire::warn!("Failed validation: hub.mode is not subscribe");
        return Err(WebhookError::VerificationFailed.into());
    }

    let expected_token = app_state.config.validation_token.as_bytes();
    let token_matches: bool = query
        .verify_token
        .as_deref()
        .unwrap_or_default()
        .as_bytes()
        .ct_eq(expected_token)
        .into();

    if !token_matches {
        logfire::warn!("Failed validation. Make sure the validation tokens match.");
        return Err(WebhookError::VerificationFailed.into());
    }

    logfire::info!("Validating webhook");

    Ok(web::HttpResponse::Ok()
        .content_type("text/plain")
        .body(query.challenge.clone().unwrap_or_default()))
}

/// Webhook receiver endpoint (POST)
///
/// # Returns
/// - 200 with an empty body once the batch went through the handlers
/// - 400 on a bad signature or an undecodable body
/// - 401 on a missing signature when unsigned callbacks are refused
#[web::post("/webhook")]
pub async fn receive(
    req: web::HttpRequest,
    body: Bytes,
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    let signature = req
        .headers()
        .get(consts::SIGNATURE_HEADER)
        .map(|value| value.to_str().unwrap_or_default());

    match security::verify_signature(&body, signature, app_state.config.app_secret.as_bytes()) {
        Ok(VerifyOutcome::Verified) => metric::incr_signature_statds("verified"),
        Ok(VerifyOutcome::Unsigned) => {
            metric::incr_signature_statds("unsigned");
            if app_state.config.reject_unsigned {
                return Err(WebhookError::Unsigned.into());
            }
            logfire::warn!("Couldn't validate the signature, accepting unsigned callback");
        }
        Err(e) => {
            metric::incr_signature_statds("rejected");
            return Err(WebhookError::Signature(e).into());
        }
    }

    let envelope = WebhookEnvelope::parse(&body).map_err(WebhookError::Malformed)?;

    let outcomes = handler::process_webhook(
        &envelope,
        &app_state.sender,
        app_state.config.base_url(),
    )
    .instrument(logfire::span!("messenger_webhook"))
    .await;

    logfire::info!(
        "Processed webhook: object={object}, entries={entries}, events={events}, sent={sent}, failed={failed}",
        object = envelope.object.clone(),
        entries = envelope.entries.len() as i64,
        events = envelope.event_count() as i64,
        sent = outcomes.iter().filter(|o| o.sent).count() as i64,
        failed = outcomes.iter().filter(|o| o.error.is_some()).count() as i64
    );

    Ok(web::HttpResponse::Ok().finish())
}

/// Account linking authorization endpoint (GET)
///
/// The authorization code would be generated per user by a real login step,
/// here every visit succeeds and is redirected to the platform.
#[web::get("/authorize")]
pub async fn authorize(
    query: web::types::Query<AuthorizeQuery>,
) -> Result<impl web::Responder, web::Error> {
    let Some(redirect_uri) = query.redirect_uri.as_deref() else {
        return Err(WebhookError::MissingRedirectUri.into());
    };

    logfire::info!(
        "Authorizing account linking token {token}",
        token = query.account_linking_token.clone().unwrap_or_default()
    );

    let separator = if redirect_uri.contains('?') { '&' } else { '?' };
    let location = format!(
        "{redirect_uri}{separator}authorization_code={code}",
        code = consts::ACCOUNT_LINKING_AUTH_CODE
    );

    Ok(web::HttpResponse::Found()
        .set_header("location", location)
        .finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config,
        services::{ImplMessageSender, MockMessageSender, SendError, SendReceipt},
        webhook::routes as webhook_routes,
    };
    use mockall::Sequence;
    use ntex::{
        http::StatusCode,
        web::test::{self, TestRequest},
    };
    use serde_json::json;

    fn app_state(sender: MockMessageSender) -> AppState {
        AppState {
            config: config::test_config(),
            sender: Box::new(sender) as ImplMessageSender,
        }
    }

    fn signed(body: &[u8]) -> String {
        format!("sha1={}", security::sign(body, b"test_secret").unwrap())
    }

    fn batch_body(texts: &[&str]) -> Vec<u8> {
        let messaging: Vec<_> = texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                json!({
                    "sender": {"id": format!("USER_{i}")},
                    "recipient": {"id": "PAGE_ID"},
                    "timestamp": 1458692752478_i64,
                    "message": {"mid": format!("mid.{i}"), "text": text}
                })
            })
            .collect();

        serde_json::to_vec(&json!({
            "object": "page",
            "entry": [{"id": "PAGE_ID", "time": 1458692752478_i64, "messaging": messaging}]
        }))
        .unwrap()
    }

    #[test]
    fn test_verify_query_deserialization() {
        let json = r#"{"hub.mode":"subscribe","hub.verify_token":"test123","hub.challenge":"challenge123"}"#;
        let query: VerifyQuery = serde_json::from_str(json).unwrap();
        assert_eq!(query.mode.as_deref(), Some("subscribe"));
        assert_eq!(query.verify_token.as_deref(), Some("test123"));
        assert_eq!(query.challenge.as_deref(), Some("challenge123"));
    }

    #[ntex::test]
    async fn test_verify_handshake() {
        let app = test::init_service(
            web::App::new()
                .state(app_state(MockMessageSender::new()))
                .configure(webhook_routes::messenger),
        )
        .await;

        let req = TestRequest::get()
            .uri("/webhook?hub.mode=subscribe&hub.verify_token=test_validation_token&hub.challenge=1234")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(test::read_body(resp).await, Bytes::from_static(b"1234"));

        for uri in [
            "/webhook?hub.mode=subscribe&hub.verify_token=wrong&hub.challenge=1234",
            "/webhook?hub.mode=unsubscribe&hub.verify_token=test_validation_token&hub.challenge=1234",
            "/webhook",
        ] {
            let resp = test::call_service(&app, TestRequest::get().uri(uri).to_request()).await;
            assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{uri}");
        }
    }

    #[ntex::test]
    async fn test_receive_signed_batch() {
        let mut mock_sender = MockMessageSender::new();
        mock_sender
            .expect_send()
            .times(2)
            .returning(|message| {
                Ok(SendReceipt {
                    recipient_id: message.recipient_id().to_string(),
                    message_id: None,
                })
            });
        let app = test::init_service(
            web::App::new()
                .state(app_state(mock_sender))
                .configure(webhook_routes::messenger),
        )
        .await;

        let body = batch_body(&["hello", "image"]);
        let req = TestRequest::post()
            .uri("/webhook")
            .header(consts::SIGNATURE_HEADER, signed(&body))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(test::read_body(resp).await.is_empty());
    }

    #[ntex::test]
    async fn test_receive_isolates_send_failure() {
        let mut mock_sender = MockMessageSender::new();
        let mut seq = Sequence::new();
        for i in 0..5 {
            mock_sender
                .expect_send()
                .withf(move |message| message.recipient_id() == format!("USER_{i}"))
                .times(1)
                .in_sequence(&mut seq)
                .returning(move |message| {
                    if i == 2 {
                        return Err(SendError::Transport("connection reset".into()));
                    }
                    Ok(SendReceipt {
                        recipient_id: message.recipient_id().to_string(),
                        message_id: Some(format!("mid.out.{i}")),
                    })
                });
        }
        let app = test::init_service(
            web::App::new()
                .state(app_state(mock_sender))
                .configure(webhook_routes::messenger),
        )
        .await;

        let body = batch_body(&["one", "two", "three", "four", "five"]);
        let req = TestRequest::post()
            .uri("/webhook")
            .header(consts::SIGNATURE_HEADER, signed(&body))
            .set_payload(body)
            .to_request();

        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    #[ntex::test]
    async fn test_receive_rejects_bad_signatures() {
        let mut mock_sender = MockMessageSender::new();
        mock_sender.expect_send().never();
        let app = test::init_service(
            web::App::new()
                .state(app_state(mock_sender))
                .configure(webhook_routes::messenger),
        )
        .await;

        let body = batch_body(&["hello"]);
        let cases = [
            (Some("sha1=0000000000000000000000000000000000000000".to_string()), StatusCode::BAD_REQUEST),
            (Some(signed(&body).replacen("sha1", "md5", 1)), StatusCode::BAD_REQUEST),
            (None, StatusCode::UNAUTHORIZED),
        ];

        for (signature, status) in cases {
            let mut req = TestRequest::post().uri("/webhook");
            if let Some(signature) = signature {
                req = req.header(consts::SIGNATURE_HEADER, signature);
            }
            let resp = test::call_service(&app, req.set_payload(body.clone()).to_request()).await;
            assert_eq!(resp.status(), status);
        }
    }

    #[ntex::test]
    async fn test_receive_accepts_unsigned_when_allowed() {
        let mut mock_sender = MockMessageSender::new();
        mock_sender.expect_send().times(1).returning(|message| {
            Ok(SendReceipt {
                recipient_id: message.recipient_id().to_string(),
                message_id: None,
            })
        });
        let mut state = app_state(mock_sender);
        state.config.reject_unsigned = false;
        let app = test::init_service(
            web::App::new()
                .state(state)
                .configure(webhook_routes::messenger),
        )
        .await;

        let req = TestRequest::post()
            .uri("/webhook")
            .set_payload(batch_body(&["hello"]))
            .to_request();

        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    #[ntex::test]
    async fn test_receive_malformed_payload() {
        let mut mock_sender = MockMessageSender::new();
        mock_sender.expect_send().never();
        let app = test::init_service(
            web::App::new()
                .state(app_state(mock_sender))
                .configure(webhook_routes::messenger),
        )
        .await;

        for body in [&b"{\"object\": \"page\""[..], &b"{\"object\": \"page\"}"[..]] {
            let req = TestRequest::post()
                .uri("/webhook")
                .header(consts::SIGNATURE_HEADER, signed(body))
                .set_payload(body.to_vec())
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[ntex::test]
    async fn test_receive_accepts_large_batch() {
        let mut mock_sender = MockMessageSender::new();
        mock_sender.expect_send().never();
        let app = test::init_service(
            web::App::new()
                .state(app_state(mock_sender))
                .configure(webhook_routes::messenger),
        )
        .await;

        let attachments: Vec<_> = (0..3000)
            .map(|i| json!({"type": "fallback", "payload": {"url": format!("https://example.com/{i:0>100}")}}))
            .collect();
        let body = serde_json::to_vec(&json!({
            "object": "page",
            "entry": [{
                "id": "PAGE_ID",
                "time": 1458692752478_i64,
                "messaging": [{
                    "sender": {"id": "PAGE_ID"},
                    "recipient": {"id": "USER_ID"},
                    "timestamp": 1458692752478_i64,
                    "message": {"mid": "mid.echo", "is_echo": true, "attachments": attachments}
                }]
            }]
        }))
        .unwrap();
        assert!(body.len() > 256 * 1024);

        let req = TestRequest::post()
            .uri("/webhook")
            .header(consts::SIGNATURE_HEADER, signed(&body))
            .set_payload(body)
            .to_request();

        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    #[ntex::test]
    async fn test_receive_ignores_non_page_objects() {
        let mut mock_sender = MockMessageSender::new();
        mock_sender.expect_send().never();
        let app = test::init_service(
            web::App::new()
                .state(app_state(mock_sender))
                .configure(webhook_routes::messenger),
        )
        .await;

        let body = br#"{"object":"user","entry":[{"id":"1","time":1,"changes":[]}]}"#;
        let req = TestRequest::post()
            .uri("/webhook")
            .header(consts::SIGNATURE_HEADER, signed(body))
            .set_payload(body.to_vec())
            .to_request();

        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    #[ntex::test]
    async fn test_authorize_redirects_with_code() {
        let app = test::init_service(
            web::App::new()
                .state(app_state(MockMessageSender::new()))
                .configure(webhook_routes::messenger),
        )
        .await;

        let req = TestRequest::get()
            .uri("/authorize?account_linking_token=ALT&redirect_uri=https%3A%2F%2Fexample.com%2Flink%3Fstate%3D1")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(
            resp.headers().get("location").unwrap(),
            "https://example.com/link?state=1&authorization_code=1234567890"
        );

        let req = TestRequest::get()
            .uri("/authorize?redirect_uri=https%3A%2F%2Fexample.com%2Flink")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(
            resp.headers().get("location").unwrap(),
            "https://example.com/link?authorization_code=1234567890"
        );

        let resp =
            test::call_service(&app, TestRequest::get().uri("/authorize").to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
