//! # Messenger Send API Client
//!
//! Sends text, attachment, template messages and sender actions through
//! `POST /me/messages`. Authentication is the page access token passed as
//! query parameter.

use super::outgoing_schemas::{OutboundMessage, SendApiResponse};
use crate::{
    config::AppConfig,
    services::{MessageSender, SendError, SendReceipt},
};
use async_trait::async_trait;
use std::time::Duration;

/// Send API client
#[derive(Clone)]
pub struct GraphApiClient {
    /// HTTP client for making API requests
    client: reqwest::Client,
    /// Send API endpoint
    endpoint: String,
    /// 🔒 SENSITIVE: page access token
    access_token: String,
}

impl GraphApiClient {
    /// Creates a new client from the loaded configuration
    pub fn new(app_config: &AppConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(app_config.send_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: app_config.send_api_endpoint(),
            access_token: app_config.page_access_token.clone(),
        })
    }
}

#[async_trait]
impl MessageSender for GraphApiClient {
    async fn send(&self, message: &OutboundMessage) -> Result<SendReceipt, SendError> {
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("access_token", &self.access_token)])
            .json(message)
            .send()
            .await
            .map_err(|e| SendError::Transport(e.without_url().to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());

            return Err(SendError::Rejected { status, body });
        }

        let send_response: SendApiResponse = response
            .json()
            .await
            .map_err(|e| SendError::Transport(e.without_url().to_string()))?;

        logfire::info!(
            "Successfully sent message with id {message_id} to recipient {recipient}",
            message_id = send_response.message_id.clone().unwrap_or_default(),
            recipient = send_response.recipient_id.clone()
        );

        Ok(SendReceipt {
            recipient_id: send_response.recipient_id,
            message_id: send_response.message_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, method, path, query_param},
    };

    fn client_for(server: &MockServer) -> GraphApiClient {
        let mut app_config = config::test_config();
        app_config.graph_api_url = server.uri();
        GraphApiClient::new(&app_config).unwrap()
    }

    #[ntex::test]
    async fn test_send_text_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/me/messages"))
            .and(query_param("access_token", "test_page_token"))
            .and(body_json(json!({
                "recipient": {"id": "USER_ID"},
                "message": {"text": "hello"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "recipient_id": "USER_ID",
                "message_id": "mid.1456970487936:c34767dfe57ee6e339"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let receipt = client_for(&server)
            .send(&OutboundMessage::text("USER_ID", "hello"))
            .await
            .unwrap();

        assert_eq!(receipt.recipient_id, "USER_ID");
        assert_eq!(
            receipt.message_id.as_deref(),
            Some("mid.1456970487936:c34767dfe57ee6e339")
        );
    }

    #[ntex::test]
    async fn test_send_sender_action() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/me/messages"))
            .and(body_json(json!({
                "recipient": {"id": "USER_ID"},
                "sender_action": "typing_on"
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"recipient_id": "USER_ID"})),
            )
            .mount(&server)
            .await;

        let receipt = client_for(&server)
            .send(&OutboundMessage::sender_action(
                "USER_ID",
                super::super::outgoing_schemas::SenderAction::TypingOn,
            ))
            .await
            .unwrap();

        assert_eq!(receipt.message_id, None);
    }

    #[ntex::test]
    async fn test_send_rejected() {
        let server = MockServer::start().await;
        let error_body = json!({
            "error": {"message": "Invalid OAuth access token.", "type": "OAuthException", "code": 190}
        });
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(error_body.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .send(&OutboundMessage::text("USER_ID", "hello"))
            .await
            .unwrap_err();

        let SendError::Rejected { status, body } = err else {
            panic!("expected a rejected send, got {err:?}");
        };
        assert_eq!(status, 400);
        assert!(body.contains("OAuthException"));
    }

    #[ntex::test]
    async fn test_send_transport_error() {
        let mut app_config = config::test_config();
        app_config.graph_api_url = "http://127.0.0.1:9".into();
        let client = GraphApiClient::new(&app_config).unwrap();

        let err = client
            .send(&OutboundMessage::text("USER_ID", "hello"))
            .await
            .unwrap_err();

        assert!(matches!(err, SendError::Transport(_)));
        assert!(!err.to_string().contains("test_page_token"));
    }
}
