use crate::webhook::messenger::{schemas::MalformedPayload, security::SignatureError};
use derive_more::{Display, Error};
use ntex::{http, web};

/// Errors that end an inbound request early
#[derive(Debug, Display, Error)]
pub enum WebhookError {
    /// Subscription handshake with a wrong mode or token
    #[display("webhook verification failed")]
    VerificationFailed,
    /// Callback without signature while unsigned callbacks are refused
    #[display("missing x-hub-signature header")]
    Unsigned,
    Signature(SignatureError),
    Malformed(MalformedPayload),
    #[display("missing redirect_uri")]
    MissingRedirectUri,
    #[display("not found")]
    UrlNotFound,
}

impl web::error::WebResponseError for WebhookError {
    fn error_response(&self, _: &web::HttpRequest) -> web::HttpResponse {
        match self {
            WebhookError::UrlNotFound => {}
            _ => logfire::error!("{error}", error = self.to_string()),
        }

        web::HttpResponse::build(self.status_code())
            .set_header("content-type", "text/plain; charset=utf-8")
            .body(self.to_string())
    }

    fn status_code(&self) -> http::StatusCode {
        match *self {
            WebhookError::VerificationFailed => http::StatusCode::FORBIDDEN,
            WebhookError::Unsigned => http::StatusCode::UNAUTHORIZED,
            WebhookError::Signature(_)
            | WebhookError::Malformed(_)
            | WebhookError::MissingRedirectUri => http::StatusCode::BAD_REQUEST,
            WebhookError::UrlNotFound => http::StatusCode::NOT_FOUND,
        }
    }
}
