use crate::{consts, errors::WebhookError};
use ntex::web;

/// Configures the Messenger routes.
///
/// These routes are public endpoints, callbacks are authenticated by their
/// signature only.
///
/// # Routes
/// - `GET /webhook` - subscription handshake
/// - `POST /webhook` - event callbacks
/// - `GET /authorize` - account linking redirect
pub fn messenger(cfg: &mut web::ServiceConfig) {
    cfg.state(web::types::PayloadConfig::new(consts::MAX_WEBHOOK_PAYLOAD_BYTES))
        .service((
            super::messenger::routes::verify,
            super::messenger::routes::receive,
            super::messenger::routes::authorize,
        ));
}

/// Fallback for every unknown route
pub async fn serve_not_found() -> Result<web::HttpResponse, web::Error> {
    Err(WebhookError::UrlNotFound.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config,
        services::{ImplMessageSender, MockMessageSender},
        webhook::AppState,
    };
    use ntex::{
        http::StatusCode,
        web::test::{self, TestRequest},
    };

    #[ntex::test]
    async fn test_unknown_route_is_not_found() {
        let app = test::init_service(
            web::App::new()
                .state(AppState {
                    config: config::test_config(),
                    sender: Box::new(MockMessageSender::new()) as ImplMessageSender,
                })
                .configure(messenger)
                .default_service(web::route().to(serve_not_found)),
        )
        .await;

        for req in [
            TestRequest::get().uri("/nothing-here").to_request(),
            TestRequest::post().uri("/webhook/extra").to_request(),
        ] {
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        }
    }
}
