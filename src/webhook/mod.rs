//! Webhook handlers for the Messenger platform
//!
//! ## Modules
//!
//! - [`messenger`] - Messenger callback handlers and send API client
//! - [`routes`] - route registration

pub mod messenger;
pub mod routes;

use crate::{config::AppConfig, services::ImplMessageSender};

/// State shared by every request handler
pub struct AppState {
    pub config: AppConfig,
    pub sender: ImplMessageSender,
}
