//! Messenger platform integration
//!
//! - [`routes`]: HTTP endpoints (handshake, callbacks, account linking)
//! - [`security`]: `x-hub-signature` verification
//! - [`schemas`]: inbound callback payloads
//! - [`handler`]: per-event dispatch
//! - [`templates`]: canned demo replies
//! - [`outgoing_schemas`]: send API payloads
//! - [`client`]: send API client

pub mod client;
pub mod handler;
pub mod outgoing_schemas;
pub mod routes;
pub mod schemas;
pub mod security;
pub mod templates;
