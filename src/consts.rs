pub const SIGNATURE_HEADER: &str = "x-hub-signature";
pub const SIGNATURE_METHOD: &str = "sha1";
pub const SUBSCRIBE_MODE: &str = "subscribe";
pub const PAGE_OBJECT: &str = "page";
/// Largest webhook body accepted, batched deliveries can exceed the 256 KiB default
pub const MAX_WEBHOOK_PAYLOAD_BYTES: usize = 4 * 1024 * 1024;

pub const AUTHENTICATION_REPLY: &str = "Authentication successful";
pub const POSTBACK_REPLY: &str = "Postback called";
pub const ATTACHMENT_REPLY: &str = "Message with attachment received";

/// Authorization code handed back to the platform at the end of account linking
pub const ACCOUNT_LINKING_AUTH_CODE: &str = "1234567890";
