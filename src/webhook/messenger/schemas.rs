//! # Messenger Webhook Schemas
//!
//! Data structures for the callbacks the platform POSTs to `/webhook`.
//!
//! The feed is loosely typed: a messaging event carries one of several kind
//! markers (`optin`, `message`, `delivery`, `postback`, `read`,
//! `account_linking`) and new kinds may appear at any time. Each messaging
//! element is therefore read as a raw JSON object and classified once into
//! the closed [`EventPayload`] union; elements without a known marker become
//! [`EventPayload::Unknown`] instead of failing the whole batch.

use derive_more::{Display, Error};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::Value;

/// Failure to decode a webhook body
#[derive(Debug, Display, Error)]
#[display("malformed webhook payload: {_0}")]
pub struct MalformedPayload(#[error(not(source))] pub String);

/// Root webhook payload
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct WebhookEnvelope {
    /// The object type, "page" for Messenger subscriptions
    pub object: String,
    /// Page entries, several when the platform batches deliveries
    #[serde(rename = "entry")]
    pub entries: Vec<PageEntry>,
}

impl WebhookEnvelope {
    /// Decodes a raw request body
    pub fn parse(raw_body: &[u8]) -> Result<Self, MalformedPayload> {
        serde_json::from_slice(raw_body).map_err(|e| MalformedPayload(e.to_string()))
    }

    /// Only page subscriptions carry messaging events
    pub fn is_page_subscription(&self) -> bool {
        self.object == crate::consts::PAGE_OBJECT
    }

    /// Number of messaging events over all entries
    pub fn event_count(&self) -> usize {
        self.entries.iter().map(|entry| entry.messaging.len()).sum()
    }
}

/// Batch of messaging events for one page
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PageEntry {
    /// Page ID
    #[serde(rename = "id", default, deserialize_with = "deserialize_id")]
    pub page_id: String,
    /// Time of the update, epoch milliseconds, 0 when unreadable
    #[serde(default, deserialize_with = "deserialize_millis")]
    pub time: i64,
    /// Messaging events in arrival order
    #[serde(default, deserialize_with = "deserialize_messaging")]
    pub messaging: Vec<MessagingEvent>,
}

/// Kind of a messaging event, decided by the first marker found
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    #[display("authentication")]
    Authentication,
    #[display("message")]
    Message,
    #[display("delivery_confirmation")]
    DeliveryConfirmation,
    #[display("postback")]
    Postback,
    #[display("read_confirmation")]
    ReadConfirmation,
    #[display("account_link")]
    AccountLink,
    #[display("unknown")]
    Unknown,
}

/// Marker keys in classification order. First match wins.
pub const KIND_MARKERS: [(&str, EventKind); 6] = [
    ("optin", EventKind::Authentication),
    ("message", EventKind::Message),
    ("delivery", EventKind::DeliveryConfirmation),
    ("postback", EventKind::Postback),
    ("read", EventKind::ReadConfirmation),
    ("account_linking", EventKind::AccountLink),
];

/// One unit of activity between a user and the page
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(from = "Value")]
pub struct MessagingEvent {
    /// User (or page, for echoes) that originated the event
    pub sender_id: String,
    /// Receiving side of the event
    pub recipient_id: String,
    /// Epoch milliseconds
    pub timestamp: i64,
    /// Kind specific data
    pub payload: EventPayload,
}

impl MessagingEvent {
    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }
}

impl From<Value> for MessagingEvent {
    fn from(raw: Value) -> Self {
        let sender_id = raw.pointer("/sender/id").and_then(id_to_string);
        let recipient_id = raw.pointer("/recipient/id").and_then(id_to_string);
        let timestamp = raw.get("timestamp").and_then(millis_from_value);

        Self {
            sender_id: sender_id.unwrap_or_default(),
            recipient_id: recipient_id.unwrap_or_default(),
            timestamp: timestamp.unwrap_or_default(),
            payload: EventPayload::classify(raw),
        }
    }
}

/// Kind specific data of a messaging event
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Authentication(Optin),
    Message(IncomingMessage),
    DeliveryConfirmation(Delivery),
    Postback(Postback),
    ReadConfirmation(Read),
    AccountLink(AccountLinking),
    /// No known marker, the raw event is kept for logging
    Unknown(Value),
}

impl EventPayload {
    /// Picks the payload variant from the first present marker.
    ///
    /// A marker is present when its key exists with a non-null value. A
    /// marker whose value has an unexpected shape still decides the kind,
    /// its fields fall back to their defaults.
    pub fn classify(mut raw: Value) -> Self {
        let marker = KIND_MARKERS
            .iter()
            .find(|(key, _)| raw.get(key).is_some_and(|value| !value.is_null()));

        let Some((key, kind)) = marker else {
            return EventPayload::Unknown(raw);
        };

        let value = raw
            .as_object_mut()
            .and_then(|object| object.remove(*key))
            .unwrap_or_default();

        match kind {
            EventKind::Authentication => EventPayload::Authentication(lenient(key, value)),
            EventKind::Message => EventPayload::Message(lenient(key, value)),
            EventKind::DeliveryConfirmation => {
                EventPayload::DeliveryConfirmation(lenient(key, value))
            }
            EventKind::Postback => EventPayload::Postback(lenient(key, value)),
            EventKind::ReadConfirmation => EventPayload::ReadConfirmation(lenient(key, value)),
            EventKind::AccountLink => EventPayload::AccountLink(lenient(key, value)),
            EventKind::Unknown => EventPayload::Unknown(raw),
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::Authentication(_) => EventKind::Authentication,
            EventPayload::Message(_) => EventKind::Message,
            EventPayload::DeliveryConfirmation(_) => EventKind::DeliveryConfirmation,
            EventPayload::Postback(_) => EventKind::Postback,
            EventPayload::ReadConfirmation(_) => EventKind::ReadConfirmation,
            EventPayload::AccountLink(_) => EventKind::AccountLink,
            EventPayload::Unknown(_) => EventKind::Unknown,
        }
    }
}

fn lenient<T: DeserializeOwned + Default>(key: &str, value: Value) -> T {
    serde_json::from_value(value).unwrap_or_else(|e| {
        logfire::warn!(
            "Unexpected shape for {key} marker: {error}",
            key = key.to_string(),
            error = e.to_string()
        );
        T::default()
    })
}

/// Ids arrive as strings, older fixtures send them as numbers
fn id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// Integer millis, also accepted as a numeric string or a float
fn millis_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(millis) => millis
            .as_i64()
            .or_else(|| millis.as_f64().map(|millis| millis as i64)),
        Value::String(millis) => millis.trim().parse().ok(),
        _ => None,
    }
}

fn deserialize_millis<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(millis_from_value(&value).unwrap_or_default())
}

fn deserialize_messaging<'de, D>(deserializer: D) -> Result<Vec<MessagingEvent>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<MessagingEvent>>::deserialize(deserializer)?.unwrap_or_default())
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(id_to_string(&value).unwrap_or_default())
}

/// Authentication callback from the "Send to Messenger" plugin
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Optin {
    /// Pass-through param set in the plugin `data-ref`
    #[serde(rename = "ref")]
    pub reference: Option<String>,
}

/// Message sent to the page
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct IncomingMessage {
    /// Message ID
    pub mid: Option<String>,
    /// Sequence number
    pub seq: Option<i64>,
    /// Text content, never sent together with attachments
    pub text: Option<String>,
    /// Media or fallback attachments
    pub attachments: Option<Vec<Value>>,
    /// Quick reply tapped by the user
    pub quick_reply: Option<QuickReplyPayload>,
    /// Set when the page itself sent the message
    pub is_echo: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct QuickReplyPayload {
    pub payload: Option<String>,
}

/// Delivery confirmation
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Delivery {
    /// Delivered message IDs, may be missing
    pub mids: Option<Vec<String>>,
    /// Every message before this timestamp was delivered
    pub watermark: i64,
    pub seq: Option<i64>,
}

/// Postback button tapped on a structured message
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Postback {
    /// Developer defined payload
    pub payload: Option<String>,
    pub title: Option<String>,
}

/// Read confirmation
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Read {
    /// Every message before this timestamp was read
    pub watermark: i64,
    pub seq: Option<i64>,
}

/// Link or unlink account action
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AccountLinking {
    /// "linked" or "unlinked"
    pub status: Option<String>,
    pub authorization_code: Option<String>,
}
