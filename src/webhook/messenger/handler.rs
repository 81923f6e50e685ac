//! # Messenger Webhook Handler
//!
//! Routes every messaging event of a batch to the handler of its kind. Each
//! handler sends at most one message back through the [`MessageSender`].
//!
//! Events of one page entry are handled one after the other, in the order the
//! platform delivered them. Separate page entries are unrelated and run
//! concurrently. A failing send only affects its own event.
//!
//! [`MessageSender`]: crate::services::MessageSender

use super::{
    outgoing_schemas::OutboundMessage,
    schemas::{
        AccountLinking, Delivery, EventPayload, IncomingMessage, MessagingEvent, Optin, PageEntry,
        Postback, Read, WebhookEnvelope,
    },
    templates::CannedTemplate,
};
use crate::{
    consts, metric,
    services::{ImplMessageSender, SendError},
};
use chrono::DateTime;

/// Result of handling one messaging event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// An outbound call was accepted by the platform
    pub sent: bool,
    /// The outbound call failed
    pub error: Option<SendError>,
}

impl DispatchOutcome {
    /// Nothing had to be sent
    pub fn skipped() -> Self {
        Self::default()
    }
}

/// Reply chosen for a message event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageReply {
    Canned(CannedTemplate),
    Echo(String),
    AttachmentReceived,
}

/// Picks the reply for an incoming message
///
/// Text equal to a keyword selects the canned template, any other text is
/// echoed back. Attachments without text get a fixed acknowledgment.
/// Returns `None` when there is nothing to answer.
pub fn select_message_reply(message: &IncomingMessage) -> Option<MessageReply> {
    if let Some(text) = &message.text {
        return Some(match CannedTemplate::from_keyword(text) {
            Some(template) => MessageReply::Canned(template),
            None => MessageReply::Echo(text.clone()),
        });
    }

    message
        .attachments
        .as_ref()
        .map(|_| MessageReply::AttachmentReceived)
}

fn format_timestamp(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|time| time.to_rfc3339())
        .unwrap_or_else(|| millis.to_string())
}

async fn send(sender: &ImplMessageSender, message: OutboundMessage) -> DispatchOutcome {
    match sender.send(&message).await {
        Ok(_) => {
            metric::incr_send_status_statds("sent");
            DispatchOutcome {
                sent: true,
                error: None,
            }
        }
        Err(e) => {
            metric::incr_send_status_statds("failed");
            logfire::error!(
                "Unable to send message to {recipient}: {error}",
                recipient = message.recipient_id().to_string(),
                error = e.to_string()
            );
            DispatchOutcome {
                sent: false,
                error: Some(e),
            }
        }
    }
}

/// Authentication from the "Send to Messenger" plugin
///
/// `optin.ref` carries the plugin `data-ref`, an arbitrary value that ties
/// the callback to the click.
async fn handle_authentication(
    event: &MessagingEvent,
    optin: &Optin,
    sender: &ImplMessageSender,
) -> DispatchOutcome {
    logfire::info!(
        "Received authentication for user {sender_id} and page {recipient_id} with pass through param '{pass_through}' at {time}",
        sender_id = event.sender_id.clone(),
        recipient_id = event.recipient_id.clone(),
        pass_through = optin.reference.clone().unwrap_or_default(),
        time = format_timestamp(event.timestamp)
    );

    send(
        sender,
        OutboundMessage::text(&event.sender_id, consts::AUTHENTICATION_REPLY),
    )
    .await
}

/// Message sent to the page
async fn handle_message(
    event: &MessagingEvent,
    message: &IncomingMessage,
    sender: &ImplMessageSender,
    base_url: &str,
) -> DispatchOutcome {
    logfire::info!(
        "Received message {mid} for user {sender_id} and page {recipient_id} at {time}",
        mid = message.mid.clone().unwrap_or_default(),
        sender_id = event.sender_id.clone(),
        recipient_id = event.recipient_id.clone(),
        time = format_timestamp(event.timestamp)
    );

    if message.is_echo {
        logfire::info!(
            "Skipping echo of message {mid}",
            mid = message.mid.clone().unwrap_or_default()
        );
        return DispatchOutcome::skipped();
    }

    let Some(reply) = select_message_reply(message) else {
        logfire::warn!(
            "Message {mid} has neither text nor attachments",
            mid = message.mid.clone().unwrap_or_default()
        );
        return DispatchOutcome::skipped();
    };

    let outbound = match reply {
        MessageReply::Canned(template) => template.build(&event.sender_id, base_url),
        MessageReply::Echo(text) => OutboundMessage::text(&event.sender_id, text),
        MessageReply::AttachmentReceived => {
            OutboundMessage::text(&event.sender_id, consts::ATTACHMENT_REPLY)
        }
    };

    send(sender, outbound).await
}

fn handle_delivery_confirmation(event: &MessagingEvent, delivery: &Delivery) -> DispatchOutcome {
    let seq = delivery.seq.unwrap_or_default();
    for mid in delivery.mids.iter().flatten() {
        logfire::info!(
            "Received delivery confirmation for message ID: {mid} ({seq}) from {sender_id} to {recipient_id}",
            mid = mid.clone(),
            seq = seq,
            sender_id = event.sender_id.clone(),
            recipient_id = event.recipient_id.clone()
        );
    }

    logfire::info!(
        "All messages before {watermark} were delivered.",
        watermark = format_timestamp(delivery.watermark)
    );

    DispatchOutcome::skipped()
}

/// Postback button tapped on a structured message
async fn handle_postback(
    event: &MessagingEvent,
    postback: &Postback,
    sender: &ImplMessageSender,
) -> DispatchOutcome {
    logfire::info!(
        "Received postback for user {sender_id} and page {recipient_id} with payload '{payload}' at {time}",
        sender_id = event.sender_id.clone(),
        recipient_id = event.recipient_id.clone(),
        payload = postback.payload.clone().unwrap_or_default(),
        time = format_timestamp(event.timestamp)
    );

    send(
        sender,
        OutboundMessage::text(&event.sender_id, consts::POSTBACK_REPLY),
    )
    .await
}

fn handle_read_confirmation(read: &Read) -> DispatchOutcome {
    logfire::info!(
        "Received message read event for watermark {watermark} and sequence number {seq}",
        watermark = format_timestamp(read.watermark),
        seq = read.seq.unwrap_or_default()
    );

    DispatchOutcome::skipped()
}

fn handle_account_link(event: &MessagingEvent, account_linking: &AccountLinking) -> DispatchOutcome {
    logfire::info!(
        "Received account link event for user {sender_id} with status {status} and auth code {auth_code}",
        sender_id = event.sender_id.clone(),
        status = account_linking.status.clone().unwrap_or_default(),
        auth_code = account_linking.authorization_code.clone().unwrap_or_default()
    );

    DispatchOutcome::skipped()
}

/// Handles one messaging event with the handler of its kind
pub async fn dispatch(
    event: &MessagingEvent,
    sender: &ImplMessageSender,
    base_url: &str,
) -> DispatchOutcome {
    metric::incr_event_kind_statds(&event.kind().to_string());

    match &event.payload {
        EventPayload::Authentication(optin) => handle_authentication(event, optin, sender).await,
        EventPayload::Message(message) => handle_message(event, message, sender, base_url).await,
        EventPayload::DeliveryConfirmation(delivery) => {
            handle_delivery_confirmation(event, delivery)
        }
        EventPayload::Postback(postback) => handle_postback(event, postback, sender).await,
        EventPayload::ReadConfirmation(read) => handle_read_confirmation(read),
        EventPayload::AccountLink(account_linking) => {
            handle_account_link(event, account_linking)
        }
        EventPayload::Unknown(raw) => {
            logfire::warn!(
                "Webhook received unknown messaging event: {event}",
                event = raw.to_string()
            );
            DispatchOutcome::skipped()
        }
    }
}

/// Handles the events of one page entry in arrival order
pub async fn process_page_entry(
    entry: &PageEntry,
    sender: &ImplMessageSender,
    base_url: &str,
) -> Vec<DispatchOutcome> {
    logfire::info!(
        "Processing {count} events for page {page_id} at {time}",
        count = entry.messaging.len() as i64,
        page_id = entry.page_id.clone(),
        time = format_timestamp(entry.time)
    );

    let mut outcomes = Vec::with_capacity(entry.messaging.len());
    for event in &entry.messaging {
        outcomes.push(dispatch(event, sender, base_url).await);
    }

    outcomes
}

/// Main webhook processor
///
/// Returns the outcome of every event, page entries in envelope order and
/// events in arrival order. Envelopes for other objects than pages are
/// ignored.
pub async fn process_webhook(
    envelope: &WebhookEnvelope,
    sender: &ImplMessageSender,
    base_url: &str,
) -> Vec<DispatchOutcome> {
    if !envelope.is_page_subscription() {
        logfire::info!(
            "Ignoring webhook for object {object}",
            object = envelope.object.clone()
        );
        return Vec::new();
    }

    let pages = envelope
        .entries
        .iter()
        .map(|entry| process_page_entry(entry, sender, base_url));

    futures::future::join_all(pages)
        .await
        .into_iter()
        .flatten()
        .collect()
}
