//! Canned replies selected by keyword
//!
//! Sending one of the keywords below to the page answers with a sample of the
//! matching send API feature. Matching is exact and case-sensitive.

use super::outgoing_schemas::{
    Address, Adjustment, Attachment, Button, GenericElement, MediaPayload, MessageContent,
    OutboundMessage, QuickReply, ReceiptElement, ReceiptTemplate, SenderAction, Summary, Template,
};
use derive_more::Display;

const RIFT_URL: &str = "https://www.oculus.com/en-us/rift/";
const TOUCH_URL: &str = "https://www.oculus.com/en-us/touch/";

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum CannedTemplate {
    #[display("image")]
    Image,
    #[display("gif")]
    Gif,
    #[display("audio")]
    Audio,
    #[display("video")]
    Video,
    #[display("file")]
    File,
    #[display("button")]
    Button,
    #[display("generic")]
    Generic,
    #[display("receipt")]
    Receipt,
    #[display("quick reply")]
    QuickReply,
    #[display("read receipt")]
    ReadReceipt,
    #[display("typing on")]
    TypingOn,
    #[display("typing off")]
    TypingOff,
    #[display("account linking")]
    AccountLinking,
}

impl CannedTemplate {
    pub const ALL: [CannedTemplate; 13] = [
        CannedTemplate::Image,
        CannedTemplate::Gif,
        CannedTemplate::Audio,
        CannedTemplate::Video,
        CannedTemplate::File,
        CannedTemplate::Button,
        CannedTemplate::Generic,
        CannedTemplate::Receipt,
        CannedTemplate::QuickReply,
        CannedTemplate::ReadReceipt,
        CannedTemplate::TypingOn,
        CannedTemplate::TypingOff,
        CannedTemplate::AccountLinking,
    ];

    /// Looks up the keyword table, `None` means the text should be echoed
    pub fn from_keyword(text: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|template| template.to_string() == text)
    }

    /// Builds the reply for `recipient_id`. Asset links hang off `base_url`.
    pub fn build(self, recipient_id: &str, base_url: &str) -> OutboundMessage {
        let asset = |file_name: &str| format!("{base_url}/assets/{file_name}");
        let media = |url: String| MediaPayload { url };

        match self {
            CannedTemplate::Image => {
                attachment(recipient_id, Attachment::Image(media(asset("rift.png"))))
            }
            CannedTemplate::Gif => attachment(
                recipient_id,
                Attachment::Image(media(asset("instagram_logo.gif"))),
            ),
            CannedTemplate::Audio => {
                attachment(recipient_id, Attachment::Audio(media(asset("sample.mp3"))))
            }
            CannedTemplate::Video => attachment(
                recipient_id,
                Attachment::Video(media(asset("allofus480.mov"))),
            ),
            CannedTemplate::File => {
                attachment(recipient_id, Attachment::File(media(asset("test.txt"))))
            }
            CannedTemplate::Button => template(recipient_id, button_template()),
            CannedTemplate::Generic => template(recipient_id, generic_template(&asset)),
            CannedTemplate::Receipt => template(recipient_id, receipt_template(&asset)),
            CannedTemplate::QuickReply => OutboundMessage::message(
                recipient_id,
                MessageContent::Text {
                    text: "What's your favorite movie genre?".into(),
                    metadata: Some("DEVELOPER_DEFINED_METADATA".into()),
                    quick_replies: vec![
                        QuickReply::text("Action", "DEVELOPER_DEFINED_PAYLOAD_FOR_PICKING_ACTION"),
                        QuickReply::text("Comedy", "DEVELOPER_DEFINED_PAYLOAD_FOR_PICKING_COMEDY"),
                        QuickReply::text("Drama", "DEVELOPER_DEFINED_PAYLOAD_FOR_PICKING_DRAMA"),
                    ],
                },
            ),
            CannedTemplate::ReadReceipt => {
                OutboundMessage::sender_action(recipient_id, SenderAction::MarkSeen)
            }
            CannedTemplate::TypingOn => {
                OutboundMessage::sender_action(recipient_id, SenderAction::TypingOn)
            }
            CannedTemplate::TypingOff => {
                OutboundMessage::sender_action(recipient_id, SenderAction::TypingOff)
            }
            CannedTemplate::AccountLinking => template(
                recipient_id,
                Template::Button {
                    text: "Welcome. Link your account.".into(),
                    buttons: vec![Button::AccountLink {
                        url: format!("{base_url}/authorize"),
                    }],
                },
            ),
        }
    }
}

fn attachment(recipient_id: &str, attachment: Attachment) -> OutboundMessage {
    OutboundMessage::message(recipient_id, MessageContent::attachment(attachment))
}

fn template(recipient_id: &str, template: Template) -> OutboundMessage {
    attachment(recipient_id, Attachment::Template(template))
}

fn button_template() -> Template {
    Template::Button {
        text: "This is test text".into(),
        buttons: vec![
            Button::WebUrl {
                url: RIFT_URL.into(),
                title: "Open Web URL".into(),
            },
            Button::Postback {
                title: "Trigger Postback".into(),
                payload: "DEVELOPED_DEFINED_PAYLOAD".into(),
            },
            Button::PhoneNumber {
                title: "Call Phone Number".into(),
                payload: "+16505551234".into(),
            },
        ],
    }
}

fn generic_template(asset: &dyn Fn(&str) -> String) -> Template {
    let card = |title: &str, subtitle: &str, url: &str, image: &str, payload: &str| {
        GenericElement {
            title: title.into(),
            subtitle: subtitle.into(),
            item_url: url.into(),
            image_url: asset(image),
            buttons: vec![
                Button::WebUrl {
                    url: url.into(),
                    title: "Open Web URL".into(),
                },
                Button::Postback {
                    title: "Call Postback".into(),
                    payload: payload.into(),
                },
            ],
        }
    };

    Template::Generic {
        elements: vec![
            card(
                "rift",
                "Next-generation virtual reality",
                RIFT_URL,
                "rift.png",
                "Payload for first bubble",
            ),
            card(
                "touch",
                "Your Hands, Now in VR",
                TOUCH_URL,
                "touch.png",
                "Payload for second bubble",
            ),
        ],
    }
}

fn receipt_template(asset: &dyn Fn(&str) -> String) -> Template {
    // the send API requires a unique order number per receipt
    let order_number = format!("order{}", uuid::Uuid::new_v4().simple());

    Template::Receipt(Box::new(ReceiptTemplate {
        recipient_name: "Peter Chang".into(),
        order_number,
        currency: "USD".into(),
        payment_method: "Visa 1234".into(),
        timestamp: "1428444852".into(),
        elements: vec![
            ReceiptElement {
                title: "Oculus Rift".into(),
                subtitle: "Includes: headset, sensor, remote".into(),
                quantity: 1,
                price: 599.00,
                currency: "USD".into(),
                image_url: asset("riftsq.png"),
            },
            ReceiptElement {
                title: "Samsung Gear VR".into(),
                subtitle: "Frost White".into(),
                quantity: 1,
                price: 99.99,
                currency: "USD".into(),
                image_url: asset("gearvrsq.png"),
            },
        ],
        address: Address {
            street_1: "1 Hacker Way".into(),
            street_2: String::new(),
            city: "Menlo Park".into(),
            postal_code: "94025".into(),
            state: "CA".into(),
            country: "US".into(),
        },
        summary: Summary {
            subtotal: 698.99,
            shipping_cost: 20.00,
            total_tax: 57.67,
            total_cost: 626.66,
        },
        adjustments: vec![
            Adjustment {
                name: "New Customer Discount".into(),
                amount: -50.0,
            },
            Adjustment {
                name: "$100 Off Coupon".into(),
                amount: -100.0,
            },
        ],
    }))
}
