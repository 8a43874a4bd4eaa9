//! Slack incoming-webhook payload
//!
//! The error field goes in a red attachment, the data fields in a second
//! attachment. Required fields always render; an empty required value is
//! shown as [`EMPTY_VALUE`]. Optional fields with an empty value are dropped.

use mailrelay_core::{NotificationField, NotificationMessage};
use serde::Serialize;

/// Shown in place of an empty required value
pub const EMPTY_VALUE: &str = "-";

const ERROR_COLOR: &str = "danger";
const DATA_COLOR: &str = "#439FE0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlackPayload {
    pub text: String,
    pub attachments: Vec<SlackAttachment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlackAttachment {
    pub color: String,
    pub fields: Vec<SlackField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlackField {
    pub title: String,
    pub value: String,
    pub short: bool,
}

impl SlackField {
    fn render(field: &NotificationField) -> Option<Self> {
        let value = match (field.value.is_empty(), field.required) {
            (false, _) => field.value.clone(),
            (true, true) => EMPTY_VALUE.to_string(),
            (true, false) => return None,
        };

        Some(Self {
            title: field.label.clone(),
            value,
            short: false,
        })
    }
}

impl From<&NotificationMessage> for SlackPayload {
    fn from(msg: &NotificationMessage) -> Self {
        let mut attachments = Vec::with_capacity(2);

        attachments.push(SlackAttachment {
            color: ERROR_COLOR.to_string(),
            fields: SlackField::render(&msg.error_field).into_iter().collect(),
        });

        let data: Vec<SlackField> = msg.data_fields.iter().filter_map(SlackField::render).collect();
        if !data.is_empty() {
            attachments.push(SlackAttachment {
                color: DATA_COLOR.to_string(),
                fields: data,
            });
        }

        Self {
            text: msg.title.clone(),
            attachments,
        }
    }
}
