//! Transport-agnostic notification message

use serde::Serialize;

/// One labeled line of a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationField {
    pub label: String,
    pub value: String,
    /// Required fields render even when `value` is empty
    pub required: bool,
}

impl NotificationField {
    pub fn new(label: impl Into<String>, value: impl Into<String>, required: bool) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            required,
        }
    }
}

/// A notification ready to hand to a delivery target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationMessage {
    pub title: String,
    pub error_field: NotificationField,
    pub data_fields: Vec<NotificationField>,
}

impl NotificationMessage {
    pub fn new(title: impl Into<String>, error_field: NotificationField) -> Self {
        Self {
            title: title.into(),
            error_field,
            data_fields: Vec::new(),
        }
    }

    pub fn add_data(
        &mut self,
        label: impl Into<String>,
        value: impl Into<String>,
        required: bool,
    ) -> &mut Self {
        self.data_fields
            .push(NotificationField::new(label, value, required));
        self
    }

    /// Error field first, then data fields in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = &NotificationField> {
        std::iter::once(&self.error_field).chain(self.data_fields.iter())
    }

    pub fn field_count(&self) -> usize {
        1 + self.data_fields.len()
    }
}
