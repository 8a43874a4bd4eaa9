//! Notification Builder
//!
//! Maps a decoded event to an ordered list of labeled fields. Fields are never
//! dropped here; whether an empty optional field renders is up to the
//! delivery target.

use crate::types::{EventRecord, NotificationField, NotificationMessage};

/// Build the notification for a decoded event.
pub fn build_notification(record: &EventRecord, title: &str) -> NotificationMessage {
    let mut msg = NotificationMessage::new(
        title,
        NotificationField::new("Event", record.event_type(), true),
    );

    match record {
        EventRecord::Rejected(event) => {
            msg.add_data("Message ID", &event.id, true)
                .add_data("Subject", event.subject(), true)
                .add_data("To", event.to(), true)
                .add_data("Reason", &event.reject.reason, false)
                .add_data("Description", &event.reject.description, false);
        }
        EventRecord::Failed(event) => {
            msg.add_data("Message ID", &event.id, true)
                .add_data("Recipient", &event.recipient, true)
                .add_data("Subject", event.subject(), true)
                .add_data("Severity", &event.severity, true)
                .add_data("DeliveryStatus", event.delivery_status_message(), false)
                .add_data("Reason", &event.reason, false);
        }
        EventRecord::Unhandled { .. } => {}
    }

    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        DeliveryStatus, FailedEvent, Message, RecipientHeaders, RejectDetails, RejectedEvent,
        SubjectHeaders,
    };

    fn labels(msg: &NotificationMessage) -> Vec<(&str, bool)> {
        msg.fields()
            .map(|f| (f.label.as_str(), f.required))
            .collect()
    }

    #[test]
    fn test_build_rejected() {
        let record = EventRecord::Rejected(RejectedEvent {
            id: "id-1".into(),
            message: Message {
                headers: RecipientHeaders {
                    subject: "Welcome".into(),
                    to: "alice@example.com".into(),
                },
            },
            reject: RejectDetails {
                reason: "REJECTED".into(),
                description: String::new(),
            },
        });

        let msg = build_notification(&record, "MailGun Error");

        assert_eq!(msg.title, "MailGun Error");
        assert_eq!(msg.error_field, NotificationField::new("Event", "rejected", true));
        assert_eq!(
            labels(&msg),
            vec![
                ("Event", true),
                ("Message ID", true),
                ("Subject", true),
                ("To", true),
                ("Reason", false),
                ("Description", false),
            ]
        );
        // Empty optional values are kept
        assert_eq!(msg.data_fields[4].value, "");
        assert_eq!(msg.data_fields[2].value, "alice@example.com");
    }

    #[test]
    fn test_build_failed() {
        let record = EventRecord::Failed(FailedEvent {
            id: "id-2".into(),
            recipient: "bob@example.com".into(),
            message: Message {
                headers: SubjectHeaders {
                    subject: "Invoice".into(),
                },
            },
            severity: "temporary".into(),
            delivery_status: DeliveryStatus {
                message: "Mailbox full".into(),
            },
            reason: "generic".into(),
        });

        let msg = build_notification(&record, "Mail failure");

        assert_eq!(msg.field_count(), 7);
        assert_eq!(
            labels(&msg),
            vec![
                ("Event", true),
                ("Message ID", true),
                ("Recipient", true),
                ("Subject", true),
                ("Severity", true),
                ("DeliveryStatus", false),
                ("Reason", false),
            ]
        );
        let values: Vec<_> = msg.data_fields.iter().map(|f| f.value.as_str()).collect();
        assert_eq!(
            values,
            vec!["id-2", "bob@example.com", "Invoice", "temporary", "Mailbox full", "generic"]
        );
    }

    #[test]
    fn test_build_unhandled() {
        let record = EventRecord::Unhandled {
            event_type: "clicked".into(),
        };

        let msg = build_notification(&record, "MailGun Error");

        assert_eq!(msg.field_count(), 1);
        assert_eq!(msg.error_field.value, "clicked");
        assert!(msg.data_fields.is_empty());
    }
}
