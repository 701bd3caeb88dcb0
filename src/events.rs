//! # Notification Stream Events
//!
//! Frame grammar of the notification stream and the event types carried on
//! it. Events are lightweight wake-up hints: a notification references a
//! task identifier for logging, but the consumer always re-derives the
//! actual work item by claiming from the queue store.
//!
//! ## Frame grammar
//!
//! The stream body is newline-delimited text. A data frame starts with the
//! literal `"data: "`; the remainder splits on commas into at most three
//! fields:
//!
//! ```text
//! data: message,task_notifications,{"taskId":"t-42"}
//! data: subscribe,task_notifications,1
//! ```
//!
//! Anything else (a missing prefix, fewer fields than the frame kind
//! needs) is not a frame and must be skipped, never an error.

use serde::{Deserialize, Serialize};

use crate::constants::FRAME_DATA_PREFIX;

/// A parsed data frame from the notification stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    /// A published message on a channel; `body` is the raw message content
    Message { channel: String, body: String },
    /// Subscription acknowledgement from the stream endpoint
    SubscribeAck { channel: String },
}

/// Parse one line of the stream body into a frame.
///
/// Returns `None` for anything that is not a well-formed data frame;
/// callers log and move on.
pub fn parse_data_frame(line: &str) -> Option<StreamFrame> {
    let rest = line.strip_prefix(FRAME_DATA_PREFIX)?;
    let mut fields = rest.splitn(3, ',');

    match fields.next()? {
        "message" => {
            let channel = fields.next()?;
            let body = fields.next()?;
            Some(StreamFrame::Message {
                channel: channel.to_string(),
                body: body.to_string(),
            })
        }
        "subscribe" => {
            let channel = fields.next()?;
            Some(StreamFrame::SubscribeAck {
                channel: channel.to_string(),
            })
        }
        _ => None,
    }
}

/// Wake-up event announcing that a task was enqueued
///
/// Transient; exists only on the wire. The identifier is used for logging;
/// the claim operation decides what actually gets processed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskNotification {
    pub task_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_message_frame() {
        let frame =
            parse_data_frame(r#"data: message,task_notifications,{"taskId":"t-1"}"#).unwrap();
        assert_eq!(
            frame,
            StreamFrame::Message {
                channel: "task_notifications".to_string(),
                body: r#"{"taskId":"t-1"}"#.to_string(),
            }
        );
    }

    #[test]
    fn message_body_keeps_embedded_commas() {
        // Only the first two commas delimit fields; JSON bodies contain more.
        let frame = parse_data_frame(
            r#"data: message,task_notifications,{"taskId":"t-1","action":"faceswap"}"#,
        )
        .unwrap();
        match frame {
            StreamFrame::Message { body, .. } => {
                assert_eq!(body, r#"{"taskId":"t-1","action":"faceswap"}"#);
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn parses_subscribe_ack() {
        let frame = parse_data_frame("data: subscribe,task_notifications,1").unwrap();
        assert_eq!(
            frame,
            StreamFrame::SubscribeAck {
                channel: "task_notifications".to_string(),
            }
        );
    }

    #[test]
    fn rejects_missing_prefix() {
        assert_eq!(parse_data_frame("message,chan,{}"), None);
        assert_eq!(parse_data_frame(": keep-alive"), None);
        assert_eq!(parse_data_frame(""), None);
    }

    #[test]
    fn rejects_short_message_frame() {
        // A message frame needs all three fields.
        assert_eq!(parse_data_frame("data: message,chan"), None);
        assert_eq!(parse_data_frame("data: message"), None);
    }

    #[test]
    fn rejects_unknown_frame_kind() {
        assert_eq!(parse_data_frame("data: unsubscribe,chan,1"), None);
    }

    #[test]
    fn notification_parses_with_extra_fields() {
        let n: TaskNotification =
            serde_json::from_str(r#"{"taskId":"t-9","priority":3}"#).unwrap();
        assert_eq!(n.task_id, "t-9");
    }

    #[test]
    fn notification_requires_task_id() {
        assert!(serde_json::from_str::<TaskNotification>(r#"{"id":"t-9"}"#).is_err());
    }
}
