//! WebSocket event frames for the private notification channel.
//!
//! A client joins its channel over `GET /events/ws` with a bearer token
//! and then receives [`ServerEvent`] JSON frames. Delivery is
//! best-effort: events raised while a client is disconnected are not
//! queued.
//!
//! Frames are internally tagged so clients dispatch on the `"event"`
//! field:
//!
//! ```json
//! {"event":"new_blood_request","request":{ ... }}
//! {"event":"notification","notice":{ ... }}
//! {"event":"new_assignment","trip":{ ... }}
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ambulance::AmbulanceRequestView;
use super::blood::BloodRequestView;

/// What a directed notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    BloodRequestAccepted,
    BloodRequestFulfilled,
    TripAssigned,
    TripStatusChanged,
}

/// Payload of a directed `notification` frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub request_id: Uuid,
    pub message: String,
}

/// Server-to-client event frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Broadcast to eligible donors when a matching blood request is
    /// opened.
    NewBloodRequest { request: BloodRequestView },

    /// Directed at a single account (e.g. the owning patient after a
    /// donor accepts).
    Notification { notice: Notice },

    /// Directed at the driver an ambulance request was just assigned to.
    NewAssignment { trip: AmbulanceRequestView },
}

/// Well-known WebSocket close codes for the event channel.
///
/// Codes in the 4000–4999 range are reserved for application use by
/// [RFC 6455 §7.4.2](https://www.rfc-editor.org/rfc/rfc6455#section-7.4.2).
pub struct WsCloseCode;

impl WsCloseCode {
    /// Normal closure.
    pub const NORMAL: u16 = 1000;

    /// An unexpected server-side error.
    pub const INTERNAL_ERROR: u16 = 1011;

    /// The notification hub is not accepting subscribers.
    pub const HUB_UNAVAILABLE: u16 = 4003;
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn event_frames_are_tagged() {
        let notice = ServerEvent::Notification {
            notice: Notice {
                kind: NoticeKind::BloodRequestAccepted,
                request_id: Uuid::nil(),
                message: "a donor accepted your request".into(),
            },
        };
        let json = serde_json::to_string(&notice).unwrap();
        assert!(json.contains("\"event\":\"notification\""));
        assert!(json.contains("\"kind\":\"blood_request_accepted\""));
    }
}
