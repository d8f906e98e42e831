//! Protocol message types.
//!
//! Every frame on the wire carries one [`Message`], tagged by its `type`
//! field. Payloads (`arguments`, `body`) stay opaque JSON until a consumer
//! asks for a typed view.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Sequence number type for message ordering and request-response correlation.
pub type Seq = i64;

/// A protocol message, in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    /// A request issued by the client (or a reverse request from the adapter).
    Request(Request),
    /// A response to a previously sent request.
    Response(Response),
    /// An unsolicited event notification.
    Event(Event),
}

impl Message {
    /// The correlation key of the message: a request or response command,
    /// or an event name.
    pub fn name(&self) -> &str {
        match self {
            Message::Request(r) => &r.command,
            Message::Response(r) => &r.command,
            Message::Event(e) => &e.event,
        }
    }
}

impl From<Request> for Message {
    fn from(value: Request) -> Self {
        Message::Request(value)
    }
}

impl From<Response> for Message {
    fn from(value: Response) -> Self {
        Message::Response(value)
    }
}

impl From<Event> for Message {
    fn from(value: Event) -> Self {
        Message::Event(value)
    }
}

/// A request message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Sequence number assigned by the sender.
    pub seq: Seq,
    /// The command to execute.
    pub command: String,
    /// Command arguments (command-specific).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<serde_json::Value>,
}

/// A response message from the debug adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Sequence number of this response.
    #[serde(default)]
    pub seq: Seq,
    /// Sequence number of the request this response is for.
    pub request_seq: Seq,
    /// Whether the request was successful.
    pub success: bool,
    /// The command that was requested.
    pub command: String,
    /// Error message if success is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Response body (command-specific).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

impl Response {
    /// Deserialize the body into a typed view.
    pub fn decode_body<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.body.clone().unwrap_or_default())
    }
}

/// An event notification from the debug adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Sequence number of this event.
    #[serde(default)]
    pub seq: Seq,
    /// The event type.
    pub event: String,
    /// Event body (event-specific).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

impl Event {
    /// Deserialize the body into a typed view.
    pub fn decode_body<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.body.clone().unwrap_or_default())
    }
}
