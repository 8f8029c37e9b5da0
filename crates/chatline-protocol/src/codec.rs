//! Codec trait and implementations for turning messages into wire text.
//!
//! The session layer doesn't care HOW messages are serialized; it just
//! needs something that implements [`Codec`]. That is the "strategy
//! pattern": one interface, swappable implementations.
//!
//! Currently we provide [`JsonCodec`], one JSON object per frame.
//!
//! The two directions are asymmetric:
//!
//! - [`Codec::encode`] can fail (in theory) and returns a `Result`.
//! - [`Codec::decode`] cannot fail. Whatever the server sends, the caller
//!   gets an [`IncomingEvent`], with [`IncomingEvent::Malformed`] standing in
//!   for anything unreadable. A bad frame is something to show the user,
//!   not a reason to tear down the connection.

use crate::{IncomingEvent, OutgoingRequest, ProtocolError};

/// Translates between typed messages and wire text.
///
/// ## Trait bounds
///
/// - `Send + Sync` → one codec can be shared by the session handle and its
///   read loop, which run on different tasks.
/// - `'static` → the codec owns everything it needs, so it can live inside
///   a spawned task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a client request into one frame of wire text.
    ///
    /// Deterministic: equal requests produce byte-identical output.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode(&self, request: &OutgoingRequest) -> Result<String, ProtocolError>;

    /// Parses one frame received from the server.
    ///
    /// Never fails and never panics; unreadable input comes back as
    /// [`IncomingEvent::Malformed`] carrying the text verbatim.
    fn decode(&self, text: &str) -> IncomingEvent;

    /// Parses a client request: the server's side of [`encode`](Self::encode).
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if `text` is not a valid request.
    fn decode_request(&self, text: &str) -> Result<OutgoingRequest, ProtocolError>;

    /// Serializes an event the way a server would send it: the server's
    /// side of [`decode`](Self::decode).
    ///
    /// `Malformed` events are written back verbatim.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode_event(&self, event: &IncomingEvent) -> Result<String, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// JSON escapes control characters inside strings, so an encoded frame never
/// contains a raw newline. That is what lets the transport use `\n` as the
/// frame delimiter.
///
/// This is behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use chatline_protocol::{Codec, IncomingEvent, JsonCodec, OutgoingRequest};
///
/// let codec = JsonCodec;
///
/// let wire = codec.encode(&OutgoingRequest::auth("alice", "pw")).unwrap();
/// assert_eq!(wire, r#"{"type":"auth","login":"alice","password":"pw"}"#);
///
/// let event = codec.decode(r#"{"type":"message","login":"bob","message":"hi"}"#);
/// assert_eq!(
///     event,
///     IncomingEvent::ChatReceived { sender_login: "bob".into(), text: "hi".into() },
/// );
///
/// assert!(codec.decode("not json at all").is_malformed());
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode(&self, request: &OutgoingRequest) -> Result<String, ProtocolError> {
        serde_json::to_string(request).map_err(ProtocolError::Encode)
    }

    fn decode(&self, text: &str) -> IncomingEvent {
        // Anything serde rejects is malformed: not JSON, not an object,
        // missing `type`, or a string where a bool belongs.
        match serde_json::from_str::<crate::types::WireFrame>(text) {
            Ok(frame) => IncomingEvent::from_wire(frame, text),
            Err(_) => IncomingEvent::Malformed {
                raw_text: text.to_string(),
            },
        }
    }

    fn decode_request(&self, text: &str) -> Result<OutgoingRequest, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }

    fn encode_event(&self, event: &IncomingEvent) -> Result<String, ProtocolError> {
        match event.to_wire() {
            Some(frame) => serde_json::to_string(&frame).map_err(ProtocolError::Encode),
            None => match event {
                IncomingEvent::Malformed { raw_text } => Ok(raw_text.clone()),
                _ => Err(ProtocolError::InvalidMessage(format!(
                    "no wire form for {event:?}"
                ))),
            },
        }
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;

    #[test]
    fn test_encode_is_deterministic() {
        let req = OutgoingRequest::chat("alice", "same words");
        let first = JsonCodec.encode(&req).unwrap();
        let second = JsonCodec.encode(&req.clone()).unwrap();
        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    #[test]
    fn test_decode_request_recovers_encoded_requests() {
        let requests = [
            OutgoingRequest::auth("alice", "pw"),
            OutgoingRequest::chat("alice", "hello"),
            OutgoingRequest::chat("alice", ""),
            OutgoingRequest::chat("alice", "line one\nline two \"quoted\""),
        ];
        for req in requests {
            let wire = JsonCodec.encode(&req).unwrap();
            assert!(!wire.contains('\n'), "frame must stay on one line: {wire}");
            assert_eq!(JsonCodec.decode_request(&wire).unwrap(), req);
        }
    }

    #[test]
    fn test_decode_request_rejects_server_frames() {
        // A server frame is missing the client fields.
        let result = JsonCodec.decode_request(r#"{"type":"auth","success":true}"#);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_garbage_is_malformed_with_raw_text() {
        let inputs = [
            "",
            "not json at all",
            "{",
            "[1,2,3]",
            "42",
            "null",
            r#"{"success":true}"#,
            r#"{"type":7}"#,
            r#"{"type":"auth","success":"yes"}"#,
            r#"{"type":"message","login":5,"message":"x"}"#,
            "\u{fffd}\u{fffd}",
        ];
        for input in inputs {
            assert_eq!(
                JsonCodec.decode(input),
                IncomingEvent::Malformed {
                    raw_text: input.to_string()
                },
                "input {input:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_decode_truncated_frame_is_malformed() {
        let full = JsonCodec
            .encode_event(&IncomingEvent::ChatReceived {
                sender_login: "bob".into(),
                text: "hello".into(),
            })
            .unwrap();
        for cut in 0..full.len() {
            assert!(JsonCodec.decode(&full[..cut]).is_malformed());
        }
    }

    #[test]
    fn test_decode_empty_chat_text_is_not_malformed() {
        let event = JsonCodec.decode(r#"{"type":"message","success":true,"login":"bob","message":""}"#);
        assert_eq!(
            event,
            IncomingEvent::ChatReceived {
                sender_login: "bob".into(),
                text: String::new(),
            }
        );
    }

    #[test]
    fn test_decode_ignores_unknown_fields() {
        let event = JsonCodec.decode(
            r#"{"type":"auth","success":true,"message":"hi","server":"v2"}"#,
        );
        assert!(matches!(event, IncomingEvent::AuthResult { success: true, .. }));
    }

    #[test]
    fn test_encode_event_then_decode_gives_same_event() {
        let events = [
            IncomingEvent::AuthResult {
                success: true,
                failure_reason: None,
                greeting: None,
            },
            IncomingEvent::AuthResult {
                success: false,
                failure_reason: Some("bad password".into()),
                greeting: None,
            },
            IncomingEvent::ChatReceived {
                sender_login: "bob".into(),
                text: "hi".into(),
            },
            IncomingEvent::MessageRejected {
                reason: "slow down".into(),
            },
            IncomingEvent::Malformed {
                raw_text: "%%%".into(),
            },
        ];
        for event in events {
            let wire = JsonCodec.encode_event(&event).unwrap();
            assert_eq!(JsonCodec.decode(&wire), event);
        }
    }

    // =====================================================================
    // Properties
    // =====================================================================

    use proptest::prelude::*;

    fn arb_request() -> impl Strategy<Value = OutgoingRequest> {
        prop_oneof![
            (any::<String>(), any::<String>())
                .prop_map(|(login, password)| OutgoingRequest::auth(login, password)),
            (any::<String>(), any::<String>())
                .prop_map(|(login, text)| OutgoingRequest::chat(login, text)),
        ]
    }

    /// Mostly noise, plus frames that look enough like server JSON to reach
    /// the typed decoding paths.
    fn arb_frame() -> impl Strategy<Value = String> {
        prop_oneof![
            any::<String>(),
            r##"\{"type":"(auth|message|ping)"(,"(success|login|message)":("[a-z ]{0,8}"|true|false|null|[0-9]{1,3}))*\}"##,
        ]
    }

    proptest! {
        #[test]
        fn test_decode_any_text_is_malformed_verbatim_or_a_json_object(
            text in arb_frame(),
        ) {
            match JsonCodec.decode(&text) {
                IncomingEvent::Malformed { raw_text } => prop_assert_eq!(raw_text, text),
                _ => {
                    let value: serde_json::Value = serde_json::from_str(&text)
                        .expect("a typed event comes from valid JSON");
                    prop_assert!(value.is_object());
                }
            }
        }

        #[test]
        fn test_decode_request_recovers_any_encoded_request(req in arb_request()) {
            let wire = JsonCodec.encode(&req).unwrap();
            prop_assert!(!wire.contains('\n'));
            prop_assert_eq!(JsonCodec.decode_request(&wire).unwrap(), req.clone());
            prop_assert_eq!(JsonCodec.encode(&req).unwrap(), wire);
        }
    }
}
