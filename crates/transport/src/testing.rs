//! Helpers for building wire bytes in tests.

use serde::Serialize;

/// Construct a valid frame from a JSON-serializable message.
///
/// # Example
///
/// ```
/// use transport::testing::frame_message;
/// use serde_json::json;
///
/// let bytes = frame_message(&json!({
///     "seq": 1,
///     "type": "event",
///     "event": "initialized"
/// }));
///
/// assert!(bytes.starts_with(b"Content-Length: "));
/// ```
pub fn frame_message(msg: &impl Serialize) -> Vec<u8> {
    let json = serde_json::to_string(msg).expect("failed to serialize message");
    format!("Content-Length: {}\r\n\r\n{}", json.len(), json).into_bytes()
}

/// Construct multiple frames concatenated together.
pub fn frame_messages<T: Serialize>(msgs: &[T]) -> Vec<u8> {
    msgs.iter().flat_map(|m| frame_message(m)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_frame_messages() {
        let bytes = frame_messages(&[
            json!({"seq": 1, "type": "event", "event": "a"}),
            json!({"seq": 2, "type": "event", "event": "b"}),
        ]);
        let s = String::from_utf8(bytes).unwrap();

        assert_eq!(s.matches("Content-Length:").count(), 2);
    }
}
