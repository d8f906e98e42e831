//! Integration tests for the wire layer
//!
//! These drive the public API the way a connection does: requests are built
//! and framed, adapter output is fed to a decoder in arbitrary read sizes.

use std::io::IsTerminal;

use eyre::Result;
use serde_json::json;
use tracing_subscriber::EnvFilter;
use transport::{
    Event, FrameDecoder, FrameError, InitializeArguments, Message, RequestBuilder, Response,
    encode,
    io::{MemoryTransport, Transport, TransportEvent},
    testing::{frame_message, frame_messages},
    types::Source,
};

// test suite "constructor"
#[ctor::ctor]
fn init() {
    if std::io::stderr().is_terminal() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .json()
            .try_init();
    }
}

fn adapter_output() -> Vec<serde_json::Value> {
    vec![
        json!({"seq": 1, "type": "response", "request_seq": 1, "success": true, "command": "initialize", "body": {}}),
        json!({"seq": 2, "type": "event", "event": "initialized"}),
        json!({"seq": 3, "type": "event", "event": "output", "body": {"category": "stdout", "output": "héllo wörld\n"}}),
        json!({"seq": 4, "type": "event", "event": "stopped", "body": {"reason": "breakpoint", "threadId": 1}}),
    ]
}

#[test]
fn every_built_request_survives_the_wire() -> Result<()> {
    let mut builder = RequestBuilder::new();
    let requests = vec![
        builder.initialize(&InitializeArguments::new("debugpy")),
        builder.launch(json!({"program": "main.py", "justMyCode": false})),
        builder.set_breakpoints(&Source::from_path("/work/main.py"), &[4, 17]),
        builder.configuration_done(),
        builder.stack_trace(1),
        builder.disconnect(),
    ];

    let mut decoder = FrameDecoder::new();
    for request in requests {
        let message = Message::Request(request);
        let frame = encode(&message)?;
        let pass = decoder.decode(&frame);
        assert_eq!(pass.messages, vec![message]);
    }
    assert_eq!(builder.next_seq(), 7);
    Ok(())
}

#[test]
fn reads_of_every_size_decode_identically() {
    let bytes = frame_messages(&adapter_output());

    for read_size in 1..=bytes.len() {
        let mut decoder = FrameDecoder::new();
        let mut names = Vec::new();
        for chunk in bytes.chunks(read_size) {
            names.extend(
                decoder
                    .decode(chunk)
                    .messages
                    .iter()
                    .map(|m| m.name().to_string()),
            );
        }
        assert_eq!(
            names,
            vec!["initialize", "initialized", "output", "stopped"],
            "read size {read_size}"
        );
    }
}

#[test]
fn decoding_continues_past_bad_payloads() {
    let mut bytes = frame_message(&json!({"seq": 1, "type": "event", "event": "initialized"}));
    bytes.extend_from_slice(&frame_message(&json!({"seq": 2, "type": "unknown"})));
    bytes.extend_from_slice(&frame_message(&json!({"seq": 3, "type": "event", "event": "terminated"})));

    let mut decoder = FrameDecoder::new();
    let pass = decoder.decode(&bytes);

    let names: Vec<_> = pass.messages.iter().map(Message::name).collect();
    assert_eq!(names, vec!["initialized", "terminated"]);
    assert!(matches!(
        pass.errors.as_slice(),
        [FrameError::InvalidPayload { .. }]
    ));
}

#[test]
fn memory_transport_carries_frames_both_ways() -> Result<()> {
    let (mut transport, mut peer) = MemoryTransport::pair();
    let events = transport.connect()?;

    let mut builder = RequestBuilder::new();
    let request = Message::Request(builder.configuration_done());
    transport.send(&encode(&request)?)?;
    assert_eq!(peer.received(), vec![request]);

    peer.send_batch(&[
        Message::Response(Response {
            seq: 10,
            request_seq: 1,
            success: true,
            command: "configurationDone".to_string(),
            message: None,
            body: None,
        }),
        Message::Event(Event {
            seq: 11,
            event: "exited".to_string(),
            body: Some(json!({"exitCode": 0})),
        }),
    ]);

    let mut decoder = FrameDecoder::new();
    let TransportEvent::Data(chunk) = events.try_recv()? else {
        eyre::bail!("expected a data read");
    };
    let pass = decoder.decode(&chunk);
    assert_eq!(pass.messages.len(), 2);
    assert_eq!(pass.messages[1].name(), "exited");
    Ok(())
}
