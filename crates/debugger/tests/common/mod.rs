//! Shared harness: a renderer that records what it was asked to show and a
//! scripted adapter on the far end of an in-memory transport.
#![allow(dead_code)]

use std::io::IsTerminal;
use std::thread;
use std::time::{Duration, Instant};

use debugger::{ClientConfig, Renderer, Session, ToolboxState};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;
use transport::{
    Event, Message, Request, Response,
    io::{MemoryPeer, MemoryTransport},
    types::{Source, StackFrame, Variable, VariablesReference},
};

pub fn init_tracing() {
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
    let _ = color_eyre::install();
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    StackFrames(Vec<String>),
    StopLine(Option<i64>),
    Variables(Vec<String>),
    NestedVariables(VariablesReference, Vec<String>),
    NestedRemoved(VariablesReference),
    Toolbox(ToolboxState),
    BreakpointDrawn(i64),
    BreakpointRemoved(i64),
    FileChanged(Source),
    Output(String),
    Error(String),
}

#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub calls: Vec<Rendered>,
}

impl RecordingRenderer {
    pub fn errors(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Rendered::Error(e) => Some(e.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Rendered) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

fn variable_names(variables: &[Variable]) -> Vec<String> {
    variables
        .iter()
        .map(|v| format!("{}={}", v.name, v.value))
        .collect()
}

impl Renderer for RecordingRenderer {
    fn render_stack_frames(&mut self, frames: &[StackFrame]) {
        self.calls.push(Rendered::StackFrames(
            frames.iter().map(|f| f.name.clone()).collect(),
        ));
    }

    fn render_stop_line(&mut self, line: Option<i64>) {
        self.calls.push(Rendered::StopLine(line));
    }

    fn render_variables(&mut self, variables: &[Variable]) {
        self.calls
            .push(Rendered::Variables(variable_names(variables)));
    }

    fn render_nested_variables(&mut self, reference: VariablesReference, variables: &[Variable]) {
        self.calls.push(Rendered::NestedVariables(
            reference,
            variable_names(variables),
        ));
    }

    fn remove_nested_variables(&mut self, reference: VariablesReference) {
        self.calls.push(Rendered::NestedRemoved(reference));
    }

    fn update_toolbox(&mut self, state: ToolboxState) {
        self.calls.push(Rendered::Toolbox(state));
    }

    fn breakpoint_drawn(&mut self, _source: &Source, line: i64) {
        self.calls.push(Rendered::BreakpointDrawn(line));
    }

    fn breakpoint_removed(&mut self, _source: &Source, line: i64) {
        self.calls.push(Rendered::BreakpointRemoved(line));
    }

    fn file_changed(&mut self, source: &Source) {
        self.calls.push(Rendered::FileChanged(source.clone()));
    }

    fn output(&mut self, _category: Option<&str>, output: &str) {
        self.calls.push(Rendered::Output(output.to_string()));
    }

    fn show_error(&mut self, message: &str) {
        self.calls.push(Rendered::Error(message.to_string()));
    }
}

pub type TestSession = Session<MemoryTransport, RecordingRenderer>;

pub fn main_file() -> Source {
    Source::from_path("/work/main.py")
}

pub fn new_session() -> (TestSession, MockAdapter) {
    new_session_with(ClientConfig::default())
}

pub fn new_session_with(config: ClientConfig) -> (TestSession, MockAdapter) {
    let (transport, peer) = MemoryTransport::pair();
    let session = Session::new(transport, RecordingRenderer::default(), config, main_file());
    (session, MockAdapter::new(peer))
}

/// Plays the debug adapter.
pub struct MockAdapter {
    peer: MemoryPeer,
    seq: i64,
}

impl MockAdapter {
    pub fn new(peer: MemoryPeer) -> Self {
        Self { peer, seq: 0 }
    }

    fn next_seq(&mut self) -> i64 {
        self.seq += 1;
        self.seq
    }

    /// Requests received since the last call.
    pub fn requests(&mut self) -> Vec<Request> {
        self.peer
            .received()
            .into_iter()
            .filter_map(|m| match m {
                Message::Request(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    /// The single request received since the last call.
    pub fn expect_request(&mut self, command: &str) -> Request {
        let mut requests = self.requests();
        assert_eq!(
            requests.iter().map(|r| r.command.as_str()).collect::<Vec<_>>(),
            vec![command],
        );
        requests.remove(0)
    }

    /// Poll until the client sends `command`, for sessions on another thread.
    pub fn wait_for_request(&mut self, command: &str) -> Request {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(request) = self.requests().into_iter().find(|r| r.command == command) {
                return request;
            }
            if Instant::now() > deadline {
                panic!("no {command} request within 5 seconds");
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    pub fn respond(&mut self, request: &Request, body: Value) {
        let seq = self.next_seq();
        self.peer.send(&Message::Response(Response {
            seq,
            request_seq: request.seq,
            success: true,
            command: request.command.clone(),
            message: None,
            body: Some(body),
        }));
    }

    pub fn ack(&mut self, request: &Request) {
        self.respond(request, json!({}));
    }

    pub fn reject(&mut self, request: &Request, message: &str) {
        let seq = self.next_seq();
        self.peer.send(&Message::Response(Response {
            seq,
            request_seq: request.seq,
            success: false,
            command: request.command.clone(),
            message: Some(message.to_string()),
            body: None,
        }));
    }

    pub fn event(&mut self, name: &str, body: Value) {
        let seq = self.next_seq();
        self.peer.send(&Message::Event(Event {
            seq,
            event: name.to_string(),
            body: Some(body),
        }));
    }

    pub fn hang_up(&self) {
        self.peer.hang_up();
    }
}

/// Start a session and answer the handshake until the debuggee runs.
pub fn launch(session: &mut TestSession, adapter: &mut MockAdapter) {
    session.dispatch(debugger::Action::Start);
    let initialize = adapter.expect_request("initialize");
    adapter.respond(&initialize, json!({"supportsConfigurationDoneRequest": true}));
    session.poll();

    let launch = adapter.expect_request("launch");
    adapter.event("initialized", json!({}));
    session.poll();

    let mut requests = adapter.requests();
    if requests.iter().all(|r| r.command == "setBreakpoints") {
        for request in &requests {
            adapter.ack(request);
        }
        session.poll();
        requests = adapter.requests();
    }
    assert_eq!(requests.len(), 1);
    let done = requests.remove(0);
    assert_eq!(done.command, "configurationDone");
    adapter.ack(&done);
    adapter.ack(&launch);
    session.poll();
}

/// Stop thread `thread_id` at `line` and answer the inspection requests.
pub fn stop_at(session: &mut TestSession, adapter: &mut MockAdapter, thread_id: i64, line: i64) {
    adapter.event(
        "stopped",
        json!({"reason": "breakpoint", "threadId": thread_id}),
    );
    session.poll();

    let stack_trace = adapter.expect_request("stackTrace");
    adapter.respond(
        &stack_trace,
        json!({"stackFrames": [
            {"id": 100, "name": "main", "line": line, "column": 1, "source": {"path": "/work/main.py"}},
            {"id": 101, "name": "<module>", "line": 3, "column": 1}
        ]}),
    );
    session.poll();

    let scopes = adapter.expect_request("scopes");
    adapter.respond(
        &scopes,
        json!({"scopes": [
            {"name": "Locals", "variablesReference": 20},
            {"name": "Globals", "variablesReference": 21}
        ]}),
    );
    session.poll();

    let variables = adapter.expect_request("variables");
    adapter.respond(
        &variables,
        json!({"variables": [
            {"name": "x", "value": "1", "type": "int", "variablesReference": 0},
            {"name": "items", "value": "[1, 2]", "type": "list", "variablesReference": 33}
        ]}),
    );
    session.poll();
}
