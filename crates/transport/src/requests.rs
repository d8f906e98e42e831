//! Request construction.
//!
//! A [`RequestBuilder`] is owned by one connection and stamps every request
//! it builds with the next sequence number. Building does not send anything.

use serde::Serialize;
use serde_json::{Value, json};

use crate::message::{Request, Seq};
use crate::types::{Source, SourceBreakpoint, StackFrameId, ThreadId, VariablesReference};

/// Arguments for the `initialize` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeArguments {
    #[serde(rename = "clientID")]
    pub client_id: String,
    pub client_name: String,
    #[serde(rename = "adapterID")]
    pub adapter_id: String,
    pub path_format: String,
    pub lines_start_at1: bool,
    pub columns_start_at1: bool,
    pub supports_variable_type: bool,
    pub supports_variable_paging: bool,
    pub supports_run_in_terminal_request: bool,
    pub locale: String,
}

impl InitializeArguments {
    pub fn new(adapter_id: impl Into<String>) -> Self {
        Self {
            client_id: "dap-client".to_string(),
            client_name: "DAP client".to_string(),
            adapter_id: adapter_id.into(),
            path_format: "path".to_string(),
            lines_start_at1: true,
            columns_start_at1: true,
            supports_variable_type: true,
            supports_variable_paging: true,
            supports_run_in_terminal_request: false,
            locale: "en".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct SetBreakpointsArguments<'a> {
    source: &'a Source,
    lines: &'a [i64],
    breakpoints: Vec<SourceBreakpoint>,
    source_modified: bool,
}

/// Builds requests with strictly increasing sequence numbers, starting at 1.
#[derive(Debug)]
pub struct RequestBuilder {
    next_seq: Seq,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self { next_seq: 1 }
    }

    /// The sequence number the next built request will carry.
    pub fn next_seq(&self) -> Seq {
        self.next_seq
    }

    /// Build an arbitrary request.
    pub fn request(&mut self, command: impl Into<String>, arguments: Option<Value>) -> Request {
        let seq = self.next_seq;
        self.next_seq += 1;
        Request {
            seq,
            command: command.into(),
            arguments,
        }
    }

    pub fn initialize(&mut self, arguments: &InitializeArguments) -> Request {
        self.request("initialize", Some(json!(arguments)))
    }

    /// Launch arguments are adapter specific and passed through untouched.
    pub fn launch(&mut self, arguments: Value) -> Request {
        self.request("launch", Some(arguments))
    }

    pub fn disconnect(&mut self) -> Request {
        self.request("disconnect", None)
    }

    /// Replace the breakpoints of one source file.
    pub fn set_breakpoints(&mut self, source: &Source, lines: &[i64]) -> Request {
        let arguments = SetBreakpointsArguments {
            source,
            lines,
            breakpoints: lines
                .iter()
                .map(|&line| SourceBreakpoint { line })
                .collect(),
            source_modified: false,
        };
        self.request("setBreakpoints", Some(json!(arguments)))
    }

    pub fn configuration_done(&mut self) -> Request {
        self.request("configurationDone", None)
    }

    pub fn stack_trace(&mut self, thread_id: ThreadId) -> Request {
        self.request(
            "stackTrace",
            Some(json!({ "threadId": thread_id, "startFrame": 0 })),
        )
    }

    pub fn scopes(&mut self, frame_id: StackFrameId) -> Request {
        self.request("scopes", Some(json!({ "frameId": frame_id })))
    }

    pub fn variables(&mut self, variables_reference: VariablesReference) -> Request {
        self.request(
            "variables",
            Some(json!({ "variablesReference": variables_reference })),
        )
    }

    pub fn next(&mut self, thread_id: ThreadId) -> Request {
        self.request("next", Some(json!({ "threadId": thread_id })))
    }

    pub fn r#continue(&mut self, thread_id: ThreadId) -> Request {
        self.request("continue", Some(json!({ "threadId": thread_id })))
    }

    pub fn restart(&mut self) -> Request {
        self.request("restart", None)
    }

    pub fn terminate(&mut self, restart: bool) -> Request {
        self.request("terminate", Some(json!({ "restart": restart })))
    }
}
