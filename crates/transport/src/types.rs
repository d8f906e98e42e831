//! Typed views of the protocol payloads the client reads and writes.
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub type ThreadId = i64;
pub type StackFrameId = i64;
pub type VariablesReference = i64;

/// Identifies a source file in the debuggee.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Source {
    /// A source identified by its path, named after the file.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: path
                .file_name()
                .and_then(|n| n.to_str())
                .map(ToString::to_string),
            path: Some(path),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceBreakpoint {
    pub line: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    pub id: StackFrameId,
    pub name: String,
    pub line: i64,
    #[serde(default)]
    pub column: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    pub name: String,
    pub variables_reference: VariablesReference,
    #[serde(default)]
    pub expensive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub name: String,
    pub value: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
    /// Non-zero when the variable has children that can be fetched.
    #[serde(default)]
    pub variables_reference: VariablesReference,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoppedEventBody {
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<ThreadId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadEventBody {
    pub reason: String,
    pub thread_id: ThreadId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputEventBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackTraceResponse {
    pub stack_frames: Vec<StackFrame>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_frames: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopesResponse {
    pub scopes: Vec<Scope>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariablesResponse {
    pub variables: Vec<Variable>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_trace_body() {
        let body: StackTraceResponse = serde_json::from_value(serde_json::json!({
            "stackFrames": [
                {"id": 1, "name": "main", "line": 42, "column": 1, "source": {"path": "/tmp/main.py"}}
            ],
            "totalFrames": 1
        }))
        .unwrap();

        assert_eq!(body.stack_frames[0].line, 42);
        assert_eq!(
            body.stack_frames[0].source.as_ref().and_then(|s| s.path.clone()),
            Some(PathBuf::from("/tmp/main.py"))
        );
    }

    #[test]
    fn variable_type_field() {
        let var: Variable = serde_json::from_value(serde_json::json!({
            "name": "x", "value": "1", "type": "int", "variablesReference": 0
        }))
        .unwrap();

        assert_eq!(var.r#type.as_deref(), Some("int"));
    }

    #[test]
    fn source_from_path() {
        let source = Source::from_path("/src/app.py");
        assert_eq!(source.name.as_deref(), Some("app.py"));
    }
}
