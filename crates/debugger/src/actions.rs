//! Named actions raised by the user interface.
//!
//! Toolbar buttons, gutter clicks and keyboard shortcuts all produce the
//! same [`Action`] values, so the session handles them uniformly.

use std::fmt;

use serde::{Deserialize, Serialize};
use transport::types::VariablesReference;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Start,
    Stop,
    StepOver,
    Continue,
    Restart,
    /// Toggle the breakpoint on a line of the active file
    Breakpoint { line: i64 },
    /// Expand a variable with children
    OpenVariable { reference: VariablesReference },
    /// Collapse a previously expanded variable
    CloseVariable { reference: VariablesReference },
}

/// The name an [`Action`] is dispatched under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    Start,
    Stop,
    StepOver,
    Continue,
    Restart,
    Breakpoint,
    OpenVariable,
    CloseVariable,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Start => ActionKind::Start,
            Action::Stop => ActionKind::Stop,
            Action::StepOver => ActionKind::StepOver,
            Action::Continue => ActionKind::Continue,
            Action::Restart => ActionKind::Restart,
            Action::Breakpoint { .. } => ActionKind::Breakpoint,
            Action::OpenVariable { .. } => ActionKind::OpenVariable,
            Action::CloseVariable { .. } => ActionKind::CloseVariable,
        }
    }
}

impl ActionKind {
    pub const ALL: [ActionKind; 8] = [
        ActionKind::Start,
        ActionKind::Stop,
        ActionKind::StepOver,
        ActionKind::Continue,
        ActionKind::Restart,
        ActionKind::Breakpoint,
        ActionKind::OpenVariable,
        ActionKind::CloseVariable,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ActionKind::Start => "start",
            ActionKind::Stop => "stop",
            ActionKind::StepOver => "stepOver",
            ActionKind::Continue => "continue",
            ActionKind::Restart => "restart",
            ActionKind::Breakpoint => "breakpoint",
            ActionKind::OpenVariable => "openVariable",
            ActionKind::CloseVariable => "closeVariable",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
