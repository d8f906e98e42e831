//! The view side of a debug session.
//!
//! A [`Renderer`] receives decoded protocol data, never raw frames. Methods
//! with default bodies are optional for front ends that do not show that
//! kind of information.

use transport::types::{Source, StackFrame, Variable, VariablesReference};

/// Which run controls should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolboxState {
    /// A session is active: stop, step and continue are available
    Started,
    /// No session: only start is available
    Stopped,
}

pub trait Renderer {
    fn render_stack_frames(&mut self, frames: &[StackFrame]);

    /// Highlight the line execution stopped on, or clear the highlight.
    fn render_stop_line(&mut self, line: Option<i64>);

    fn render_variables(&mut self, variables: &[Variable]);

    /// Show the children of an expanded variable.
    fn render_nested_variables(&mut self, reference: VariablesReference, variables: &[Variable]);

    fn remove_nested_variables(&mut self, reference: VariablesReference);

    fn update_toolbox(&mut self, state: ToolboxState);

    fn breakpoint_drawn(&mut self, _source: &Source, _line: i64) {}

    fn breakpoint_removed(&mut self, _source: &Source, _line: i64) {}

    fn file_changed(&mut self, _source: &Source) {}

    /// Text the debuggee or adapter printed.
    fn output(&mut self, _category: Option<&str>, _output: &str) {}

    fn show_error(&mut self, _message: &str) {}

    /// Clear every inspection view.
    fn clear(&mut self) {
        self.render_stop_line(None);
        self.render_variables(&[]);
        self.render_stack_frames(&[]);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render_stack_frames(&mut self, _frames: &[StackFrame]) {}
    fn render_stop_line(&mut self, _line: Option<i64>) {}
    fn render_variables(&mut self, _variables: &[Variable]) {}
    fn render_nested_variables(&mut self, _reference: VariablesReference, _variables: &[Variable]) {}
    fn remove_nested_variables(&mut self, _reference: VariablesReference) {}
    fn update_toolbox(&mut self, _state: ToolboxState) {}
}
