use debugger::{Renderer, ToolboxState};
use transport::types::{Source, StackFrame, Variable, VariablesReference};

/// Prints session state to stdout as it changes.
#[derive(Debug, Default)]
pub struct ConsoleRenderer;

fn describe(source: &Source) -> String {
    match (&source.path, &source.name) {
        (Some(path), _) => path.display().to_string(),
        (None, Some(name)) => name.clone(),
        (None, None) => "<unknown>".to_string(),
    }
}

fn print_variable(indent: &str, variable: &Variable) {
    let expandable = if variable.variables_reference > 0 {
        format!(" [{}]", variable.variables_reference)
    } else {
        String::new()
    };
    match &variable.r#type {
        Some(ty) => println!(
            "{indent}{}: {ty} = {}{expandable}",
            variable.name, variable.value
        ),
        None => println!("{indent}{} = {}{expandable}", variable.name, variable.value),
    }
}

impl Renderer for ConsoleRenderer {
    fn render_stack_frames(&mut self, frames: &[StackFrame]) {
        if frames.is_empty() {
            return;
        }
        println!("stack:");
        for (i, frame) in frames.iter().enumerate() {
            let location = frame.source.as_ref().map(describe).unwrap_or_default();
            println!("  #{i} {} ({location}:{})", frame.name, frame.line);
        }
    }

    fn render_stop_line(&mut self, line: Option<i64>) {
        if let Some(line) = line {
            println!("stopped at line {line}");
        }
    }

    fn render_variables(&mut self, variables: &[Variable]) {
        if variables.is_empty() {
            return;
        }
        println!("variables:");
        for variable in variables {
            print_variable("  ", variable);
        }
    }

    fn render_nested_variables(&mut self, reference: VariablesReference, variables: &[Variable]) {
        println!("[{reference}]:");
        for variable in variables {
            print_variable("    ", variable);
        }
    }

    fn remove_nested_variables(&mut self, reference: VariablesReference) {
        tracing::debug!(reference, "collapsed variable");
    }

    fn update_toolbox(&mut self, state: ToolboxState) {
        match state {
            ToolboxState::Started => println!("session started (stop, next, continue, restart)"),
            ToolboxState::Stopped => println!("session ended (start)"),
        }
    }

    fn breakpoint_drawn(&mut self, source: &Source, line: i64) {
        println!("breakpoint at {}:{line}", describe(source));
    }

    fn breakpoint_removed(&mut self, source: &Source, line: i64) {
        println!("removed breakpoint at {}:{line}", describe(source));
    }

    fn file_changed(&mut self, source: &Source) {
        println!("current file: {}", describe(source));
    }

    fn output(&mut self, category: Option<&str>, output: &str) {
        match category {
            Some("stderr") => eprint!("{output}"),
            Some("telemetry") => {}
            _ => print!("{output}"),
        }
    }

    fn show_error(&mut self, message: &str) {
        eprintln!("error: {message}");
    }
}
