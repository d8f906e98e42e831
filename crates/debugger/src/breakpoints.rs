//! Line breakpoints across the files of a debug session.

use std::collections::{BTreeMap, BTreeSet};

use transport::types::Source;

/// A line breakpoint in a source file. Lines start at 1.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Breakpoint {
    pub source: Source,
    pub line: i64,
}

/// Outcome of [`BreakpointSet::toggle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggled {
    Added,
    Removed,
}

/// A change to the text of the active document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentEdit {
    /// A line break was inserted on line `at`
    InsertLine { at: i64 },
    /// Line `at` was joined with the line after it
    DeleteLine { at: i64 },
    /// Anything else, breakpoints stay where they are
    Other,
}

impl DocumentEdit {
    /// Classify an editor change replacing the range from `start_line` to
    /// `end_line` with `text`.
    pub fn from_change(start_line: i64, end_line: i64, text: &str) -> Self {
        match text {
            "\n" | "\r\n" if start_line == end_line => DocumentEdit::InsertLine { at: start_line },
            "" if end_line - start_line == 1 => DocumentEdit::DeleteLine { at: start_line },
            _ => DocumentEdit::Other,
        }
    }
}

/// A breakpoint that a document edit moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Moved {
    pub from: i64,
    pub to: i64,
}

/// Breakpoints keyed by `(source, line)`, with the file being edited.
#[derive(Debug, Clone)]
pub struct BreakpointSet {
    current: Source,
    breakpoints: BTreeSet<Breakpoint>,
}

impl BreakpointSet {
    pub fn new(current: Source) -> Self {
        Self {
            current,
            breakpoints: BTreeSet::new(),
        }
    }

    pub fn current_file(&self) -> &Source {
        &self.current
    }

    /// Later additions, toggles and edits apply to `source`.
    pub fn change_current_file(&mut self, source: Source) {
        self.current = source;
    }

    fn key(&self, line: i64) -> Breakpoint {
        Breakpoint {
            source: self.current.clone(),
            line,
        }
    }

    /// Add a breakpoint to the current file; returns false if it was already set.
    pub fn add(&mut self, line: i64) -> bool {
        let key = self.key(line);
        self.breakpoints.insert(key)
    }

    pub fn remove(&mut self, line: i64) -> bool {
        let key = self.key(line);
        self.breakpoints.remove(&key)
    }

    /// Add the breakpoint if absent from the current file, remove it otherwise.
    pub fn toggle(&mut self, line: i64) -> Toggled {
        if self.remove(line) {
            Toggled::Removed
        } else {
            self.add(line);
            Toggled::Added
        }
    }

    pub fn contains(&self, line: i64) -> bool {
        self.breakpoints.contains(&self.key(line))
    }

    /// Shift the current file's breakpoints after a single line edit.
    ///
    /// Lines never move below 1, and breakpoints that land on the same line
    /// merge.
    pub fn on_document_edit(&mut self, edit: DocumentEdit) -> Vec<Moved> {
        let (at, delta) = match edit {
            DocumentEdit::InsertLine { at } => (at, 1),
            DocumentEdit::DeleteLine { at } => (at, -1),
            DocumentEdit::Other => return Vec::new(),
        };

        let mut moved = Vec::new();
        let breakpoints = std::mem::take(&mut self.breakpoints);
        self.breakpoints = breakpoints
            .into_iter()
            .map(|mut bp| {
                if bp.source == self.current && bp.line >= at {
                    let to = (bp.line + delta).max(1);
                    if to != bp.line {
                        moved.push(Moved { from: bp.line, to });
                        bp.line = to;
                    }
                }
                bp
            })
            .collect();
        moved
    }

    /// Breakpoint lines grouped per file, each list in ascending order.
    pub fn by_file(&self) -> BTreeMap<Source, Vec<i64>> {
        let mut files: BTreeMap<Source, Vec<i64>> = BTreeMap::new();
        for bp in &self.breakpoints {
            files.entry(bp.source.clone()).or_default().push(bp.line);
        }
        files
    }

    /// Breakpoint lines of one file, in ascending order.
    pub fn lines_for(&self, source: &Source) -> Vec<i64> {
        self.breakpoints
            .iter()
            .filter(|bp| &bp.source == source)
            .map(|bp| bp.line)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Breakpoint> {
        self.breakpoints.iter()
    }

    pub fn len(&self) -> usize {
        self.breakpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakpoints.is_empty()
    }
}
