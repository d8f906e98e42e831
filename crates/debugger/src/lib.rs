//! Session layer of the debug adapter protocol client
//!
//! [`Connection`] correlates adapter replies with outstanding requests and
//! fans events out to listeners. [`Session`] drives the debug lifecycle on
//! top of it, keeping breakpoints and threads and reporting to a
//! [`Renderer`].
mod actions;
mod breakpoints;
mod config;
mod connection;
mod dispatcher;
mod error;
mod pending_requests;
mod renderer;
mod session;
mod shortcuts;
mod threads;

pub use actions::{Action, ActionKind};
pub use breakpoints::{Breakpoint, BreakpointSet, DocumentEdit, Moved, Toggled};
pub use config::ClientConfig;
pub use connection::Connection;
pub use dispatcher::{ActionDispatcher, Category, EventDispatcher, Listener, Listeners};
pub use error::{ReplyError, ShortcutError};
pub use pending_requests::{PendingReply, ReplyCallback};
pub use renderer::{NullRenderer, Renderer, ToolboxState};
pub use session::{Session, SessionHandle, SessionState};
pub use shortcuts::{KeyChord, KeyPress, ShortcutMap};
pub use threads::{NO_THREAD, ThreadRecord, ThreadTracker};
