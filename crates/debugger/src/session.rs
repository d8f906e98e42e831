//! Debug session orchestration
//!
//! A [`Session`] drives one debug adapter through its lifecycle:
//!
//! ```text
//! start ─▶ initialize ─▶ launch ─▶ (setBreakpoints)* ─▶ configurationDone ─▶ running
//!                                                                             │  ▲
//!                     stopped: stackTrace ─▶ scopes ─▶ variables ◀────────────┘  │
//!                                                           next / continue ─────┘
//! stop / terminated ─▶ disconnect ─▶ idle
//! ```
//!
//! The connection's dispatchers never touch the session directly. Their
//! listeners, the close listener and reply callbacks all push triggers onto
//! a channel, and the session applies the queued triggers after every
//! inbound message, so each message is handled to completion in arrival
//! order.

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use transport::{
    Event, FrameCodec, Message, Request, RequestBuilder, Response,
    io::{Transport, TransportEvent},
    types::{
        OutputEventBody, ScopesResponse, Source, StackTraceResponse, StoppedEventBody,
        ThreadEventBody, ThreadId, VariablesReference, VariablesResponse,
    },
};

use crate::actions::{Action, ActionKind};
use crate::breakpoints::{BreakpointSet, DocumentEdit, Toggled};
use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::dispatcher::{ActionDispatcher, Category};
use crate::error::ReplyError;
use crate::pending_requests::PendingReply;
use crate::renderer::{Renderer, ToolboxState};
use crate::threads::ThreadTracker;

/// How long the run loop waits for input when no reply has a deadline.
const IDLE_POLL: Duration = Duration::from_millis(250);

const EVENTS: [&str; 6] = [
    "initialized",
    "stopped",
    "continued",
    "thread",
    "output",
    "terminated",
];

const RESPONSES: [&str; 6] = [
    "initialize",
    "setBreakpoints",
    "stackTrace",
    "scopes",
    "variables",
    "disconnect",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session; waiting for a start action
    Idle,
    /// `initialize` sent
    Initializing,
    /// `launch` sent, waiting for the adapter's `initialized` event
    Launching,
    /// Breakpoints sent, `configurationDone` follows the last reply
    Configuring { pending_breakpoints: usize },
    /// The debuggee is running
    Running,
    /// The debuggee is paused
    Stopped,
    /// `disconnect` sent
    Disconnecting,
    /// `disconnect` sent, `initialize` follows its reply
    Restarting,
}

impl SessionState {
    /// Configuration is done and the debuggee is running or paused.
    pub fn is_live(self) -> bool {
        matches!(self, SessionState::Running | SessionState::Stopped)
    }

    /// Breakpoint changes go straight to the adapter. Before configuration
    /// the whole set is sent once `initialized` arrives.
    pub fn syncs_breakpoints(self) -> bool {
        self.is_live() || matches!(self, SessionState::Configuring { .. })
    }
}

/// Work queued for the session by listeners and reply callbacks.
#[derive(Debug)]
enum Trigger {
    Message(Message),
    Action(Action),
    Restarted(Result<(), ReplyError>),
    NestedVariables {
        reference: VariablesReference,
        outcome: Result<Message, ReplyError>,
    },
    ReplyFailed(ReplyError),
    Closed,
}

#[derive(Debug)]
enum Command {
    Dispatch(Action),
    ChangeFile(Source),
    Edit(DocumentEdit),
    Shutdown,
}

/// Feeds a [`Session`] running on another thread.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: Sender<Command>,
}

impl SessionHandle {
    /// Returns false once the session has shut down.
    pub fn dispatch(&self, action: Action) -> bool {
        self.send(Command::Dispatch(action))
    }

    pub fn change_file(&self, source: Source) -> bool {
        self.send(Command::ChangeFile(source))
    }

    pub fn document_edited(&self, edit: DocumentEdit) -> bool {
        self.send(Command::Edit(edit))
    }

    /// Ask [`Session::run`] to close the connection and return.
    pub fn shutdown(&self) -> bool {
        self.send(Command::Shutdown)
    }

    fn send(&self, command: Command) -> bool {
        self.commands.send(command).is_ok()
    }
}

/// One debug session against one adapter connection.
pub struct Session<T, R> {
    connection: Connection<T>,
    requests: RequestBuilder,
    breakpoints: BreakpointSet,
    threads: ThreadTracker,
    renderer: R,
    actions: ActionDispatcher,
    config: ClientConfig,
    state: SessionState,
    connected: bool,
    disconnect_requested: bool,
    triggers: Receiver<Trigger>,
    trigger_tx: Sender<Trigger>,
    commands: Receiver<Command>,
    command_tx: Sender<Command>,
}

fn forward(tx: &Sender<Trigger>, trigger: Trigger) -> eyre::Result<()> {
    tx.send(trigger)
        .map_err(|_| eyre::eyre!("session dropped its trigger queue"))
}

fn decode<B>(name: &str, decoded: Result<B, serde_json::Error>) -> Option<B> {
    decoded
        .inspect_err(|e| tracing::warn!(%name, error = %e, "unexpected message body"))
        .ok()
}

impl<T, R> Session<T, R>
where
    T: Transport,
    R: Renderer,
{
    pub fn new(transport: T, renderer: R, config: ClientConfig, current_file: Source) -> Self {
        let (trigger_tx, triggers) = crossbeam_channel::unbounded();
        let (command_tx, commands) = crossbeam_channel::unbounded();

        let codec = FrameCodec::with_max_size(config.max_message_size);
        let mut connection = Connection::with_codec(transport, codec);
        for (category, names) in [(Category::Event, EVENTS), (Category::Response, RESPONSES)] {
            for name in names {
                let tx = trigger_tx.clone();
                connection.events().on(category, name, move |message| {
                    forward(&tx, Trigger::Message(message.clone()))
                });
            }
        }
        let tx = trigger_tx.clone();
        connection.on_close(move || {
            let _ = tx.send(Trigger::Closed);
        });

        let mut actions = ActionDispatcher::new();
        for kind in ActionKind::ALL {
            let tx = trigger_tx.clone();
            actions.on(kind, move |action| {
                forward(&tx, Trigger::Action(action.clone()))
            });
        }

        Self {
            connection,
            requests: RequestBuilder::new(),
            breakpoints: BreakpointSet::new(current_file),
            threads: ThreadTracker::new(),
            renderer,
            actions,
            config,
            state: SessionState::Idle,
            connected: false,
            disconnect_requested: false,
            triggers,
            trigger_tx,
            commands,
            command_tx,
        }
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            commands: self.command_tx.clone(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether an adapter session is active, from `initialize` until its
    /// `disconnect` completes.
    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn disconnect_requested(&self) -> bool {
        self.disconnect_requested
    }

    pub fn breakpoints(&self) -> &BreakpointSet {
        &self.breakpoints
    }

    pub fn threads(&self) -> &ThreadTracker {
        &self.threads
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn connection(&self) -> &Connection<T> {
        &self.connection
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Process commands and transport reads until [`SessionHandle::shutdown`].
    #[tracing::instrument(skip(self))]
    pub fn run(&mut self) {
        let commands = self.commands.clone();
        loop {
            let inbound = self
                .connection
                .inbound()
                .unwrap_or_else(crossbeam_channel::never);
            let timeout = self
                .connection
                .next_deadline()
                .map_or(IDLE_POLL, |deadline| {
                    deadline.saturating_duration_since(Instant::now())
                });

            let keep_going = crossbeam_channel::select! {
                recv(commands) -> command => match command {
                    Ok(Command::Shutdown) | Err(_) => false,
                    Ok(command) => {
                        self.apply_command(command);
                        true
                    }
                },
                recv(inbound) -> event => {
                    self.handle_transport_event(event.unwrap_or(TransportEvent::Closed));
                    true
                },
                default(timeout) => true,
            };
            if !keep_going {
                tracing::debug!("shutting down session");
                break;
            }
            self.expire_replies(Instant::now());
        }
        self.close();
    }

    /// Handle every transport read already received, without blocking.
    pub fn poll(&mut self) -> usize {
        let Some(inbound) = self.connection.inbound() else {
            return 0;
        };
        let mut handled = 0;
        while let Ok(event) = inbound.try_recv() {
            self.handle_transport_event(event);
            handled += 1;
            if !self.connection.is_connected() {
                break;
            }
        }
        self.expire_replies(Instant::now());
        handled
    }

    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Data(chunk) => {
                self.connection.feed(&chunk);
                while let Some(message) = self.connection.next_message() {
                    self.connection.handle_message(message);
                    self.drain();
                }
            }
            TransportEvent::Closed => {
                self.connection.closed_by_peer();
                self.drain();
            }
        }
    }

    /// Fail overdue replies as of `now`.
    pub fn expire_replies(&mut self, now: Instant) {
        if self.connection.expire(now) > 0 {
            self.drain();
        }
    }

    /// Run an action through the action dispatcher.
    pub fn dispatch(&mut self, action: Action) {
        self.actions.emit(&action);
        self.drain();
    }

    /// Make `source` the file breakpoint toggles and edits apply to.
    pub fn change_file(&mut self, source: Source) {
        self.breakpoints.change_current_file(source.clone());
        self.renderer.file_changed(&source);
        for line in self.breakpoints.lines_for(&source) {
            self.renderer.breakpoint_drawn(&source, line);
        }
    }

    /// Move the active file's breakpoints along with an edit.
    pub fn document_edited(&mut self, edit: DocumentEdit) {
        let moved = self.breakpoints.on_document_edit(edit);
        if moved.is_empty() {
            return;
        }
        let source = self.breakpoints.current_file().clone();
        for m in &moved {
            self.renderer.breakpoint_removed(&source, m.from);
        }
        for m in &moved {
            self.renderer.breakpoint_drawn(&source, m.to);
        }
        if self.state.syncs_breakpoints() {
            self.sync_breakpoints(&source);
        }
    }

    /// Close the connection; the session returns to idle.
    pub fn close(&mut self) {
        self.connection.close();
        self.drain();
    }

    fn apply_command(&mut self, command: Command) {
        match command {
            Command::Dispatch(action) => self.dispatch(action),
            Command::ChangeFile(source) => self.change_file(source),
            Command::Edit(edit) => self.document_edited(edit),
            Command::Shutdown => {}
        }
    }

    fn drain(&mut self) {
        while let Ok(trigger) = self.triggers.try_recv() {
            self.apply(trigger);
        }
    }

    fn apply(&mut self, trigger: Trigger) {
        tracing::trace!(?trigger, state = ?self.state, "applying trigger");
        match trigger {
            Trigger::Message(Message::Event(event)) => self.on_event(event),
            Trigger::Message(Message::Response(response)) => self.on_response(response),
            Trigger::Message(Message::Request(_)) => {}
            Trigger::Action(action) => self.on_action(action),
            Trigger::Restarted(outcome) => self.on_restarted(outcome),
            Trigger::NestedVariables { reference, outcome } => {
                self.on_nested_variables(reference, outcome)
            }
            Trigger::ReplyFailed(error) => self.on_reply_failed(error),
            Trigger::Closed => {
                tracing::debug!(state = ?self.state, "connection closed");
                self.end_session();
            }
        }
    }

    /// A reply that reports failure back to the session.
    fn watch(&self) -> PendingReply {
        let tx = self.trigger_tx.clone();
        self.with_deadline(PendingReply::new(move |outcome| {
            if let Err(error) = outcome {
                let _ = tx.send(Trigger::ReplyFailed(error));
            }
        }))
    }

    fn with_deadline(&self, reply: PendingReply) -> PendingReply {
        match self.config.reply_timeout() {
            Some(timeout) => reply.with_timeout(timeout),
            None => reply,
        }
    }

    fn send(&mut self, request: Request) -> bool {
        let reply = self.watch();
        self.connection.send(request, Some(reply))
    }

    fn on_action(&mut self, action: Action) {
        tracing::debug!(?action, state = ?self.state, "action");
        match action {
            Action::Start => self.start(),
            Action::Stop => self.stop(),
            Action::StepOver => self.resume(RequestBuilder::next),
            Action::Continue => self.resume(RequestBuilder::r#continue),
            Action::Restart => self.restart(),
            Action::Breakpoint { line } => self.toggle_breakpoint(line),
            Action::OpenVariable { reference } => self.open_variable(reference),
            Action::CloseVariable { reference } => {
                self.renderer.remove_nested_variables(reference)
            }
        }
    }

    fn start(&mut self) {
        if self.state != SessionState::Idle {
            tracing::debug!(state = ?self.state, "session already active");
            return;
        }
        if !self.connection.is_connected() {
            if let Err(e) = self.connection.connect() {
                self.renderer
                    .show_error(&format!("could not connect to the debug adapter: {e}"));
                return;
            }
            // sequence numbers are per connection
            self.requests = RequestBuilder::new();
        }

        let request = self.requests.initialize(&self.config.initialize_arguments());
        if self.send(request) {
            self.state = SessionState::Initializing;
            self.connected = true;
            self.disconnect_requested = false;
        }
    }

    fn stop(&mut self) {
        if self.state == SessionState::Idle || self.disconnect_requested {
            tracing::debug!(state = ?self.state, "nothing to stop");
            return;
        }
        self.disconnect();
    }

    fn disconnect(&mut self) {
        let request = self.requests.disconnect();
        if self.send(request) {
            self.disconnect_requested = true;
            self.state = SessionState::Disconnecting;
        }
    }

    fn resume(&mut self, build: fn(&mut RequestBuilder, ThreadId) -> Request) {
        if !self.state.is_live() {
            tracing::debug!(state = ?self.state, "debuggee is not running");
            return;
        }
        let request = build(&mut self.requests, self.threads.current_thread_id());
        if self.send(request) {
            self.state = SessionState::Running;
        }
    }

    fn restart(&mut self) {
        match self.state {
            SessionState::Idle => return self.start(),
            SessionState::Restarting => {
                tracing::debug!("restart already in progress");
                return;
            }
            _ => {}
        }

        let tx = self.trigger_tx.clone();
        let reply = self.with_deadline(
            PendingReply::new(move |outcome| {
                let _ = tx.send(Trigger::Restarted(outcome.map(drop)));
            })
            .without_fanout(),
        );
        let request = self.requests.disconnect();
        if self.connection.send(request, Some(reply)) {
            self.disconnect_requested = true;
            self.state = SessionState::Restarting;
        }
    }

    fn on_restarted(&mut self, outcome: Result<(), ReplyError>) {
        self.end_session();
        match outcome {
            Ok(()) => {
                tracing::debug!("adapter disconnected, initializing again");
                self.start();
            }
            Err(e) => self.renderer.show_error(&format!("restart failed: {e}")),
        }
    }

    fn toggle_breakpoint(&mut self, line: i64) {
        let source = self.breakpoints.current_file().clone();
        match self.breakpoints.toggle(line) {
            Toggled::Added => self.renderer.breakpoint_drawn(&source, line),
            Toggled::Removed => self.renderer.breakpoint_removed(&source, line),
        }
        if self.state.syncs_breakpoints() {
            self.sync_breakpoints(&source);
        }
    }

    /// Replace the adapter's breakpoints for `source`. The reply does not count
    /// towards configuration.
    fn sync_breakpoints(&mut self, source: &Source) {
        let lines = self.breakpoints.lines_for(source);
        let request = self.requests.set_breakpoints(source, &lines);
        let reply = self.watch().without_fanout();
        self.connection.send(request, Some(reply));
    }

    fn open_variable(&mut self, reference: VariablesReference) {
        if !self.connected {
            tracing::debug!(reference, "no session to expand variables in");
            return;
        }
        let tx = self.trigger_tx.clone();
        let reply = self.with_deadline(
            PendingReply::new(move |outcome| {
                let _ = tx.send(Trigger::NestedVariables { reference, outcome });
            })
            .without_fanout(),
        );
        let request = self.requests.variables(reference);
        self.connection.send(request, Some(reply));
    }

    fn on_nested_variables(
        &mut self,
        reference: VariablesReference,
        outcome: Result<Message, ReplyError>,
    ) {
        let body = match outcome {
            Ok(Message::Response(response)) => response
                .decode_body::<VariablesResponse>()
                .map_err(ReplyError::from),
            Ok(other) => {
                tracing::warn!(name = other.name(), "unexpected reply to variables request");
                return;
            }
            Err(e) => Err(e),
        };
        match body {
            Ok(body) => self
                .renderer
                .render_nested_variables(reference, &body.variables),
            Err(e) => {
                tracing::warn!(reference, error = %e, "expanding variable");
                self.renderer
                    .show_error(&format!("could not expand variable {reference}: {e}"));
            }
        }
    }

    fn on_event(&mut self, event: Event) {
        match event.event.as_str() {
            "initialized" => self.configure(),
            "stopped" => {
                if let Some(body) = decode("stopped", event.decode_body::<StoppedEventBody>()) {
                    if let Some(thread_id) = body.thread_id {
                        self.threads.add_thread(thread_id, body.reason);
                    }
                }
                if self.state == SessionState::Running {
                    self.state = SessionState::Stopped;
                }
                let request = self.requests.stack_trace(self.threads.current_thread_id());
                self.send(request);
            }
            "continued" => {
                if self.state == SessionState::Stopped {
                    self.state = SessionState::Running;
                }
            }
            "thread" => {
                if let Some(body) = decode("thread", event.decode_body::<ThreadEventBody>()) {
                    self.threads.add_thread(body.thread_id, body.reason);
                }
            }
            "output" => {
                if let Some(body) = decode("output", event.decode_body::<OutputEventBody>()) {
                    self.renderer.output(body.category.as_deref(), &body.output);
                }
            }
            "terminated" => {
                if self.disconnect_requested || !self.connected {
                    tracing::debug!("adapter terminated, disconnect already requested");
                    return;
                }
                self.disconnect();
            }
            other => tracing::trace!(event = other, "unhandled event"),
        }
    }

    /// Install breakpoints, or finish configuration when there are none.
    fn configure(&mut self) {
        if self.breakpoints.is_empty() {
            self.configuration_done();
            return;
        }

        let mut sent = 0;
        for (source, lines) in self.breakpoints.by_file() {
            let request = self.requests.set_breakpoints(&source, &lines);
            if self.send(request) {
                sent += 1;
            }
        }
        if sent > 0 {
            self.state = SessionState::Configuring {
                pending_breakpoints: sent,
            };
        }
    }

    fn configuration_done(&mut self) {
        let request = self.requests.configuration_done();
        if self.send(request) {
            self.state = SessionState::Running;
        }
    }

    fn breakpoints_installed(&mut self) {
        let SessionState::Configuring {
            pending_breakpoints,
        } = self.state
        else {
            tracing::debug!(state = ?self.state, "breakpoints updated outside configuration");
            return;
        };
        match pending_breakpoints.saturating_sub(1) {
            0 => self.configuration_done(),
            remaining => {
                self.state = SessionState::Configuring {
                    pending_breakpoints: remaining,
                }
            }
        }
    }

    fn on_response(&mut self, response: Response) {
        match response.command.as_str() {
            "initialize" => {
                if self.state != SessionState::Initializing {
                    tracing::debug!(state = ?self.state, "ignoring late initialize response");
                    return;
                }
                let request = self.requests.launch(self.config.launch.clone());
                if self.send(request) {
                    self.state = SessionState::Launching;
                }
                self.renderer.update_toolbox(ToolboxState::Started);
            }
            "setBreakpoints" => self.breakpoints_installed(),
            "stackTrace" => {
                let Some(body) = decode("stackTrace", response.decode_body::<StackTraceResponse>())
                else {
                    return;
                };
                self.renderer.render_stack_frames(&body.stack_frames);
                if let Some(frame) = body.stack_frames.first() {
                    self.renderer.render_stop_line(Some(frame.line));
                    let request = self.requests.scopes(frame.id);
                    self.send(request);
                }
            }
            "scopes" => {
                let Some(body) = decode("scopes", response.decode_body::<ScopesResponse>()) else {
                    return;
                };
                if let Some(scope) = body.scopes.first() {
                    let request = self.requests.variables(scope.variables_reference);
                    self.send(request);
                }
            }
            "variables" => {
                if let Some(body) = decode("variables", response.decode_body::<VariablesResponse>())
                {
                    self.renderer.render_variables(&body.variables);
                }
            }
            "disconnect" => self.end_session(),
            other => tracing::trace!(command = other, "unhandled response"),
        }
    }

    fn on_reply_failed(&mut self, error: ReplyError) {
        tracing::warn!(error = %error, state = ?self.state, "request failed");
        self.renderer.show_error(&error.to_string());

        match (&error, self.state) {
            // configuration goes ahead without the breakpoints the adapter refused
            (ReplyError::Rejected { command, .. }, SessionState::Configuring { .. })
                if command == "setBreakpoints" =>
            {
                self.breakpoints_installed()
            }
            (ReplyError::Rejected { command, .. }, SessionState::Disconnecting)
                if command == "disconnect" =>
            {
                self.disconnect_requested = false;
            }
            (
                ReplyError::Timeout { .. },
                SessionState::Initializing
                | SessionState::Launching
                | SessionState::Configuring { .. }
                | SessionState::Disconnecting
                | SessionState::Restarting,
            ) => self.end_session(),
            _ => {}
        }
    }

    /// Forget the adapter session and reset the views.
    fn end_session(&mut self) {
        self.connected = false;
        self.disconnect_requested = false;
        self.threads.reset();
        self.renderer.clear();
        self.renderer.update_toolbox(ToolboxState::Stopped);
        self.state = SessionState::Idle;
    }
}
