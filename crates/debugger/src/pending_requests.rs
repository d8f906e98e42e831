//! Tracking requests that are waiting for replies
//!
//! Every request sent with a [`PendingReply`] is tracked under its sequence
//! number. An inbound message is matched against the tracked entries in two
//! ways: a response completes the entry for its `request_seq`, and an entry
//! with a wait-set is advanced by any response command or event name in the
//! set, completing once the set is empty.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::time::{Duration, Instant};

use transport::{Message, Seq};

use crate::error::ReplyError;

/// Callback invoked at most once with the outcome of a request.
pub type ReplyCallback = Box<dyn FnOnce(Result<Message, ReplyError>) + Send>;

/// A reply a caller is waiting for.
pub struct PendingReply {
    callback: ReplyCallback,
    allow_fanout: bool,
    awaiting: Option<HashSet<String>>,
    timeout: Option<Duration>,
}

impl fmt::Debug for PendingReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingReply")
            .field("allow_fanout", &self.allow_fanout)
            .field("awaiting", &self.awaiting)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl PendingReply {
    /// Wait for the response to the request, with fan-out enabled and no deadline.
    pub fn new(callback: impl FnOnce(Result<Message, ReplyError>) + Send + 'static) -> Self {
        Self {
            callback: Box::new(callback),
            allow_fanout: true,
            awaiting: None,
            timeout: None,
        }
    }

    /// Keep the messages this reply consumes away from the event dispatcher.
    pub fn without_fanout(mut self) -> Self {
        self.allow_fanout = false;
        self
    }

    /// Only complete once every named response command and event has been seen.
    ///
    /// An empty set behaves like no set at all.
    pub fn awaiting<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: HashSet<String> = names.into_iter().map(Into::into).collect();
        self.awaiting = (!names.is_empty()).then_some(names);
        self
    }

    /// Fail with [`ReplyError::Timeout`] if not completed within `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn allows_fanout(&self) -> bool {
        self.allow_fanout
    }

    pub(crate) fn complete(self, outcome: Result<Message, ReplyError>) {
        (self.callback)(outcome)
    }

    /// Whether `message` matches this reply, registered for request `seq`.
    fn claims(&self, seq: Seq, message: &Message) -> bool {
        match (&self.awaiting, message) {
            (None, Message::Response(response)) => response.request_seq == seq,
            (None, _) => false,
            (Some(awaiting), Message::Response(_) | Message::Event(_)) => {
                awaiting.contains(message.name())
            }
            (Some(_), Message::Request(_)) => false,
        }
    }

    /// Consume `message`, returning true once nothing is left to wait for.
    fn consume(&mut self, message: &Message) -> bool {
        match &mut self.awaiting {
            None => true,
            Some(awaiting) => {
                awaiting.remove(message.name());
                awaiting.is_empty()
            }
        }
    }
}

struct Entry {
    command: String,
    deadline: Option<Instant>,
    reply: PendingReply,
}

/// The effect of one inbound message on the pending replies.
#[derive(Debug, Default)]
pub(crate) struct Correlation {
    /// Whether the message may be handed to the event dispatcher.
    pub(crate) fanout: bool,
    /// Replies the message completed, in request order.
    pub(crate) completed: Vec<PendingReply>,
}

/// A reply whose deadline passed.
#[derive(Debug)]
pub(crate) struct Expired {
    pub(crate) seq: Seq,
    pub(crate) command: String,
    pub(crate) after: Duration,
    pub(crate) reply: PendingReply,
}

/// Tracker for requests waiting on replies, keyed by sequence number.
#[derive(Default)]
pub(crate) struct PendingReplies {
    entries: BTreeMap<Seq, Entry>,
}

impl PendingReplies {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Track `reply` for the request `seq`, sent at `now`.
    pub(crate) fn insert(&mut self, seq: Seq, command: &str, reply: PendingReply, now: Instant) {
        let deadline = reply.timeout.map(|timeout| now + timeout);
        let entry = Entry {
            command: command.to_string(),
            deadline,
            reply,
        };
        if let Some(previous) = self.entries.insert(seq, entry) {
            tracing::warn!(
                seq,
                command,
                previous = %previous.command,
                "duplicate sequence number, earlier reply will never complete"
            );
        }
    }

    /// Advance every entry the message matches.
    pub(crate) fn correlate(&mut self, message: &Message) -> Correlation {
        let claimed: Vec<Seq> = self
            .entries
            .iter()
            .filter(|(seq, entry)| entry.reply.claims(**seq, message))
            .map(|(seq, _)| *seq)
            .collect();

        let mut correlation = Correlation {
            fanout: true,
            completed: Vec::new(),
        };
        let rejected = matches!(message, Message::Response(r) if !r.success);

        for seq in claimed {
            let Some(entry) = self.entries.get_mut(&seq) else {
                continue;
            };
            correlation.fanout &= entry.reply.allow_fanout;
            if entry.reply.consume(message) || rejected {
                if let Some(entry) = self.entries.remove(&seq) {
                    tracing::trace!(seq, command = %entry.command, "reply complete");
                    correlation.completed.push(entry.reply);
                }
            }
        }
        correlation
    }

    /// Remove every entry whose deadline is at or before `now`.
    pub(crate) fn expire(&mut self, now: Instant) -> Vec<Expired> {
        let overdue: Vec<Seq> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.deadline.is_some_and(|deadline| deadline <= now))
            .map(|(seq, _)| *seq)
            .collect();

        overdue
            .into_iter()
            .filter_map(|seq| {
                let entry = self.entries.remove(&seq)?;
                Some(Expired {
                    seq,
                    after: entry.reply.timeout.unwrap_or_default(),
                    command: entry.command,
                    reply: entry.reply,
                })
            })
            .collect()
    }

    /// The earliest deadline of any tracked entry.
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.entries.values().filter_map(|e| e.deadline).min()
    }

    /// Drop every entry without completing it, returning how many there were.
    pub(crate) fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    pub(crate) fn contains(&self, seq: Seq) -> bool {
        self.entries.contains_key(&seq)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use transport::{Event, Response};

    use super::*;

    type Outcomes = Arc<Mutex<Vec<Result<Message, String>>>>;

    fn recording() -> (Outcomes, impl FnOnce(Result<Message, ReplyError>) + Send + 'static) {
        let outcomes: Outcomes = Arc::default();
        let sink = Arc::clone(&outcomes);
        let callback = move |outcome: Result<Message, ReplyError>| {
            sink.lock().unwrap().push(outcome.map_err(|e| e.to_string()));
        };
        (outcomes, callback)
    }

    fn response(request_seq: Seq, command: &str, success: bool) -> Message {
        Message::Response(Response {
            seq: 0,
            request_seq,
            success,
            command: command.to_string(),
            message: None,
            body: None,
        })
    }

    fn event(name: &str) -> Message {
        Message::Event(Event {
            seq: 0,
            event: name.to_string(),
            body: None,
        })
    }

    fn complete_all(correlation: Correlation, message: &Message) {
        for reply in correlation.completed {
            reply.complete(Ok(message.clone()));
        }
    }

    #[test]
    fn response_completes_its_request() {
        let (outcomes, callback) = recording();
        let mut pending = PendingReplies::new();
        pending.insert(3, "scopes", PendingReply::new(callback), Instant::now());

        let other = response(2, "scopes", true);
        let correlation = pending.correlate(&other);
        assert!(correlation.completed.is_empty());
        assert!(correlation.fanout);

        let reply = response(3, "scopes", true);
        let correlation = pending.correlate(&reply);
        assert_eq!(correlation.completed.len(), 1);
        complete_all(correlation, &reply);

        assert!(pending.is_empty());
        assert_eq!(outcomes.lock().unwrap().len(), 1);
    }

    #[test]
    fn events_do_not_complete_plain_replies() {
        let (_outcomes, callback) = recording();
        let mut pending = PendingReplies::new();
        pending.insert(1, "next", PendingReply::new(callback), Instant::now());

        let correlation = pending.correlate(&event("stopped"));
        assert!(correlation.completed.is_empty());
        assert!(pending.contains(1));
    }

    #[test]
    fn wait_set_needs_every_name() {
        let (outcomes, callback) = recording();
        let mut pending = PendingReplies::new();
        pending.insert(
            5,
            "scopes",
            PendingReply::new(callback).awaiting(["scopes", "stopped"]),
            Instant::now(),
        );

        let first = response(5, "scopes", true);
        let correlation = pending.correlate(&first);
        assert!(correlation.completed.is_empty());

        let unrelated = event("output");
        assert!(pending.correlate(&unrelated).completed.is_empty());

        let second = event("stopped");
        let correlation = pending.correlate(&second);
        complete_all(correlation, &second);

        let outcomes = outcomes.lock().unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].as_ref().map(Message::name), Ok("stopped"));
        assert_eq!(pending.len(), 0);
    }

    #[test]
    fn empty_wait_set_is_ignored() {
        let (_outcomes, callback) = recording();
        let mut pending = PendingReplies::new();
        pending.insert(
            1,
            "disconnect",
            PendingReply::new(callback).awaiting(Vec::<String>::new()),
            Instant::now(),
        );

        let correlation = pending.correlate(&response(1, "disconnect", true));
        assert_eq!(correlation.completed.len(), 1);
    }

    #[test]
    fn fanout_follows_the_claiming_reply() {
        let (_a, first) = recording();
        let (_b, second) = recording();
        let mut pending = PendingReplies::new();
        let now = Instant::now();
        pending.insert(1, "variables", PendingReply::new(first).without_fanout(), now);
        pending.insert(2, "variables", PendingReply::new(second), now);

        assert!(!pending.correlate(&response(1, "variables", true)).fanout);
        assert!(pending.correlate(&response(2, "variables", true)).fanout);
    }

    #[test]
    fn rejection_completes_a_wait_set_early() {
        let (_outcomes, callback) = recording();
        let mut pending = PendingReplies::new();
        pending.insert(
            1,
            "launch",
            PendingReply::new(callback).awaiting(["launch", "initialized"]),
            Instant::now(),
        );

        let correlation = pending.correlate(&response(1, "launch", false));
        assert_eq!(correlation.completed.len(), 1);
        assert!(pending.is_empty());
    }

    #[test]
    fn deadlines_expire() {
        let (_a, first) = recording();
        let (_b, second) = recording();
        let now = Instant::now();
        let mut pending = PendingReplies::new();
        pending.insert(
            1,
            "stackTrace",
            PendingReply::new(first).with_timeout(Duration::from_millis(10)),
            now,
        );
        pending.insert(2, "variables", PendingReply::new(second), now);

        assert_eq!(pending.next_deadline(), Some(now + Duration::from_millis(10)));
        assert!(pending.expire(now).is_empty());

        let expired = pending.expire(now + Duration::from_millis(10));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].seq, 1);
        assert_eq!(expired[0].command, "stackTrace");
        assert_eq!(expired[0].after, Duration::from_millis(10));
        assert_eq!(pending.len(), 1);
        assert_eq!(pending.next_deadline(), None);
    }

    #[test]
    fn clear_drops_without_completing() {
        let (outcomes, callback) = recording();
        let mut pending = PendingReplies::new();
        pending.insert(1, "next", PendingReply::new(callback), Instant::now());

        assert_eq!(pending.clear(), 1);
        assert!(outcomes.lock().unwrap().is_empty());
    }
}
