use transport::types::ThreadId;

/// Reported when no thread has been seen yet.
pub const NO_THREAD: ThreadId = -1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadRecord {
    pub id: ThreadId,
    pub reason: String,
}

/// Threads reported by the adapter, most recent last.
///
/// The most recently reported thread is the one stepping commands target.
#[derive(Debug, Default)]
pub struct ThreadTracker {
    threads: Vec<ThreadRecord>,
}

impl ThreadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id`, replacing any earlier record for it, as the current thread.
    pub fn add_thread(&mut self, id: ThreadId, reason: impl Into<String>) {
        self.threads.retain(|t| t.id != id);
        self.threads.push(ThreadRecord {
            id,
            reason: reason.into(),
        });
    }

    pub fn current_thread_id(&self) -> ThreadId {
        self.current().map_or(NO_THREAD, |t| t.id)
    }

    pub fn current(&self) -> Option<&ThreadRecord> {
        self.threads.last()
    }

    pub fn threads(&self) -> &[ThreadRecord] {
        &self.threads
    }

    pub fn reset(&mut self) {
        self.threads.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tracker_has_no_current_thread() {
        assert_eq!(ThreadTracker::new().current_thread_id(), NO_THREAD);
    }

    #[test]
    fn readding_makes_a_thread_current() {
        let mut tracker = ThreadTracker::new();
        tracker.add_thread(1, "started");
        tracker.add_thread(2, "started");
        tracker.add_thread(1, "started");

        assert_eq!(tracker.current_thread_id(), 1);
        assert_eq!(tracker.threads().len(), 2);
    }

    #[test]
    fn latest_reason_wins() {
        let mut tracker = ThreadTracker::new();
        tracker.add_thread(4, "started");
        tracker.add_thread(4, "exited");

        assert_eq!(
            tracker.current(),
            Some(&ThreadRecord {
                id: 4,
                reason: "exited".to_string()
            })
        );
    }

    #[test]
    fn reset_forgets_everything() {
        let mut tracker = ThreadTracker::new();
        tracker.add_thread(4, "started");
        tracker.reset();

        assert_eq!(tracker.current_thread_id(), NO_THREAD);
        assert!(tracker.threads().is_empty());
    }
}
