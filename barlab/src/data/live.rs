use crate::data::{BarFeed, FeedEvent, FeedParams, FeedPoll};
use parking_lot::{Condvar, Mutex};
use smol_str::SmolStr;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct QueueState {
    items: VecDeque<FeedEvent>,
    closed: bool,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<QueueState>,
    available: Condvar,
}

/// Producer handle onto a [`LiveBarQueue`].
///
/// Handles are cheap to clone and safe to use from source I/O threads; the
/// queue is the only synchronisation point between a live source and the
/// engine thread.
#[derive(Debug, Clone)]
pub struct LiveBarHandle {
    shared: Arc<Shared>,
}

impl LiveBarHandle {
    pub fn push(&self, event: FeedEvent) {
        let mut state = self.shared.state.lock();
        if state.closed {
            return;
        }
        state.items.push_back(event);
        self.shared.available.notify_one();
    }

    /// Mark the stream finished; the engine sees the feed exhausted once
    /// the queue drains.
    pub fn close(&self) {
        let mut state = self.shared.state.lock();
        state.closed = true;
        self.shared.available.notify_all();
    }
}

/// Thread-safe FIFO of bar events between live sources and the engine.
#[derive(Debug, Default)]
pub struct LiveBarQueue {
    shared: Arc<Shared>,
}

impl LiveBarQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> LiveBarHandle {
        LiveBarHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Pop the next event, waiting up to `timeout`.
    ///
    /// `None` means either the queue is closed and drained, or nothing
    /// arrived in time.
    pub fn pop(&self, timeout: Duration) -> Option<FeedEvent> {
        let mut state = self.shared.state.lock();
        loop {
            if let Some(event) = state.items.pop_front() {
                return Some(event);
            }
            if state.closed {
                return None;
            }
            if self
                .shared
                .available
                .wait_for(&mut state, timeout)
                .timed_out()
            {
                return state.items.pop_front();
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        let state = self.shared.state.lock();
        state.closed && state.items.is_empty()
    }
}

/// Feed draining a [`LiveBarQueue`] on the engine thread.
///
/// After dequeue the event is owned exclusively by the engine; sources
/// never touch bars again once pushed.
#[derive(Debug)]
pub struct LiveFeed {
    name: SmolStr,
    params: FeedParams,
    queue: LiveBarQueue,
    poll_timeout: Duration,
}

impl LiveFeed {
    pub fn new(name: impl Into<SmolStr>, queue: LiveBarQueue) -> Self {
        Self {
            name: name.into(),
            params: FeedParams::default(),
            queue,
            poll_timeout: Duration::from_millis(50),
        }
    }

    pub fn with_params(mut self, params: FeedParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }
}

impl BarFeed for LiveFeed {
    fn name(&self) -> &str {
        &self.name
    }

    fn params(&self) -> &FeedParams {
        &self.params
    }

    fn next(&mut self) -> FeedPoll {
        match self.queue.pop(self.poll_timeout) {
            Some(event) => FeedPoll::Event(event),
            None if self.queue.is_closed() => FeedPoll::Finished,
            None => FeedPoll::Pending,
        }
    }

    fn is_live(&self) -> bool {
        true
    }
}
