//! Completion queue: where a channel's worker threads post results and where
//! `channel_enforce` blocks to collect them back, keyed by ticket id.

use std::collections::HashMap;
use std::sync::{Condvar, Mutex};

use crate::result::EnforcementResult;

#[derive(Default)]
struct Inner {
    ready: HashMap<u64, EnforcementResult>,
}

pub struct CompletionQueue {
    inner: Mutex<Inner>,
    posted: Condvar,
}

impl CompletionQueue {
    pub fn new() -> Self {
        CompletionQueue {
            inner: Mutex::new(Inner::default()),
            posted: Condvar::new(),
        }
    }

    pub fn enqueue(&self, result: EnforcementResult) {
        let ticket_id = result.ticket_id();
        let mut inner = self.inner.lock().expect("completion queue lock poisoned");
        inner.ready.insert(ticket_id, result);
        self.posted.notify_all();
    }

    /// Blocks until `ticket_id`'s result has been posted, then removes and returns it.
    pub fn dequeue(&self, ticket_id: u64) -> EnforcementResult {
        let mut inner = self.inner.lock().expect("completion queue lock poisoned");
        loop {
            if let Some(result) = inner.ready.remove(&ticket_id) {
                return result;
            }
            inner = self.posted.wait(inner).expect("completion queue lock poisoned");
        }
    }

    pub fn pending(&self) -> usize {
        self.inner.lock().expect("completion queue lock poisoned").ready.len()
    }
}

impl Default for CompletionQueue {
    fn default() -> Self {
        CompletionQueue::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ResultStatus;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn dequeue_blocks_until_enqueue() {
        let queue = Arc::new(CompletionQueue::new());
        let worker_queue = Arc::clone(&queue);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            let mut result = EnforcementResult::new(ResultStatus::Success);
            result.set_ticket_id(42);
            worker_queue.enqueue(result);
        });

        let result = queue.dequeue(42);
        assert!(result.is_success());
        handle.join().unwrap();
    }
}
