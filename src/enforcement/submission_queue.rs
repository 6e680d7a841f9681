//! Submission queue: the FIFO of pending tickets feeding a channel's worker pool, plus the
//! enforcement objects those workers dispatch into.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::time::Duration;

use crate::differentiation::{DiffToken, ObjectHashingDifferentiation};
use crate::options::DEFAULT_SUBMISSION_QUEUE_TIMEOUT;
use crate::result::EnforcementResult;
use crate::status::PStatus;
use crate::ticket::Ticket;
use crate::wire::ObjectStatisticsRaw;

use super::completion_queue::CompletionQueue;
use super::objects::{EnforcementObject, ObjectConfiguration};

struct ObjectSlot {
    object_id: i64,
    token: DiffToken,
    object: EnforcementObject,
}

pub struct SubmissionQueue {
    queue: Mutex<VecDeque<Ticket>>,
    not_empty: Condvar,
    timeout_dequeue: Duration,
    completion_queue: Arc<CompletionQueue>,
    is_running: AtomicBool,
    objects: RwLock<Vec<ObjectSlot>>,
    tokens: RwLock<HashMap<DiffToken, usize>>,
    diff_builder: ObjectHashingDifferentiation,
    no_match_object: EnforcementObject,
}

impl SubmissionQueue {
    pub fn new(completion_queue: Arc<CompletionQueue>) -> Self {
        Self::with_timeout(completion_queue, DEFAULT_SUBMISSION_QUEUE_TIMEOUT)
    }

    /// As [`SubmissionQueue::new`], with a caller-supplied dequeue timeout rather than the
    /// options-module default (wired from the stage's configuration file).
    pub fn with_timeout(completion_queue: Arc<CompletionQueue>, timeout_dequeue: Duration) -> Self {
        SubmissionQueue {
            queue: Mutex::new(VecDeque::new()),
            not_empty: Condvar::new(),
            timeout_dequeue,
            completion_queue,
            is_running: AtomicBool::new(true),
            objects: RwLock::new(Vec::new()),
            tokens: RwLock::new(HashMap::new()),
            diff_builder: ObjectHashingDifferentiation::new(Default::default()),
            no_match_object: EnforcementObject::new_noop(-1),
        }
    }

    pub fn size(&self) -> usize {
        self.queue.lock().expect("submission queue lock poisoned").len()
    }

    pub fn enqueue(&self, ticket: Ticket) {
        let mut queue = self.queue.lock().expect("submission queue lock poisoned");
        queue.push_back(ticket);
        self.not_empty.notify_one();
    }

    /// Synchronous path: runs enforcement inline and posts straight to the completion queue,
    /// bypassing the worker pool entirely.
    pub fn enqueue_fast_path(&self, ticket: &Ticket) -> EnforcementResult {
        self.enforce_mechanism(ticket)
    }

    /// Waits up to `timeout_dequeue` for a ticket. Returns `None` on timeout so the worker loop
    /// can re-check `is_running` and shut down promptly.
    pub fn dequeue(&self) -> Option<Ticket> {
        let mut queue = self.queue.lock().expect("submission queue lock poisoned");
        loop {
            if let Some(ticket) = queue.pop_front() {
                return Some(ticket);
            }
            let (guard, timeout_result) = self
                .not_empty
                .wait_timeout(queue, self.timeout_dequeue)
                .expect("submission queue lock poisoned");
            queue = guard;
            if timeout_result.timed_out() {
                return None;
            }
        }
    }

    fn enforce_mechanism(&self, ticket: &Ticket) -> EnforcementResult {
        let token = self.diff_builder.token(ticket.operation_type(), ticket.operation_context());
        let objects = self.objects.read().expect("submission queue lock poisoned");
        let tokens = self.tokens.read().expect("submission queue lock poisoned");

        match tokens.get(&token).and_then(|&index| objects.get(index)) {
            Some(slot) => slot.object.enforce(ticket),
            None => self.no_match_object.enforce(ticket),
        }
    }

    /// Worker thread body: pulls tickets, enforces, posts to the completion queue, loops until
    /// `stop_worker` flips `is_running`.
    pub fn run(&self) {
        while self.is_running.load(Ordering::Acquire) {
            if let Some(ticket) = self.dequeue() {
                let result = self.enforce_mechanism(&ticket);
                self.completion_queue.enqueue(result);
            }
        }
    }

    pub fn stop_worker(&self) {
        self.is_running.store(false, Ordering::Release);
        self.not_empty.notify_all();
    }

    pub fn define_object_differentiation(&self, operation_type: bool, operation_context: bool) {
        self.diff_builder.set_classifiers(operation_type, operation_context);
    }

    pub fn build_object_token(&self, operation_type: u32, operation_context: u32) -> DiffToken {
        self.diff_builder.token(operation_type, operation_context)
    }

    pub fn create_enforcement_object(
        &self,
        object_id: i64,
        operation_type: u32,
        operation_context: u32,
        object: EnforcementObject,
    ) -> PStatus {
        let token = self.build_object_token(operation_type, operation_context);

        let mut tokens = self.tokens.write().expect("submission queue lock poisoned");
        if tokens.contains_key(&token) {
            return PStatus::Error;
        }

        let mut objects = self.objects.write().expect("submission queue lock poisoned");
        let index = objects.len();
        objects.push(ObjectSlot { object_id, token, object });
        tokens.insert(token, index);
        PStatus::Ok
    }

    fn index_for_object_id(&self, object_id: i64) -> Option<usize> {
        let objects = self.objects.read().expect("submission queue lock poisoned");
        objects.iter().position(|slot| slot.object_id == object_id)
    }

    pub fn configure_enforcement_object(&self, object_id: i64, configuration: ObjectConfiguration) -> PStatus {
        match self.index_for_object_id(object_id) {
            Some(index) => {
                let objects = self.objects.read().expect("submission queue lock poisoned");
                objects[index].object.configure(configuration)
            }
            None => PStatus::NotSupported,
        }
    }

    pub fn collect_enforcement_object_statistics(&self, object_id: i64, raw: &mut ObjectStatisticsRaw) -> PStatus {
        match self.index_for_object_id(object_id) {
            Some(index) => {
                let objects = self.objects.read().expect("submission queue lock poisoned");
                objects[index].object.collect_stats(raw);
                PStatus::Ok
            }
            None => PStatus::NotSupported,
        }
    }

    pub fn objects_to_string(&self) -> String {
        let objects = self.objects.read().expect("submission queue lock poisoned");
        objects
            .iter()
            .map(|slot| slot.object.to_string_summary())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enforcement::objects::drl::RefillDiscipline;
    use crate::result::ResultStatus;

    #[test]
    fn enqueue_fast_path_falls_back_to_no_match_object() {
        let queue = SubmissionQueue::new(Arc::new(CompletionQueue::new()));
        let ticket = Ticket::new(1, 1, 4096, 7, 0);
        let result = queue.enqueue_fast_path(&ticket);
        assert_eq!(result.status(), ResultStatus::Success);
    }

    #[test]
    fn create_enforcement_object_rejects_duplicate_token() {
        let queue = SubmissionQueue::new(Arc::new(CompletionQueue::new()));
        let first = EnforcementObject::new_drl(1, RefillDiscipline::Pull);
        let second = EnforcementObject::new_drl(2, RefillDiscipline::Pull);

        assert!(matches!(queue.create_enforcement_object(1, 1, 0, first), PStatus::Ok));
        assert!(matches!(
            queue.create_enforcement_object(2, 1, 0, second),
            PStatus::Error
        ));
    }

    #[test]
    fn dispatches_to_matching_object() {
        let queue = SubmissionQueue::new(Arc::new(CompletionQueue::new()));
        let object = EnforcementObject::new_drl(1, RefillDiscipline::Pull);
        queue.create_enforcement_object(1, 5, 0, object);

        let ticket = Ticket::new(9, 1, 1, 5, 0);
        let result = queue.enqueue_fast_path(&ticket);
        assert_eq!(result.status(), ResultStatus::Success);
        assert_eq!(result.ticket_id(), 9);
    }
}
