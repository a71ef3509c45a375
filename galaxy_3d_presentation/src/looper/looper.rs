/// Single-thread event loop owned by the presentation engine
///
/// The loop combines two sources:
/// - a channel of [`EngineEvent`]s posted from any thread through [`LoopProxy`]
/// - a timer queue ordered by deadline, driven by the engine [`Clock`]
///
/// Due timers are delivered before channel messages.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;
use rustc_hash::FxHashMap;
use crate::clock::Clock;
use super::event::{EngineEvent, TimerId, TimerKind};

// ===== PROXY =====

/// Cloneable, thread-safe handle used to post events to the loop
#[derive(Debug, Clone)]
pub struct LoopProxy {
    sender: Sender<EngineEvent>,
}

impl LoopProxy {
    /// Post an event to the loop
    ///
    /// Returns false if the loop no longer exists.
    pub fn post(&self, event: EngineEvent) -> bool {
        self.sender.send(event).is_ok()
    }
}

// ===== TIMERS =====

struct TimerEntry {
    kind: TimerKind,
    /// Re-arm interval for periodic timers
    period: Option<u64>,
}

// ===== LOOPER =====

/// Event channel plus timer queue
pub struct Looper {
    sender: Sender<EngineEvent>,
    receiver: Receiver<EngineEvent>,
    clock: Arc<dyn Clock>,
    /// (deadline, id) min-heap; cancelled timers are skipped lazily
    deadlines: BinaryHeap<Reverse<(u64, TimerId)>>,
    timers: FxHashMap<TimerId, TimerEntry>,
    next_timer_id: u64,
}

impl Looper {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver,
            clock,
            deadlines: BinaryHeap::new(),
            timers: FxHashMap::default(),
            next_timer_id: 1,
        }
    }

    /// Create a proxy for posting events from other threads
    pub fn proxy(&self) -> LoopProxy {
        LoopProxy { sender: self.sender.clone() }
    }

    /// Current loop time in microseconds
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Post an event from the loop thread itself
    pub fn post(&self, event: EngineEvent) {
        // the receiver lives in self, so sending cannot fail
        let _ = self.sender.send(event);
    }

    /// Arm a one-shot timer firing after `delay` microseconds
    pub fn schedule(&mut self, delay: u64, kind: TimerKind) -> TimerId {
        self.insert_timer(delay, kind, None)
    }

    /// Arm a periodic timer firing every `period` microseconds
    pub fn schedule_periodic(&mut self, period: u64, kind: TimerKind) -> TimerId {
        self.insert_timer(period, kind, Some(period))
    }

    /// Cancel a timer; returns false if it already fired or was cancelled
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.timers.remove(&id).is_some()
    }

    /// Whether a timer is still armed
    pub fn is_scheduled(&self, id: TimerId) -> bool {
        self.timers.contains_key(&id)
    }

    /// Number of armed timers
    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }

    /// Next due timer or queued message, without blocking
    pub fn next_event(&mut self) -> Option<EngineEvent> {
        if let Some(event) = self.pop_due_timer() {
            return Some(event);
        }
        self.receiver.try_recv().ok()
    }

    /// Next event, blocking up to `timeout`
    ///
    /// Sleeps no longer than the nearest timer deadline.
    pub fn wait_event(&mut self, timeout: Duration) -> Option<EngineEvent> {
        if let Some(event) = self.next_event() {
            return Some(event);
        }

        let wait = match self.next_deadline() {
            Some(deadline) => {
                let until = Duration::from_micros(deadline.saturating_sub(self.now()));
                until.min(timeout)
            }
            None => timeout,
        };

        match self.receiver.recv_timeout(wait) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                self.pop_due_timer()
            }
        }
    }

    fn insert_timer(&mut self, delay: u64, kind: TimerKind, period: Option<u64>) -> TimerId {
        let id = TimerId(self.next_timer_id);
        self.next_timer_id += 1;

        let deadline = self.now().saturating_add(delay);
        self.deadlines.push(Reverse((deadline, id)));
        self.timers.insert(id, TimerEntry { kind, period });
        id
    }

    fn next_deadline(&mut self) -> Option<u64> {
        while let Some(Reverse((deadline, id))) = self.deadlines.peek().copied() {
            if self.timers.contains_key(&id) {
                return Some(deadline);
            }
            self.deadlines.pop();
        }
        None
    }

    fn pop_due_timer(&mut self) -> Option<EngineEvent> {
        let now = self.now();
        while let Some(Reverse((deadline, id))) = self.deadlines.peek().copied() {
            if deadline > now {
                return None;
            }
            self.deadlines.pop();

            let Some(entry) = self.timers.get(&id) else {
                continue;
            };

            let kind = entry.kind;
            match entry.period {
                Some(period) => {
                    self.deadlines.push(Reverse((now.saturating_add(period.max(1)), id)));
                }
                None => {
                    self.timers.remove(&id);
                }
            }
            return Some(EngineEvent::Timer { id, kind });
        }
        None
    }
}
