use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::engine::Server;
use crate::shred::task::{TaskHandle, TaskId, Value};

/*
Events
======

An event is a rendezvous point. A shred parks on it by returning
`Suspension::Await(event)`; someone else releases it:

    signal(value)      wakes the longest-waiting shred, if any
    broadcast(value)   wakes every shred that was waiting when the call began

Woken shreds run synchronously inside the call, receiving `value`, so a
signal sent from a shred during tick N is handled during tick N.

A shred woken by a broadcast may immediately await the same event again.
Each waiter remembers the broadcast epoch it joined in; a broadcast only
wakes waiters from epochs up to its own, so re-joiners wait for the next
broadcast instead of looping forever.
*/

struct Waiter {
    task: TaskHandle,
    epoch: u64,
}

pub(crate) struct EventInner {
    waiters: RefCell<VecDeque<Waiter>>,
    epoch: Cell<u64>,
}

impl EventInner {
    pub(crate) fn remove(&self, id: TaskId) {
        self.waiters.borrow_mut().retain(|waiter| waiter.task.id() != id);
    }
}

/// FIFO wait list of parked shreds. Cloning shares the same event.
#[derive(Clone)]
pub struct Event(Rc<EventInner>);

impl Event {
    pub fn new() -> Self {
        Event(Rc::new(EventInner {
            waiters: RefCell::new(VecDeque::new()),
            epoch: Cell::new(0),
        }))
    }

    /// Number of shreds currently parked here.
    pub fn len(&self) -> usize {
        self.0.waiters.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ptr_eq(&self, other: &Event) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Park `task` at the back of the queue.
    pub(crate) fn wait(&self, task: TaskHandle) {
        task.park_on(Rc::downgrade(&self.0));
        self.0.waiters.borrow_mut().push_back(Waiter {
            task,
            epoch: self.0.epoch.get(),
        });
    }

    fn pop_live(&self, max_epoch: Option<u64>) -> Option<TaskHandle> {
        let mut waiters = self.0.waiters.borrow_mut();
        loop {
            let front = waiters.front()?;
            if max_epoch.is_some_and(|max| front.epoch > max) {
                return None;
            }
            let waiter = waiters.pop_front()?;
            if !waiter.task.is_terminated() {
                waiter.task.unpark();
                return Some(waiter.task);
            }
        }
    }

    /// Wake the longest-waiting shred with `value`. Returns whether one woke.
    pub fn signal(&self, server: &Server, value: impl Into<Value>) -> bool {
        let Some(task) = self.pop_live(None) else {
            return false;
        };
        server.resume_task(&task, Some(value.into()));
        true
    }

    /// Wake every shred that was waiting when the call began. Returns how
    /// many woke.
    pub fn broadcast(&self, server: &Server, value: impl Into<Value>) -> usize {
        let cutoff = self.0.epoch.get();
        self.0.epoch.set(cutoff + 1);

        let value = value.into();
        let mut woken = 0;
        while let Some(task) = self.pop_live(Some(cutoff)) {
            server.resume_task(&task, Some(value.clone()));
            woken += 1;
        }
        woken
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event").field("waiting", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ServerConfig;
    use crate::shred::task::{self, TaskState};
    use crate::shred::Suspension;

    type Log = Rc<RefCell<Vec<(&'static str, Value)>>>;

    fn server() -> Server {
        Server::new(ServerConfig::new().channels(1)).unwrap()
    }

    /// Awaits `event` forever, logging every wake-up value.
    fn listener(log: &Log, name: &'static str, event: &Event) -> impl task::Task {
        let (log, event) = (Rc::clone(log), event.clone());
        task::from_fn(move |_, wake| {
            if let Some(value) = wake {
                log.borrow_mut().push((name, value));
            }
            Ok(Suspension::Await(event.clone()))
        })
    }

    #[test]
    fn signal_wakes_in_arrival_order() {
        let server = server();
        let event = Event::new();
        let log = Log::default();
        for name in ["t1", "t2", "t3"] {
            server.spork(listener(&log, name, &event));
        }
        server.tick();
        assert_eq!(event.len(), 3);

        assert!(event.signal(&server, 1));
        assert_eq!(*log.borrow(), vec![("t1", Value::Int(1))]);
        // t1 re-awaited, so it is now behind t2 and t3.
        assert_eq!(event.len(), 3);

        event.signal(&server, 2);
        event.signal(&server, 3);
        let names: Vec<_> = log.borrow().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["t1", "t2", "t3"]);
    }

    #[test]
    fn signal_on_empty_event_is_a_no_op() {
        let server = server();
        let event = server.event();
        assert!(!event.signal(&server, ()));
        assert_eq!(event.broadcast(&server, ()), 0);
    }

    #[test]
    fn broadcast_wakes_only_current_waiters() {
        let server = server();
        let event = Event::new();
        let log = Log::default();
        for name in ["t1", "t2", "t3"] {
            server.spork(listener(&log, name, &event));
        }
        server.tick();

        // Every listener re-awaits during the broadcast; none runs twice.
        assert_eq!(event.broadcast(&server, "go"), 3);
        let names: Vec<_> = log.borrow().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["t1", "t2", "t3"]);
        assert!(log.borrow().iter().all(|(_, v)| v.as_str() == Some("go")));
        assert_eq!(event.len(), 3);

        assert_eq!(event.broadcast(&server, "again"), 3);
        assert_eq!(log.borrow().len(), 6);
    }

    #[test]
    fn cancelled_waiter_leaves_the_list() {
        let server = server();
        let event = Event::new();
        let log = Log::default();
        let first = server.spork(listener(&log, "t1", &event));
        server.spork(listener(&log, "t2", &event));
        server.tick();
        assert_eq!(first.state(), TaskState::Waiting);

        assert!(server.cancel(&first));
        assert_eq!(event.len(), 1);

        event.signal(&server, true);
        assert_eq!(*log.borrow(), vec![("t2", Value::Bool(true))]);
    }

    #[test]
    fn woken_task_can_sleep_then_run_on_the_clock() {
        let server = server();
        let event = Event::new();
        let log = Log::default();

        let (waiter_log, wait_on) = (Rc::clone(&log), event.clone());
        let mut step = 0;
        server.spork(task::from_fn(move |server, wake| {
            step += 1;
            match step {
                1 => Ok(Suspension::Await(wait_on.clone())),
                2 => {
                    waiter_log.borrow_mut().push(("woke", wake.unwrap_or_default()));
                    Ok(Suspension::Timed(2))
                }
                _ => {
                    waiter_log
                        .borrow_mut()
                        .push(("slept", Value::from(server.now() as i64)));
                    Ok(Suspension::Terminated)
                }
            }
        }));

        let signaller = event.clone();
        server.spork_at(
            3,
            task::from_fn(move |server, _| {
                signaller.signal(server, 7);
                Ok(Suspension::Terminated)
            }),
        );

        server.advance(8);
        assert_eq!(
            *log.borrow(),
            vec![("woke", Value::Int(7)), ("slept", Value::Int(5))]
        );
    }
}
