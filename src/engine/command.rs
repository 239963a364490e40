use rtrb::{Consumer, Producer, RingBuffer};

use crate::engine::Server;
use crate::error::CommandError;

/// A mutation to run on the server's thread at the start of a tick.
pub type Command = Box<dyn FnOnce(&Server) + Send>;

/// Sending half of the command queue. Lives on any thread.
pub struct Remote {
    tx: Producer<Command>,
}

/// Receiving half, attached to a [`Server`].
pub struct Inbox {
    rx: Consumer<Command>,
}

/// Wait-free single-producer command queue with room for `capacity`
/// commands.
pub fn channel(capacity: usize) -> (Remote, Inbox) {
    let (tx, rx) = RingBuffer::new(capacity);
    (Remote { tx }, Inbox { rx })
}

impl Remote {
    /// Queue `command`. Never blocks; fails when the queue is full.
    pub fn send<F>(&mut self, command: F) -> Result<(), CommandError>
    where
        F: FnOnce(&Server) + Send + 'static,
    {
        self.tx
            .push(Box::new(command))
            .map_err(|_| CommandError::Full)
    }

    /// Free slots left in the queue.
    pub fn slots(&self) -> usize {
        self.tx.slots()
    }

    /// Whether the server side has been dropped.
    pub fn is_abandoned(&self) -> bool {
        self.tx.is_abandoned()
    }
}

impl Inbox {
    pub fn pop(&mut self) -> Option<Command> {
        self.rx.pop().ok()
    }

    /// Commands waiting to be applied.
    pub fn len(&self) -> usize {
        self.rx.slots()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_queue_rejects_without_blocking() {
        let (mut remote, inbox) = channel(2);
        assert!(remote.send(|_| {}).is_ok());
        assert!(remote.send(|_| {}).is_ok());
        assert_eq!(remote.send(|_| {}), Err(CommandError::Full));
        assert_eq!(inbox.len(), 2);
        assert_eq!(remote.slots(), 0);
    }

    #[test]
    fn remote_notices_dropped_inbox() {
        let (remote, inbox) = channel(1);
        assert!(!remote.is_abandoned());
        drop(inbox);
        assert!(remote.is_abandoned());
    }
}
