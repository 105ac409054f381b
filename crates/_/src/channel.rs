use std::sync::{
    Mutex,
    mpsc::{Receiver, Sender, channel},
};

/// Single-consumer event queue connecting worker threads to the owner's
/// maintenance pump.
///
/// Producers clone the sender and push from any thread; the owning side drains
/// accumulated events from its own thread. Sends into a channel whose owner
/// was dropped are silently discarded, which is what makes dropping a loader a
/// valid way to cancel outstanding work.
pub struct EventChannel<T> {
    sender: Sender<T>,
    receiver: Mutex<Receiver<T>>,
}

impl<T> Default for EventChannel<T> {
    fn default() -> Self {
        let (sender, receiver) = channel();
        Self {
            sender,
            receiver: Mutex::new(receiver),
        }
    }
}

impl<T> EventChannel<T> {
    /// Clones a sender handle for a worker thread.
    pub fn sender(&self) -> Sender<T> {
        self.sender.clone()
    }

    /// Pushes an event from the owning side.
    pub fn send(&self, event: T) {
        let _ = self.sender.send(event);
    }

    /// Drains every event accumulated since the last drain, in send order.
    pub fn drain(&self) -> Vec<T> {
        match self.receiver.lock() {
            Ok(receiver) => receiver.try_iter().collect(),
            Err(_) => Vec::new(),
        }
    }
}
