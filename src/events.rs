// Typed event fan-out for capture producers.
//
// Producers (audio recorder, session clients) hold an `Emitter<T>` per event
// kind and push values to every live subscriber. Subscribers that have dropped
// their receiver are pruned on the next emit, so teardown on the consumer side
// is just dropping the channel.

use std::sync::Mutex;
use tokio::sync::mpsc;

pub struct Emitter<T> {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<T>>>,
}

impl<T: Clone> Emitter<T> {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Register a new subscriber. Events emitted after this call are delivered
    /// in emission order.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }

    /// Deliver `value` to every live subscriber, dropping closed ones.
    pub fn emit(&self, value: T) {
        let mut subs = self.subscribers.lock().unwrap();
        subs.retain(|tx| tx.send(value.clone()).is_ok());
    }

    /// Number of live subscribers (closed channels are only detected on emit).
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }

    /// Remove every subscriber. Their receivers observe end-of-stream.
    pub fn clear(&self) {
        self.subscribers.lock().unwrap().clear();
    }
}

impl<T: Clone> Default for Emitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_in_order_to_all_subscribers() {
        let emitter = Emitter::new();
        let mut a = emitter.subscribe();
        let mut b = emitter.subscribe();

        emitter.emit(1u32);
        emitter.emit(2u32);

        assert_eq!(a.recv().await, Some(1));
        assert_eq!(a.recv().await, Some(2));
        assert_eq!(b.recv().await, Some(1));
        assert_eq!(b.recv().await, Some(2));
    }

    #[tokio::test]
    async fn prunes_dropped_subscribers() {
        let emitter = Emitter::new();
        let rx = emitter.subscribe();
        let _live = emitter.subscribe();
        assert_eq!(emitter.subscriber_count(), 2);

        drop(rx);
        emitter.emit(7u32);
        assert_eq!(emitter.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn clear_closes_receivers() {
        let emitter = Emitter::new();
        let mut rx = emitter.subscribe();
        emitter.clear();
        assert_eq!(rx.recv().await, None::<u32>);
    }
}
