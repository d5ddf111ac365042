//! In-memory FIFO shared by the ingesters and the downstream consumer.
//!
//! Producers never block and nothing is ever dropped: the channel is
//! unbounded. Ordering holds per producer only; pushes from the poller and
//! the webhook interleave in arrival order.

use async_channel::{Receiver, Sender, TrySendError, unbounded};

use crate::Result;
use crate::error::Error;
use crate::types::EventEnvelope;

#[derive(Clone, Debug)]
pub struct EventQueue {
    tx: Sender<EventEnvelope>,
    rx: Receiver<EventEnvelope>,
}

impl EventQueue {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Append an event at the tail.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueClosed`] if the channel was closed, which cannot
    /// happen while any `EventQueue` handle is alive.
    pub fn enqueue(&self, event: EventEnvelope) -> Result<()> {
        match self.tx.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Closed(_) | TrySendError::Full(_)) => Err(Error::QueueClosed),
        }
    }

    /// Wait for the next event. Returns `None` only once the channel is closed.
    pub async fn dequeue(&self) -> Option<EventEnvelope> {
        self.rx.recv().await.ok()
    }

    /// Next event if one is already waiting.
    #[must_use]
    pub fn try_dequeue(&self) -> Option<EventEnvelope> {
        self.rx.try_recv().ok()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::EventQueue;
    use crate::types::EventEnvelope;
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn dequeues_in_push_order() {
        let queue = EventQueue::new();
        for idx in 0..3 {
            queue
                .enqueue(EventEnvelope::from_problem(json!({ "problemId": idx })))
                .unwrap();
        }
        assert_eq!(queue.len(), 3);
        for idx in 0..3 {
            let event = queue.dequeue().await.unwrap();
            assert_eq!(event.payload["problemId"], json!(idx));
        }
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn dequeue_waits_for_producer() {
        let queue = EventQueue::new();
        let producer = queue.clone();
        let consumer = tokio::spawn(async move { queue.dequeue().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!consumer.is_finished());

        producer
            .enqueue(EventEnvelope::from_problem(json!({"problemId": "P1"})))
            .unwrap();
        let event = timeout(Duration::from_secs(1), consumer)
            .await
            .expect("consumer woke up")
            .expect("task joined")
            .expect("event");
        assert_eq!(event.payload["problemId"], json!("P1"));
    }
}
