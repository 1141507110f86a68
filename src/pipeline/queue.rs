use thiserror::Error;
use tokio::sync::mpsc;

use crate::audio::AudioFrame;

/// The consumer half is gone; nothing will ever pop again
#[derive(Debug, Error, PartialEq, Eq)]
#[error("queue consumer closed")]
pub struct QueueClosed;

/// Queue between the capture and send loops
pub type FrameProducer = QueueProducer<AudioFrame>;
pub type FrameConsumer = QueueConsumer<AudioFrame>;

/// Create a bounded FIFO queue for one producer and one consumer
///
/// The queue never holds more than `capacity` items: pushing to a full queue
/// waits until the consumer pops. Panics if `capacity` is zero.
pub fn bounded<T>(capacity: usize) -> (QueueProducer<T>, QueueConsumer<T>) {
    let (tx, rx) = mpsc::channel(capacity);
    (QueueProducer { tx }, QueueConsumer { rx })
}

/// Producer half
pub struct QueueProducer<T> {
    tx: mpsc::Sender<T>,
}

impl<T> QueueProducer<T> {
    /// Append an item, waiting while the queue is full
    pub async fn push(&self, item: T) -> Result<(), QueueClosed> {
        self.tx.send(item).await.map_err(|_| QueueClosed)
    }

    /// Items currently queued
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }
}

/// Consumer half
pub struct QueueConsumer<T> {
    rx: mpsc::Receiver<T>,
}

impl<T> QueueConsumer<T> {
    /// Take the oldest item, waiting while the queue is empty
    ///
    /// Returns `None` once the producer is gone and the queue is drained.
    pub async fn pop(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Take the oldest item if one is queued
    pub fn try_pop(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }
}
