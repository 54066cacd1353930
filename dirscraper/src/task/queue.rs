//! A bounded, closable FIFO queue shared between a single producer and many consumers.
//!
//! The producing half ([`Sender`]) is unique and is consumed by [`Sender::close()`], so nothing can be enqueued once the queue is closed.
//! The consuming half ([`Receiver`]) can be cloned freely, every clone pulling from the same buffer: each item is received exactly once.

use std::num::NonZeroUsize;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

/// Default queue capacity, ie. how many tasks may be pending before the producer is suspended.
pub const QUEUE_CAPACITY: NonZeroUsize = unsafe { NonZeroUsize::new_unchecked(10) };

/// Error returned when enqueuing while every receiver has been dropped.
///
/// The rejected item is handed back.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("task queue is disconnected")]
pub struct SendError<T>(pub T);

/// Create a bounded queue holding up to `capacity` pending items.
///
/// # Example
/// ```
/// # tokio_test::block_on(async {
/// # use dirscraper::task::queue;
/// let (sender, receiver) = queue::channel(2.try_into().unwrap());
///
/// sender.enqueue("a.txt").await.unwrap();
/// sender.enqueue("b.txt").await.unwrap();
/// sender.close();
///
/// assert_eq!(receiver.receive().await, Some("a.txt"));
/// assert_eq!(receiver.receive().await, Some("b.txt"));
/// assert_eq!(receiver.receive().await, None);
/// # })
/// ```
pub fn channel<T>(capacity: NonZeroUsize) -> (Sender<T>, Receiver<T>) {
    let (sender, receiver) = mpsc::channel(capacity.get());

    (
        Sender { inner: sender },
        Receiver {
            inner: Arc::new(Mutex::new(receiver)),
        },
    )
}

/// The producing half of the queue.
#[derive(Debug)]
pub struct Sender<T> {
    inner: mpsc::Sender<T>,
}

impl<T> Sender<T> {
    /// Push `item` at the back of the queue.
    ///
    /// Waits for a free slot while the queue is full, which bounds the number of pending items to the queue capacity.
    pub async fn enqueue(&self, item: T) -> Result<(), SendError<T>> {
        self.inner.send(item).await.map_err(|mpsc::error::SendError(item)| SendError(item))
    }

    /// Signal that no more items will be enqueued.
    ///
    /// Receivers keep getting the pending items, then end-of-input once the buffer is drained.
    pub fn close(self) {
        tracing::debug!("Closing task queue with {} pending task(s).", self.inner.max_capacity() - self.inner.capacity());
    }
}

/// The consuming half of the queue.
#[derive(Debug)]
pub struct Receiver<T> {
    inner: Arc<Mutex<mpsc::Receiver<T>>>,
}

impl<T> Receiver<T> {
    /// Pull the next item from the front of the queue.
    ///
    /// Waits while the queue is empty but still open, and returns `None` once it is both closed and drained.
    pub async fn receive(&self) -> Option<T> {
        self.inner.lock().await.recv().await
    }
}

// not derived to avoid a useless `T: Clone` bound
impl<T> Clone for Receiver<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
