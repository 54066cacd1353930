use std::num::NonZeroU8;
use std::sync::Arc;

use futures::future::{self, Future, FutureExt};
use thiserror::Error;
use tracing::Instrument;

use super::queue::Receiver;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("worker {id} did not complete")]
    Worker {
        id: usize,
        #[source]
        source: tokio::task::JoinError,
    },
}

/// A fixed-size pool of workers draining a task [`queue`](super::queue) in the background.
///
/// Each worker repeatedly pulls the next item from the shared [`Receiver`] and hands it to the pool handler, one item at a time,
/// until the queue is both closed and drained. Workers race to receive, so there is no ordering guarantee across workers,
/// but each item is processed by exactly one of them.
///
/// Shutting down is a two-phase operation: the producer first closes the queue, then [`Pool::join()`] waits for every worker
/// to observe end-of-input.
///
/// # Example
/// ```
/// # tokio_test::block_on(async {
/// # use dirscraper::task::{queue, Pool};
/// let (sender, receiver) = queue::channel(2.try_into().unwrap());
/// let pool = Pool::start(3.try_into().unwrap(), receiver, |worker, i: u32| async move {
///     println!("Hello from task #{i} on worker {worker}!");
/// });
///
/// for i in 0..=5 {
///     sender.enqueue(i).await.unwrap();
/// }
///
/// sender.close();
///
/// let processed = pool.join().await.unwrap();
/// assert_eq!(processed.iter().sum::<usize>(), 6);
/// # })
/// ```
#[derive(Debug)]
pub struct Pool {
    /// The pool of workers.
    workers: Vec<Worker>,
}

impl Pool {
    /// Start a pool with `size` workers pulling items from `receiver`.
    ///
    /// Workers are numbered from 1 to `size` and `handler` is called with the worker number and the received item.
    /// A handler is expected to deal with its own failures: whatever happens to an item must not stop the worker.
    pub fn start<T, F, Fut>(size: NonZeroU8, receiver: Receiver<T>, handler: F) -> Self
    where
        T: Send + 'static,
        F: Fn(usize, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler = Arc::new(handler);

        let workers = (1..=usize::from(size.get()))
            .map(|id| Worker::new(id, receiver.clone(), Arc::clone(&handler)))
            .collect();

        Self { workers }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Wait for all workers to drain the queue and shut down.
    ///
    /// Returns how many items each worker processed, in worker order.
    /// This only completes once the producing half of the queue has been closed (or dropped).
    pub async fn join(self) -> Result<Vec<usize>, PoolError> {
        let ids = self.workers.iter().map(|worker| worker.id).collect::<Vec<_>>();

        let results = future::join_all(self.workers.into_iter().inspect(|worker| {
            tracing::debug!("Waiting for worker {}...", worker.id);
        }))
        .await;

        ids.into_iter()
            .zip(results)
            .map(|(id, result)| result.map_err(|source| PoolError::Worker { id, source }))
            .collect()
    }
}

#[derive(Debug)]
struct Worker {
    id: usize,
    handle: tokio::task::JoinHandle<usize>,
}

impl Worker {
    fn new<T, F, Fut>(id: usize, receiver: Receiver<T>, handler: Arc<F>) -> Worker
    where
        T: Send + 'static,
        F: Fn(usize, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        tracing::debug!("Starting worker {id}...");

        Worker {
            id,
            handle: tokio::spawn(async move {
                let mut processed = 0;

                loop {
                    match receiver.receive().await {
                        Some(item) => {
                            tracing::trace!("Executing task on worker {id}...");

                            (*handler)(id, item).await;
                            processed += 1;
                        }
                        None => {
                            tracing::debug!("All tasks exhausted, shutting down worker {id} after {processed} task(s).");
                            break processed;
                        }
                    }
                }
            }
            .instrument(tracing::info_span!("worker", id))),
        }
    }
}

impl Future for Worker {
    type Output = Result<usize, tokio::task::JoinError>;

    #[inline]
    fn poll(mut self: std::pin::Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> std::task::Poll<Self::Output> {
        self.handle.poll_unpin(cx)
    }
}
