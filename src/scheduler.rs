//! Debounced triggers and per-document write lanes.
//!
//! A [`Debouncer`] fires at the trailing edge of a quiet window: triggering a key whose window
//! is still open aborts the pending timer and starts a new one. A fired timer never does the
//! work itself. It hands a job to the [`WriteQueue`], whose lanes run the jobs for one document
//! strictly in the order they were enqueued. Aborting a timer therefore never interrupts store
//! I/O that is already in flight.
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    future::Future,
    hash::Hash,
    pin::Pin,
    sync::Arc,
    time::Duration,
};
use tokio::{
    sync::{
        mpsc::{unbounded_channel, UnboundedSender},
        oneshot,
    },
    task::JoinHandle,
    time::sleep,
};

use crate::config::Timing;

/// A unit of work run on a write lane.
pub type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Debounced updates keyed by document path, each with its own quiet window. The vault-wide
/// reconciliation has a single key and goes through [`Scheduler::schedule_tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateKind {
    /// Refresh one index file's block after its text changed.
    Links,
    /// Emoji-prefix a renamed folder and rename its index file.
    Rename,
}

struct Pending<K> {
    generation: u64,
    timers: HashMap<K, (u64, JoinHandle<()>)>,
}

/// Trailing-edge debounce keyed by `K`.
pub struct Debouncer<K> {
    name: &'static str,
    window: Duration,
    pending: Arc<Mutex<Pending<K>>>,
}

impl<K> Debouncer<K>
where
    K: Clone + Eq + Hash + Send + std::fmt::Debug + 'static,
{
    pub fn new(name: &'static str, window: Duration) -> Self {
        Debouncer {
            name,
            window,
            pending: Arc::new(Mutex::new(Pending {
                generation: 0,
                timers: HashMap::new(),
            })),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// (Re)start the window for `key`. `fire` runs once the window closes without another
    /// trigger for the same key. Must be called from within a tokio runtime.
    pub fn trigger<F>(&self, key: K, fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut pending = self.pending.lock();
        pending.generation += 1;
        let generation = pending.generation;
        if let Some((_, handle)) = pending.timers.remove(&key) {
            tracing::trace!("[{}] window reset for {:?}", self.name, key);
            handle.abort();
        }

        let pending_ref = self.pending.clone();
        let window = self.window;
        let timer_key = key.clone();
        let name = self.name;
        let handle = tokio::spawn(async move {
            sleep(window).await;
            let current = {
                let mut pending = pending_ref.lock();
                match pending.timers.get(&timer_key) {
                    Some((g, _)) if *g == generation => {
                        pending.timers.remove(&timer_key);
                        true
                    }
                    _ => false,
                }
            };
            if current {
                tracing::debug!("[{name}] firing for {timer_key:?}");
                fire();
            }
        });
        pending.timers.insert(key, (generation, handle));
    }

    /// Drop the pending trigger for `key`, if any. Returns whether one was pending.
    pub fn cancel(&self, key: &K) -> bool {
        match self.pending.lock().timers.remove(key) {
            Some((_, handle)) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        for (_, (_, handle)) in self.pending.lock().timers.drain() {
            handle.abort();
        }
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.lock().timers.contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().timers.len()
    }
}

impl<K> Drop for Debouncer<K> {
    fn drop(&mut self) {
        for (_, (_, handle)) in self.pending.lock().timers.drain() {
            handle.abort();
        }
    }
}

/// Single-writer lanes, one per document path.
#[derive(Default)]
pub struct WriteQueue {
    lanes: Mutex<HashMap<String, UnboundedSender<Job>>>,
}

impl WriteQueue {
    pub fn new() -> Self {
        WriteQueue::default()
    }

    fn open_lane(path: &str) -> UnboundedSender<Job> {
        let (tx, mut rx) = unbounded_channel::<Job>();
        let lane = path.to_string();
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                job.await;
            }
            tracing::trace!("[WriteQueue] lane for {lane} closed");
        });
        tx
    }

    /// Append `job` to the lane for `path`, opening the lane if needed.
    pub fn enqueue(&self, path: &str, job: Job) {
        let mut lanes = self.lanes.lock();
        let job = match lanes.get(path) {
            Some(tx) => match tx.send(job) {
                Ok(()) => return,
                Err(returned) => returned.0,
            },
            None => job,
        };
        let tx = WriteQueue::open_lane(path);
        if tx.send(job).is_err() {
            tracing::error!("[WriteQueue] fresh lane for {path} refused a job");
        }
        lanes.insert(path.to_string(), tx);
    }

    /// Close the lane for `path`. Jobs already queued on it still run.
    pub fn retire(&self, path: &str) {
        if self.lanes.lock().remove(path).is_some() {
            tracing::trace!("[WriteQueue] retired lane for {path}");
        }
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.lock().len()
    }

    /// Wait until every job enqueued before this call has completed.
    pub async fn flush(&self) {
        let waiters: Vec<oneshot::Receiver<()>> = {
            let lanes = self.lanes.lock();
            lanes
                .values()
                .filter_map(|tx| {
                    let (done_tx, done_rx) = oneshot::channel();
                    let marker: Job = Box::pin(async move {
                        let _ = done_tx.send(());
                    });
                    tx.send(marker).ok().map(|_| done_rx)
                })
                .collect()
        };
        for waiter in waiters {
            let _ = waiter.await;
        }
    }
}

/// The debounced triggers of a vault, sharing one write queue.
pub struct Scheduler {
    links: Debouncer<String>,
    tree: Debouncer<()>,
    renames: Debouncer<String>,
    queue: Arc<WriteQueue>,
}

impl Scheduler {
    pub fn new(timing: &Timing) -> Self {
        Scheduler {
            links: Debouncer::new("LinksDebouncer", timing.links_update()),
            tree: Debouncer::new("TreeDebouncer", timing.tree_update()),
            renames: Debouncer::new("RenameDebouncer", timing.rename()),
            queue: Arc::new(WriteQueue::new()),
        }
    }

    pub fn queue(&self) -> &Arc<WriteQueue> {
        &self.queue
    }

    /// Debounce a per-path trigger of `kind`; `make_job` builds the job handed to the lane
    /// for `path` once the window closes.
    pub fn schedule<F>(&self, kind: UpdateKind, path: &str, make_job: F)
    where
        F: FnOnce() -> Job + Send + 'static,
    {
        let queue = self.queue.clone();
        let lane = path.to_string();
        let fire = move || queue.enqueue(&lane, make_job());
        match kind {
            UpdateKind::Links => self.links.trigger(path.to_string(), fire),
            UpdateKind::Rename => self.renames.trigger(path.to_string(), fire),
        }
    }

    /// Debounce the vault-wide reconciliation. `fire` typically enqueues one job per index
    /// file, so it runs outside any lane.
    pub fn schedule_tree<F>(&self, fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.tree.trigger((), fire);
    }

    /// Forget everything pending for `path`, e.g. because it was deleted or moved away.
    pub fn forget(&self, path: &str) {
        let key = path.to_string();
        self.links.cancel(&key);
        self.renames.cancel(&key);
        self.queue.retire(path);
    }

    pub fn is_pending(&self, kind: UpdateKind, path: &str) -> bool {
        match kind {
            UpdateKind::Links => self.links.is_pending(&path.to_string()),
            UpdateKind::Rename => self.renames.is_pending(&path.to_string()),
        }
    }

    pub fn is_tree_pending(&self) -> bool {
        self.tree.is_pending(&())
    }

    pub fn cancel_all(&self) {
        self.links.cancel_all();
        self.tree.cancel_all();
        self.renames.cancel_all();
    }
}
