//! A bounded worker pool for file-level jobs.
//!
//! One queue guarded by a mutex and two condition variables: one wakes
//! workers when work arrives, the other wakes waiters when the queue is
//! empty and no job is still running. Jobs run to completion on one
//! worker; there is no suspension inside a job.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};

type Job = Box<dyn FnOnce() + Send + 'static>;

struct State {
    queue: VecDeque<Job>,
    /// Queued plus currently-running jobs.
    pending: usize,
    running: bool,
}

struct Inner {
    state: Mutex<State>,
    work_available: Condvar,
    work_drained: Condvar,
}

/// A cloneable handle through which jobs are enqueued. Jobs themselves
/// hold handles so they can spawn follow-up work.
#[derive(Clone)]
pub struct PoolHandle {
    inner: Arc<Inner>,
}

impl PoolHandle {
    pub fn spawn(&self, job: impl FnOnce() + Send + 'static) {
        {
            let mut state = self.inner.state.lock();
            state.queue.push_back(Box::new(job));
            state.pending += 1;
        }
        self.inner.work_available.notify_one();
    }

    /// Blocks until the queue is empty and no job is outstanding.
    pub fn wait(&self) {
        let mut state = self.inner.state.lock();
        while !(state.queue.is_empty() && state.pending == 0) {
            self.inner.work_drained.wait(&mut state);
        }
    }
}

pub struct ThreadPool {
    inner: Arc<Inner>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    /// A pool with `num_threads` workers, at least one.
    pub fn new(num_threads: usize) -> Self {
        let inner = Arc::new(Inner {
            state: Mutex::new(State {
                queue: VecDeque::new(),
                pending: 0,
                running: true,
            }),
            work_available: Condvar::new(),
            work_drained: Condvar::new(),
        });

        let count = num_threads.max(1);
        let mut workers = Vec::with_capacity(count);
        for _ in 0..count {
            let inner = inner.clone();
            workers.push(std::thread::spawn(move || worker_loop(&inner)));
        }

        Self { inner, workers }
    }

    /// A pool sized to the machine: `hardware_concurrency - 1`, at
    /// least one.
    pub fn with_default_size() -> Self {
        Self::new(num_cpus::get().saturating_sub(1))
    }

    pub fn handle(&self) -> PoolHandle {
        PoolHandle {
            inner: self.inner.clone(),
        }
    }

    pub fn wait(&self) {
        self.handle().wait();
    }

    /// Stops the workers after the queue drains of running jobs.
    pub fn join(&mut self) {
        {
            let mut state = self.inner.state.lock();
            if !state.running {
                return;
            }
            state.running = false;
        }
        self.inner.work_available.notify_all();

        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.join();
    }
}

fn worker_loop(inner: &Inner) {
    loop {
        let job = {
            let mut state = inner.state.lock();
            while state.queue.is_empty() && state.running {
                inner.work_available.wait(&mut state);
            }

            if state.queue.is_empty() && !state.running {
                return;
            }

            state.queue.pop_front().expect("queue is non-empty")
        };

        job();

        let mut state = inner.state.lock();
        state.pending -= 1;
        if state.queue.is_empty() && state.pending == 0 {
            inner.work_drained.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_jobs_run_to_completion() {
        let pool = ThreadPool::new(4);
        let counter = Arc::new(AtomicUsize::new(0));

        let handle = pool.handle();
        for _ in 0..64 {
            let counter = counter.clone();
            handle.spawn(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        pool.wait();
        assert_eq!(counter.load(Ordering::SeqCst), 64);
    }

    #[test]
    fn test_jobs_can_spawn_jobs() {
        let pool = ThreadPool::new(2);
        let counter = Arc::new(AtomicUsize::new(0));

        let handle = pool.handle();
        for _ in 0..8 {
            let counter = counter.clone();
            let nested = handle.clone();
            handle.spawn(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                let counter = counter.clone();
                nested.spawn(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                });
            });
        }

        pool.wait();
        assert_eq!(counter.load(Ordering::SeqCst), 16);
    }

    #[test]
    fn test_wait_on_idle_pool_returns() {
        let pool = ThreadPool::new(1);
        pool.wait();
    }
}
