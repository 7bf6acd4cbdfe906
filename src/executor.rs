//! Fixed worker pool draining a shared job queue.
//!
//! Each job is one ready node of one live run. Firing it routes the output
//! tokens downstream and enqueues every successor whose readiness claim the
//! worker wins; the terminal node publishes the run's result instead.
//! Workers block on a condition variable while the queue is empty and
//! interleave jobs of concurrent runs freely.

use crate::error::GraphError;
use crate::future::RunFuture;
use crate::graph::Graph;
use crate::instance::GraphInstance;
use crate::token::Token;
use crate::types::{NodeId, TokenVec};
use crossbeam_channel::Sender;
use derive_more::Debug;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, Weak};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, trace};

/// One live run: the instance plus the channel publishing its result.
///
/// Jobs hold strong handles; the executor's live-pool holds weak ones.
/// When the last job of a run completes (or is abandoned by a panicking
/// callable), the instance is released and the result channel disconnects.
#[derive(Debug)]
struct RunState {
    instance: GraphInstance,
    result: Sender<TokenVec>,
}

/// A unit of worker work: one ready node of one live run.
#[derive(Debug)]
struct Job {
    run: Arc<RunState>,
    node: NodeId,
}

#[derive(Debug)]
struct QueueState {
    jobs: VecDeque<Job>,
    stopping: bool,
}

#[derive(Debug)]
struct Shared {
    queue: Mutex<QueueState>,
    ready: Condvar,
}

/// Fixed-size worker pool executing instances of validated graph
/// templates.
///
/// Dropping the executor stops the pool: workers drain the jobs already
/// queued, then exit and are joined. Futures of runs that could not finish
/// resolve to an error.
#[must_use]
#[derive(Debug)]
pub struct Executor {
    #[debug(skip)]
    shared: Arc<Shared>,
    #[debug(skip)]
    workers: Vec<JoinHandle<()>>,
    live: Mutex<Vec<Weak<RunState>>>,
}

impl Default for Executor {
    /// A pool with one worker per available CPU.
    fn default() -> Self {
        Self::new(thread::available_parallelism().map_or(1, usize::from))
    }
}

impl Executor {
    /// Spawn a pool of exactly `threads` workers.
    ///
    /// # Panics
    /// If `threads` is zero, or if the OS refuses to spawn a thread.
    pub fn new(threads: usize) -> Self {
        assert!(threads > 0, "Executor::new: worker pool cannot be empty");
        let shared = Arc::new(Shared {
            queue: Mutex::new(QueueState {
                jobs: VecDeque::new(),
                stopping: false,
            }),
            ready: Condvar::new(),
        });
        let workers = (0..threads)
            .map(|worker| {
                let shared = Arc::clone(&shared);
                thread::Builder::new()
                    .name(format!("mdf-worker-{worker}"))
                    .spawn(move || worker_loop(&shared))
                    .expect("Executor::new: failed to spawn worker")
            })
            .collect();
        debug!(threads, "worker pool started");
        Self {
            shared,
            workers,
            live: Mutex::new(Vec::new()),
        }
    }

    /// Execute one instance of `graph` on the given input arguments.
    ///
    /// Validates the template (idempotent), clones it into a fresh
    /// instance, seeds the input node with `args` (the i-th argument fills
    /// the i-th slot) and schedules it. The returned future resolves with
    /// the terminal node's output vector. Any number of runs, of this or
    /// other templates, may be in flight at once.
    ///
    /// # Errors
    /// Any validation failure, or [`GraphError::InputArity`] when `args`
    /// does not match the input node's arity.
    pub fn run(&self, graph: &Graph, args: Vec<Token>) -> Result<RunFuture, GraphError> {
        graph.validate()?;
        let (tx, rx) = crossbeam_channel::bounded(1);
        let run = Arc::new(RunState {
            instance: GraphInstance::of(graph),
            result: tx,
        });
        run.instance.seed(args)?;

        {
            let mut live = self.live.lock().expect("Executor::run: live-pool poisoned");
            live.retain(|slot| slot.strong_count() > 0);
            live.push(Arc::downgrade(&run));
        }

        let input = run.instance.input_node();
        trace!(node = input, "run submitted");
        enqueue(&self.shared, Job { run, node: input });
        Ok(RunFuture::new(rx))
    }

    /// Number of runs that are still alive: scheduled or in flight.
    #[must_use]
    pub fn live_runs(&self) -> usize {
        self.live
            .lock()
            .expect("Executor::live_runs: live-pool poisoned")
            .iter()
            .filter(|slot| slot.strong_count() > 0)
            .count()
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        {
            let mut queue = self
                .shared
                .queue
                .lock()
                .expect("Executor::drop: queue poisoned");
            queue.stopping = true;
        }
        self.shared.ready.notify_all();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                error!("worker thread panicked");
            }
        }
        debug!("worker pool stopped");
    }
}

fn enqueue(shared: &Shared, job: Job) {
    {
        let mut queue = shared.queue.lock().expect("enqueue: queue poisoned");
        queue.jobs.push_back(job);
    }
    shared.ready.notify_one();
}

fn worker_loop(shared: &Shared) {
    loop {
        let job = {
            let mut queue = shared.queue.lock().expect("worker_loop: queue poisoned");
            loop {
                if let Some(job) = queue.jobs.pop_front() {
                    break job;
                }
                if queue.stopping {
                    return;
                }
                queue = shared
                    .ready
                    .wait(queue)
                    .expect("worker_loop: queue poisoned");
            }
        };

        // A panicking callable aborts only its own run: this job's handle
        // unwinds away, downstream nodes never become ready, and once the
        // run's last handle is gone the future's sender disconnects.
        let node = job.node;
        if panic::catch_unwind(AssertUnwindSafe(|| process(job, shared))).is_err() {
            error!(node, "node callable panicked; run aborted");
        }
    }
}

fn process(job: Job, shared: &Shared) {
    let Job { run, node } = job;
    let spec = run.instance.spec(node);
    trace!(node, "firing");
    let outputs = run.instance.fire(node);

    if spec.is_output {
        // Send fails only when the future was dropped; the output is
        // released either way.
        let _ = run.result.send(outputs);
        trace!(node, "run completed");
        return;
    }

    run.instance.transfer_tokens(outputs, &spec.output_map);
    for &succ in &spec.successors {
        if run.instance.claim_ready(succ) {
            enqueue(
                shared,
                Job {
                    run: Arc::clone(&run),
                    node: succ,
                },
            );
        }
    }
}
