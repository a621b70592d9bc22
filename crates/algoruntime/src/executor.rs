//! Serial and concurrent execution drivers.
//!
//! The drivers walk the distributed graph from any node: unfinished
//! ancestors are started first (recursively), the node's own computation
//! runs once its stored ancestor flags are all true, and completion hands
//! the results to the propagation bus before launching descendants.
//!
//! A finishing node launches each not-yet-started descendant with its
//! *own* ParallelExecution flag: the upstream node decides whether its
//! children run on the worker pool or inline, never the child itself.

use algocore::{disconnect, pull_inputs, NodeHandle};

/// Cheap clonable handle over the shared worker pool. Clones ride along
/// with every submitted computation so the completion callback can keep
/// scheduling.
#[derive(Clone)]
pub struct Scheduler {
    pool: tokio::runtime::Handle,
}

impl Scheduler {
    /// Use the ambient tokio runtime as the shared worker pool. Panics when
    /// called outside a runtime; use [`Scheduler::with_pool`] otherwise.
    pub fn new() -> Self {
        Self { pool: tokio::runtime::Handle::current() }
    }

    pub fn with_pool(pool: tokio::runtime::Handle) -> Self {
        Self { pool }
    }

    /// Start the graph around `node` without blocking.
    ///
    /// If the node's stored ancestor flags are all true, its computation is
    /// submitted to the worker pool (the Created -> Started transition is a
    /// check-and-set, so concurrent completion callbacks cannot dispatch it
    /// twice). Otherwise the call recurses into every unfinished ancestor
    /// not yet started; the node itself is launched later by a completion
    /// callback once its last ancestor finishes.
    pub fn execute_parallel(&self, node: &NodeHandle) {
        if node.all_inputs_ready() {
            if !node.try_start() {
                return;
            }
            tracing::debug!(node = %node, "submitting to worker pool");
            let scheduler = self.clone();
            let node = node.clone();
            self.pool.spawn_blocking(move || scheduler.run_now(&node));
        } else {
            for ancestor in node.pending_ancestors() {
                if !ancestor.is_started() {
                    self.execute_parallel(&ancestor);
                }
            }
        }
    }

    /// Run the graph around `node` on the calling thread, returning only
    /// after the node (and every ancestor it had to run) reached Finished.
    ///
    /// Serial execution always overrides the node's own launch policy: its
    /// descendants will run inline too unless a later pass flips the flag
    /// back.
    pub fn execute_serial(&self, node: &NodeHandle) {
        if !node.all_inputs_ready() {
            for ancestor in node.pending_ancestors() {
                if !ancestor.is_started() {
                    self.execute_serial(&ancestor);
                }
            }
        }
        node.set_parallel(false);
        if !node.try_start() {
            // Another caller won the start; the blocking contract binds them.
            return;
        }
        self.run_now(node);
    }

    /// Run the computation on the current thread and drive completion.
    fn run_now(&self, node: &NodeHandle) {
        match node.run_computation() {
            Ok(()) => {
                node.set_finished();
                tracing::debug!(node = %node, "finished");
                self.on_finished(node);
            }
            Err(error) => {
                // The node never reaches Finished: no outputs, descendants
                // stay parked, and the failure is relayed as an advisory.
                tracing::error!(node = %node, %error, "computation failed");
                node.abort(error.to_string());
            }
        }
    }

    /// The propagation step, run exactly once when `node` reaches Finished.
    fn on_finished(&self, node: &NodeHandle) {
        for ancestor in node.ancestor_nodes() {
            ancestor.note_descendant_finished(node.id());
        }

        let keep_input = node.keep_input();
        for descendant in node.descendant_nodes() {
            // Deliver before flipping the readiness flag: a concurrently
            // finishing sibling must not be able to launch the descendant
            // while this node's values are still in flight.
            if let Err(error) = pull_inputs(&descendant, node) {
                tracing::warn!(node = %node, descendant = %descendant, %error,
                    "propagation completed partially");
            }
            descendant.note_ancestor_finished(node.id());
            if !keep_input {
                // The payload has been delivered; sever the edge and release
                // this node's own inputs so it can be collected once no
                // other handle remains.
                disconnect(node, &descendant);
                node.clear_inputs();
            }
            if !descendant.is_started() {
                if node.parallel() {
                    self.execute_parallel(&descendant);
                } else {
                    self.execute_serial(&descendant);
                }
            }
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
