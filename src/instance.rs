//! Per-run graph state: input slots, readiness counters, firing.
//!
//! The routing protocol: a producer writes a consumer's input slot, then
//! decrements the consumer's pending counter with release ordering. The
//! scheduler loads the counter with acquire ordering and only then attempts
//! the fired claim (an `AcqRel` swap). The claim is the linearisation
//! point: exactly one caller wins it per node per run, so the winner reads
//! every input slot after all of the producers' writes, and the slots need
//! no lock.

use crate::error::GraphError;
use crate::graph::{Graph, NodeKind, NodeSpec};
use crate::sync::{AtomicBool, AtomicUsize, Ordering};
use crate::token::Token;
use crate::types::{NodeId, SyncUnsafeCell, TokenVec};
use std::sync::Arc;

#[derive(Debug)]
struct InstanceNode {
    spec: Arc<NodeSpec>,
    slots: Box<[SyncUnsafeCell<Option<Token>>]>,
    pending: AtomicUsize,
    fired: AtomicBool,
}

impl InstanceNode {
    fn of(spec: &Arc<NodeSpec>) -> Self {
        Self {
            spec: Arc::clone(spec),
            slots: (0..spec.input_size)
                .map(|_| SyncUnsafeCell::new(None))
                .collect(),
            pending: AtomicUsize::new(spec.input_size),
            fired: AtomicBool::new(false),
        }
    }
}

/// A single run's clone of a validated template.
///
/// Shares the immutable wiring with the template and owns the mutable
/// per-run state: one slot vector, one pending counter, and one fired flag
/// per node.
#[derive(Debug)]
pub(crate) struct GraphInstance {
    nodes: Vec<InstanceNode>,
    input_node: NodeId,
}

impl GraphInstance {
    /// Clone per-run state from a validated template.
    pub(crate) fn of(graph: &Graph) -> Self {
        Self {
            nodes: graph.nodes.iter().map(InstanceNode::of).collect(),
            input_node: graph
                .input_node()
                .expect("GraphInstance::of: template validated"),
        }
    }

    pub(crate) fn input_node(&self) -> NodeId {
        self.input_node
    }

    pub(crate) fn spec(&self, node: NodeId) -> &NodeSpec {
        &self.nodes[node].spec
    }

    /// Seed the input node: the i-th argument fills the i-th slot, the
    /// pending counter drops to zero, and the fired flag is claimed so the
    /// node never re-enters the readiness sweep.
    pub(crate) fn seed(&self, args: TokenVec) -> Result<(), GraphError> {
        let node = &self.nodes[self.input_node];
        if args.len() != node.spec.input_size {
            return Err(GraphError::InputArity {
                expected: node.spec.input_size,
                got: args.len(),
            });
        }
        for (slot, arg) in node.slots.iter().zip(args) {
            slot.with_mut(|cell| {
                // SAFETY: the run is not scheduled yet; this thread is the
                // only one touching the instance.
                unsafe { *cell = Some(arg) }
            });
        }
        node.pending.store(0, Ordering::Release);
        let claimed = !node.fired.swap(true, Ordering::AcqRel);
        assert!(claimed, "GraphInstance::seed: fresh instance already claimed");
        Ok(())
    }

    /// Fire `node`, yielding its output vector.
    ///
    /// Must only be called by the worker that won the fired claim, after
    /// observing the pending counter at zero.
    pub(crate) fn fire(&self, node_id: NodeId) -> TokenVec {
        let node = &self.nodes[node_id];
        let inputs: TokenVec = node
            .slots
            .iter()
            .map(|slot| {
                slot.with_mut(|cell| {
                    // SAFETY: the fired claim is unique, and observing
                    // pending == 0 ordered every producer's slot write
                    // before this read; nothing else touches the cell now.
                    unsafe { (*cell).take() }
                })
                .expect("GraphInstance::fire: slot populated before firing")
            })
            .collect();
        match node.spec.kind {
            NodeKind::Standard => node.spec.function.invoke(&inputs),
            NodeKind::Split => {
                let token = &inputs[0];
                (0..node.spec.output_size).map(|_| token.clone()).collect()
            }
            NodeKind::Merge => vec![Token::new(inputs)],
        }
    }

    /// Route a fired node's outputs through its output map: the i-th entry
    /// delivers the i-th value. Each slot write happens strictly before the
    /// release decrement that publishes it.
    pub(crate) fn transfer_tokens(&self, outputs: TokenVec, map: &[(NodeId, usize)]) {
        debug_assert_eq!(
            outputs.len(),
            map.len(),
            "GraphInstance::transfer_tokens: one map entry per output",
        );
        for (token, &(target, slot)) in outputs.into_iter().zip(map) {
            let node = &self.nodes[target];
            node.slots[slot].with_mut(|cell| {
                // SAFETY: build-time wiring gives every (node, slot) pair
                // exactly one producer, and the consumer reads only after
                // its pending counter reaches zero.
                unsafe { *cell = Some(token) }
            });
            node.pending.fetch_sub(1, Ordering::Release);
        }
    }

    /// Readiness check and claim for one successor; true for exactly one
    /// caller over the lifetime of the run.
    ///
    /// The counter must be read before the swap: the acquire load pairs
    /// with the producers' release decrements, and the swap makes the
    /// subsequent enqueue unique.
    pub(crate) fn claim_ready(&self, node_id: NodeId) -> bool {
        let node = &self.nodes[node_id];
        node.pending.load(Ordering::Acquire) == 0 && !node.fired.swap(true, Ordering::AcqRel)
    }
}
