use crate::types::NodeId;
use thiserror::Error;

/// Failure raised while building or validating a graph template.
///
/// Every variant is recoverable: the failing call leaves the template
/// exactly as it was.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GraphError {
    /// A builder call arrived after `validate` had already succeeded.
    #[error("graph can no longer be modified after validation")]
    ModifiedAfterValidation,

    /// The instruction handle belongs to a different graph.
    #[error("instruction for node {node} belongs to a different graph")]
    ForeignInstruction {
        /// Node id carried by the offending handle.
        node: NodeId,
    },

    /// The instruction handle was never bound to a node.
    #[error("instruction handle is unset")]
    NullInstruction,

    /// A split or merge node was requested with zero fan.
    #[error("split/merge fan must be at least 1")]
    ZeroFanArity,

    /// A wiring entry targets a slot past the consumer's arity.
    #[error("slot {slot} is out of range for node {node} with {input_size} inputs")]
    SlotOutOfRange {
        /// The consumer node.
        node: NodeId,
        /// The out-of-range slot index.
        slot: usize,
        /// The consumer's declared arity.
        input_size: usize,
    },

    /// The targeted slot already has a producer.
    #[error("slot {slot} of node {node} is already wired")]
    SlotAlreadyWired {
        /// The consumer node.
        node: NodeId,
        /// The doubly-wired slot index.
        slot: usize,
    },

    /// An edge may not connect a node to itself.
    #[error("node {node} cannot be wired to itself")]
    SelfLoop {
        /// The node on both ends of the rejected edge.
        node: NodeId,
    },

    /// Adding an entry to an output map that already has `output_size`
    /// entries, or setting a map over a non-empty one.
    #[error("output map of node {node} is already full")]
    OutputMapFull {
        /// The producer node.
        node: NodeId,
    },

    /// Setting an output map of the wrong length.
    #[error("output map of node {node} must have exactly {expected} entries, got {got}")]
    OutputMapSize {
        /// The producer node.
        node: NodeId,
        /// The node's output arity.
        expected: usize,
        /// The rejected map's length.
        got: usize,
    },

    /// The designated input node has wired input slots.
    #[error("input node {node} cannot receive tokens from other nodes")]
    InputHasIncomingEdges {
        /// The node being marked as input.
        node: NodeId,
    },

    /// The designated output node has output-map entries.
    #[error("output node {node} cannot send tokens to other nodes")]
    OutputHasOutgoingEdges {
        /// The node being marked as output.
        node: NodeId,
    },

    /// The designated output node has unwired input slots.
    #[error("output node {node} does not receive all of its tokens")]
    OutputNotFullyWired {
        /// The node being marked as output.
        node: NodeId,
    },

    /// A reachable non-terminal node routes fewer tokens than it produces.
    #[error("node {node} does not route all of its output tokens")]
    IncompleteOutputMap {
        /// The under-wired node.
        node: NodeId,
    },

    /// The input and output markers point at the same node.
    #[error("input and output nodes must be distinct")]
    InputOutputNotDistinct,

    /// The input or output node was never marked.
    #[error("input and output nodes must both be set")]
    InputOrOutputUnset,

    /// Traversal found a back edge.
    #[error("graph contains a cycle through node {node}")]
    CycleDetected {
        /// A node on the detected cycle.
        node: NodeId,
    },

    /// Traversal from the input node did not reach every node.
    #[error("only {visited} of {total} nodes are reachable from the input node")]
    UnreachableNodes {
        /// Number of nodes the traversal reached.
        visited: usize,
        /// Number of nodes in the template.
        total: usize,
    },

    /// A run was submitted with the wrong number of input arguments.
    #[error("input node takes {expected} arguments, got {got}")]
    InputArity {
        /// The input node's arity.
        expected: usize,
        /// Number of arguments supplied.
        got: usize,
    },
}

/// Failure reported by a run future.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum RunError {
    /// The run ended without publishing a result: a node callable panicked,
    /// or the executor shut down first.
    #[error("run aborted before the terminal node fired")]
    Aborted,
}
