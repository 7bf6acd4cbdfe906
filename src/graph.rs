pub(crate) mod bitmask;
mod validate;
mod wire;

use crate::error::GraphError;
use crate::function::{Function, Placeholder};
use crate::graph::bitmask::Bitmask;
use crate::types::{IndexSet, NodeId, OutputMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Source of process-unique graph identities, used to reject handles that
/// belong to a different template.
static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

/// Behaviour of a node when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Runs the wrapped user callable on the populated input slots.
    Standard,
    /// Replicates its single input token to every output-map entry.
    Split,
    /// Packs its input tokens, in slot order, into one output token.
    Merge,
}

/// One node of a graph template.
///
/// Instances share these specs unchanged through `Arc`s; per-run mutable
/// state (input slots, pending counter, fired flag) lives in the instance.
#[derive(Debug)]
pub(crate) struct NodeSpec {
    pub(crate) id: NodeId,
    pub(crate) kind: NodeKind,
    pub(crate) input_size: usize,
    pub(crate) output_size: usize,
    /// Deduplicated successor ids in insertion order; drives the validation
    /// traversal and the scheduler's readiness sweep.
    pub(crate) successors: IndexSet<NodeId>,
    /// The i-th entry receives the node's i-th output value.
    pub(crate) output_map: OutputMap,
    /// Which input slots already have a producer.
    pub(crate) dependents: Bitmask,
    pub(crate) is_output: bool,
    pub(crate) function: Arc<dyn Function>,
}

/// Handle to a node of a graph template.
///
/// Returned by the node-adding builder operations and passed back to the
/// wiring operations. Handles are cheap to clone and carry the node's
/// arities, so they stay usable as pure accessors after the template is
/// frozen. A handle created with [`Instruction::default`] is unset and
/// rejected by every builder operation.
#[derive(Debug, Clone)]
pub struct Instruction {
    node: NodeId,
    graph_id: u64,
    kind: NodeKind,
    input_size: usize,
    output_size: usize,
    function: Option<Arc<dyn Function>>,
}

impl Default for Instruction {
    /// An unset handle; builder operations reject it with
    /// [`GraphError::NullInstruction`].
    fn default() -> Self {
        Self {
            node: 0,
            graph_id: 0,
            kind: NodeKind::Standard,
            input_size: 0,
            output_size: 0,
            function: None,
        }
    }
}

impl Instruction {
    /// Id of the node this handle refers to.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.node
    }

    /// Input arity of the node.
    #[must_use]
    pub fn input_size(&self) -> usize {
        self.input_size
    }

    /// Output arity of the node.
    #[must_use]
    pub fn output_size(&self) -> usize {
        self.output_size
    }

    pub(crate) fn is_null(&self) -> bool {
        self.graph_id == 0
    }
}

/// Mutable builder and, once validated, immutable template of a macro
/// data flow graph.
///
/// A template is built by appending nodes and wiring their outputs to
/// other nodes' input slots, then marking one entry node and one terminal
/// node. [`validate`](Graph::validate) checks the construction invariants
/// and freezes the template; from then on it may seed any number of
/// concurrent runs but can no longer be modified.
#[must_use]
#[derive(Debug)]
pub struct Graph {
    pub(crate) nodes: Vec<Arc<NodeSpec>>,
    pub(crate) input_node: Option<NodeId>,
    pub(crate) output_node: Option<NodeId>,
    graph_id: u64,
    validated: AtomicBool,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    /// Create an empty template.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            input_node: None,
            output_node: None,
            graph_id: NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed),
            validated: AtomicBool::new(false),
        }
    }

    /// Append a standard node wrapping `function`; arities are taken from
    /// its declaration.
    ///
    /// # Errors
    /// [`GraphError::ModifiedAfterValidation`] once the template is frozen.
    pub fn add_function(
        &mut self,
        function: impl Function + 'static,
    ) -> Result<Instruction, GraphError> {
        self.ensure_mutable()?;
        let input_size = function.arity();
        let output_size = function.output_arity();
        Ok(self.push_node(NodeKind::Standard, input_size, output_size, Arc::new(function)))
    }

    /// Append a split node replicating one input token to `fan` outputs.
    ///
    /// # Errors
    /// [`GraphError::ZeroFanArity`] when `fan` is zero, or
    /// [`GraphError::ModifiedAfterValidation`] once the template is frozen.
    pub fn add_split(&mut self, fan: usize) -> Result<Instruction, GraphError> {
        self.ensure_mutable()?;
        if fan < 1 {
            return Err(GraphError::ZeroFanArity);
        }
        Ok(self.push_node(NodeKind::Split, 1, fan, Arc::new(Placeholder)))
    }

    /// Append a merge node packing `fan` input tokens, in slot order, into
    /// one output token.
    ///
    /// # Errors
    /// [`GraphError::ZeroFanArity`] when `fan` is zero, or
    /// [`GraphError::ModifiedAfterValidation`] once the template is frozen.
    pub fn add_merge(&mut self, fan: usize) -> Result<Instruction, GraphError> {
        self.ensure_mutable()?;
        if fan < 1 {
            return Err(GraphError::ZeroFanArity);
        }
        Ok(self.push_node(NodeKind::Merge, fan, 1, Arc::new(Placeholder)))
    }

    /// Append a node with the same kind, arities, and function as `instr`,
    /// but no wiring. The source handle may come from a different template;
    /// the clone only shares the function, never the wiring.
    ///
    /// # Errors
    /// [`GraphError::NullInstruction`] for an unset handle, or
    /// [`GraphError::ModifiedAfterValidation`] once the template is frozen.
    pub fn clone_node(&mut self, instr: &Instruction) -> Result<Instruction, GraphError> {
        self.ensure_mutable()?;
        let function = instr
            .function
            .as_ref()
            .ok_or(GraphError::NullInstruction)?;
        Ok(self.push_node(
            instr.kind,
            instr.input_size,
            instr.output_size,
            Arc::clone(function),
        ))
    }

    /// Designate `instr` as the node seeded with a run's input arguments.
    ///
    /// The node must already route every output and must not receive tokens
    /// from any other node. Re-marking replaces the previous choice.
    ///
    /// # Errors
    /// [`GraphError::IncompleteOutputMap`] or
    /// [`GraphError::InputHasIncomingEdges`] when the node does not qualify,
    /// plus the usual handle and freeze checks.
    pub fn mark_as_input(&mut self, instr: &Instruction) -> Result<(), GraphError> {
        self.ensure_mutable()?;
        self.check_owned(instr)?;
        let node = &self.nodes[instr.node];
        if node.output_map.len() != node.output_size {
            return Err(GraphError::IncompleteOutputMap { node: instr.node });
        }
        if !node.dependents.all_zeros() {
            return Err(GraphError::InputHasIncomingEdges { node: instr.node });
        }
        self.input_node = Some(instr.node);
        Ok(())
    }

    /// Designate `instr` as the terminal node whose output vector becomes
    /// the run result.
    ///
    /// The node must route nothing and every one of its input slots must be
    /// wired. Re-marking replaces the previous choice.
    ///
    /// # Errors
    /// [`GraphError::OutputHasOutgoingEdges`] or
    /// [`GraphError::OutputNotFullyWired`] when the node does not qualify,
    /// plus the usual handle and freeze checks.
    pub fn mark_as_output(&mut self, instr: &Instruction) -> Result<(), GraphError> {
        self.ensure_mutable()?;
        self.check_owned(instr)?;
        let node = &self.nodes[instr.node];
        if !node.output_map.is_empty() {
            return Err(GraphError::OutputHasOutgoingEdges { node: instr.node });
        }
        if !node.dependents.all_set() {
            return Err(GraphError::OutputNotFullyWired { node: instr.node });
        }
        if let Some(prev) = self.output_node.take() {
            Self::node_mut(&mut self.nodes, prev).is_output = false;
        }
        Self::node_mut(&mut self.nodes, instr.node).is_output = true;
        self.output_node = Some(instr.node);
        Ok(())
    }

    /// Number of nodes in the template.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the template has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether [`validate`](Graph::validate) has succeeded.
    #[must_use]
    pub fn is_validated(&self) -> bool {
        self.validated.load(Ordering::Acquire)
    }

    /// Id of the node marked as input, if any.
    #[must_use]
    pub fn input_node(&self) -> Option<NodeId> {
        self.input_node
    }

    /// Id of the node marked as output, if any.
    #[must_use]
    pub fn output_node(&self) -> Option<NodeId> {
        self.output_node
    }

    /// Successor adjacency of every node, for diagnostics and tests.
    #[must_use]
    pub fn adjacency(&self) -> Vec<(NodeId, Vec<NodeId>)> {
        self.nodes
            .iter()
            .map(|node| (node.id, node.successors.iter().copied().collect()))
            .collect()
    }

    fn push_node(
        &mut self,
        kind: NodeKind,
        input_size: usize,
        output_size: usize,
        function: Arc<dyn Function>,
    ) -> Instruction {
        let id = self.nodes.len();
        self.nodes.push(Arc::new(NodeSpec {
            id,
            kind,
            input_size,
            output_size,
            successors: IndexSet::default(),
            output_map: OutputMap::new(),
            dependents: Bitmask::new(input_size),
            is_output: false,
            function: Arc::clone(&function),
        }));
        Instruction {
            node: id,
            graph_id: self.graph_id,
            kind,
            input_size,
            output_size,
            function: Some(function),
        }
    }

    fn ensure_mutable(&mut self) -> Result<(), GraphError> {
        if *self.validated.get_mut() {
            Err(GraphError::ModifiedAfterValidation)
        } else {
            Ok(())
        }
    }

    fn check_owned(&self, instr: &Instruction) -> Result<(), GraphError> {
        if instr.is_null() {
            return Err(GraphError::NullInstruction);
        }
        if instr.graph_id != self.graph_id {
            return Err(GraphError::ForeignInstruction { node: instr.node });
        }
        Ok(())
    }

    fn node_mut(nodes: &mut [Arc<NodeSpec>], id: NodeId) -> &mut NodeSpec {
        // Builder calls are rejected after validation, and instances (the
        // only other holders of node specs) are created from validated
        // templates only, so the specs are still unshared here.
        Arc::get_mut(&mut nodes[id]).expect("Graph::node_mut: spec shared before validation")
    }

    pub(crate) fn mark_validated(&self) {
        self.validated.store(true, Ordering::Release);
    }
}
