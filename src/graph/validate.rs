use super::Graph;
use crate::error::GraphError;
use crate::types::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    New,
    /// On the active DFS spine; reaching an active node again is a back
    /// edge.
    Active,
    Done,
}

impl Graph {
    /// Check the construction invariants and freeze the template.
    ///
    /// Verifies that the input and output nodes are both marked and
    /// distinct, then walks the successor relation depth-first from the
    /// input node: every visited non-terminal node must route all of its
    /// outputs, a back edge is a cycle, and the walk must reach every node
    /// of the template.
    ///
    /// Idempotent: once it has succeeded the template is permanently
    /// frozen and later calls return `Ok` without re-checking.
    ///
    /// # Errors
    /// [`GraphError::InputOrOutputUnset`],
    /// [`GraphError::InputOutputNotDistinct`],
    /// [`GraphError::IncompleteOutputMap`], [`GraphError::CycleDetected`],
    /// or [`GraphError::UnreachableNodes`].
    pub fn validate(&self) -> Result<(), GraphError> {
        if self.is_validated() {
            return Ok(());
        }
        let (input, output) = match (self.input_node, self.output_node) {
            (Some(input), Some(output)) if input == output => {
                return Err(GraphError::InputOutputNotDistinct);
            }
            (Some(input), Some(output)) => (input, output),
            _ => return Err(GraphError::InputOrOutputUnset),
        };
        // The marker preconditions were checked when the nodes were marked,
        // but wiring added since can invalidate them.
        if !self.nodes[input].dependents.all_zeros() {
            return Err(GraphError::InputHasIncomingEdges { node: input });
        }
        if !self.nodes[output].output_map.is_empty() {
            return Err(GraphError::OutputHasOutgoingEdges { node: output });
        }
        if !self.nodes[output].dependents.all_set() {
            return Err(GraphError::OutputNotFullyWired { node: output });
        }
        self.check_from(input, output)?;
        self.mark_validated();
        Ok(())
    }

    fn check_from(&self, input: NodeId, output: NodeId) -> Result<(), GraphError> {
        let mut marks = vec![Mark::New; self.nodes.len()];
        let mut visited = 0usize;
        // Frames of (node, position of the next successor to explore).
        let mut stack: Vec<(NodeId, usize)> = Vec::new();

        self.check_routes_all(input, output)?;
        marks[input] = Mark::Active;
        visited += 1;
        stack.push((input, 0));

        while let Some(&(node, pos)) = stack.last() {
            match self.nodes[node].successors.get_index(pos).copied() {
                None => {
                    marks[node] = Mark::Done;
                    stack.pop();
                }
                Some(succ) => {
                    stack
                        .last_mut()
                        .expect("Graph::check_from: frame just read")
                        .1 += 1;
                    match marks[succ] {
                        Mark::Active => return Err(GraphError::CycleDetected { node: succ }),
                        Mark::Done => {}
                        Mark::New => {
                            self.check_routes_all(succ, output)?;
                            marks[succ] = Mark::Active;
                            visited += 1;
                            stack.push((succ, 0));
                        }
                    }
                }
            }
        }

        if visited != self.nodes.len() {
            return Err(GraphError::UnreachableNodes {
                visited,
                total: self.nodes.len(),
            });
        }
        Ok(())
    }

    /// Every node except the terminal must route each of its outputs.
    fn check_routes_all(&self, node: NodeId, output: NodeId) -> Result<(), GraphError> {
        let spec = &self.nodes[node];
        if node != output && spec.output_map.len() != spec.output_size {
            return Err(GraphError::IncompleteOutputMap { node });
        }
        Ok(())
    }
}
