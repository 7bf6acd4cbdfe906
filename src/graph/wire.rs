use super::{Graph, Instruction};
use crate::error::GraphError;
use crate::types::NodeId;
use rustc_hash::FxHashSet;

impl Graph {
    /// Append one output-map entry: the producer's next output token is
    /// delivered to `slot` of the target node.
    ///
    /// # Errors
    /// [`GraphError::OutputMapFull`] when every output is already routed,
    /// [`GraphError::SlotOutOfRange`], [`GraphError::SlotAlreadyWired`],
    /// [`GraphError::SelfLoop`], plus the usual handle and freeze checks.
    /// A failure leaves the template untouched.
    pub fn add_output(
        &mut self,
        from: &Instruction,
        target: (&Instruction, usize),
    ) -> Result<(), GraphError> {
        self.ensure_mutable()?;
        self.check_owned(from)?;
        let (to, slot) = target;
        self.check_owned(to)?;
        self.wire(from.node, to.node, slot)
    }

    /// Assign the full output map at once. The current map must be empty
    /// and `map` must have exactly `output_size` entries; each entry is
    /// subject to the same checks as [`add_output`](Graph::add_output).
    ///
    /// # Errors
    /// [`GraphError::OutputMapFull`], [`GraphError::OutputMapSize`], or any
    /// per-entry wiring error. All entries are checked before any is
    /// applied, so a failure leaves the template untouched.
    pub fn set_output_map(
        &mut self,
        from: &Instruction,
        map: &[(&Instruction, usize)],
    ) -> Result<(), GraphError> {
        self.ensure_mutable()?;
        self.check_owned(from)?;
        for &(to, _) in map {
            self.check_owned(to)?;
        }
        {
            let producer = &self.nodes[from.node];
            if !producer.output_map.is_empty() {
                return Err(GraphError::OutputMapFull { node: from.node });
            }
            if map.len() != producer.output_size {
                return Err(GraphError::OutputMapSize {
                    node: from.node,
                    expected: producer.output_size,
                    got: map.len(),
                });
            }
        }
        let mut batch = FxHashSet::default();
        for &(to, slot) in map {
            self.check_entry(from.node, to.node, slot)?;
            if !batch.insert((to.node, slot)) {
                return Err(GraphError::SlotAlreadyWired {
                    node: to.node,
                    slot,
                });
            }
        }
        for &(to, slot) in map {
            self.commit_entry(from.node, to.node, slot);
        }
        Ok(())
    }

    /// Broadcast helper: route the producer's remaining outputs, in order,
    /// to the consumers' unwired input slots in declaration order.
    ///
    /// Successive calls continue where the previous one stopped on both
    /// sides: the producer side resumes at its first unrouted output, the
    /// consumer side at its first unwired slot. Wiring stops once the
    /// producer's outputs or every consumer's slots are exhausted.
    ///
    /// # Errors
    /// [`GraphError::SelfLoop`] when the producer appears among the
    /// consumers, plus the usual handle and freeze checks. A failure leaves
    /// the template untouched.
    pub fn send_to(
        &mut self,
        from: &Instruction,
        consumers: &[&Instruction],
    ) -> Result<(), GraphError> {
        self.ensure_mutable()?;
        self.check_owned(from)?;
        for &to in consumers {
            self.check_owned(to)?;
        }
        if consumers.iter().any(|to| to.node == from.node) {
            return Err(GraphError::SelfLoop { node: from.node });
        }
        for &to in consumers {
            loop {
                if self.map_is_full(from.node) {
                    return Ok(());
                }
                let Some(slot) = self.nodes[to.node].dependents.first_unset() else {
                    break;
                };
                self.wire(from.node, to.node, slot)?;
            }
        }
        Ok(())
    }

    /// Gather helper: fill the consumer's unwired input slots, in order,
    /// from successive producers' unrouted outputs.
    ///
    /// The dual of [`send_to`](Graph::send_to), with the same continuation
    /// behaviour: each producer contributes its remaining outputs until the
    /// consumer's slots run out.
    ///
    /// # Errors
    /// [`GraphError::SelfLoop`] when the consumer appears among the
    /// producers, plus the usual handle and freeze checks. A failure leaves
    /// the template untouched.
    pub fn gather_from(
        &mut self,
        into: &Instruction,
        producers: &[&Instruction],
    ) -> Result<(), GraphError> {
        self.ensure_mutable()?;
        self.check_owned(into)?;
        for &from in producers {
            self.check_owned(from)?;
        }
        if producers.iter().any(|from| from.node == into.node) {
            return Err(GraphError::SelfLoop { node: into.node });
        }
        for &from in producers {
            loop {
                if self.map_is_full(from.node) {
                    break;
                }
                let Some(slot) = self.nodes[into.node].dependents.first_unset() else {
                    return Ok(());
                };
                self.wire(from.node, into.node, slot)?;
            }
        }
        Ok(())
    }

    /// Check and apply a single output-map entry.
    fn wire(&mut self, from: NodeId, to: NodeId, slot: usize) -> Result<(), GraphError> {
        if self.map_is_full(from) {
            return Err(GraphError::OutputMapFull { node: from });
        }
        self.check_entry(from, to, slot)?;
        self.commit_entry(from, to, slot);
        Ok(())
    }

    fn map_is_full(&self, node: NodeId) -> bool {
        let spec = &self.nodes[node];
        spec.output_map.len() >= spec.output_size
    }

    fn check_entry(&self, from: NodeId, to: NodeId, slot: usize) -> Result<(), GraphError> {
        if from == to {
            return Err(GraphError::SelfLoop { node: from });
        }
        let consumer = &self.nodes[to];
        if slot >= consumer.input_size {
            return Err(GraphError::SlotOutOfRange {
                node: to,
                slot,
                input_size: consumer.input_size,
            });
        }
        if consumer.dependents.is_set(slot) {
            return Err(GraphError::SlotAlreadyWired { node: to, slot });
        }
        Ok(())
    }

    fn commit_entry(&mut self, from: NodeId, to: NodeId, slot: usize) {
        let newly = Self::node_mut(&mut self.nodes, to).dependents.set(slot);
        debug_assert!(newly, "Graph::commit_entry: slot checked unwired");
        let producer = Self::node_mut(&mut self.nodes, from);
        producer.successors.insert(to);
        producer.output_map.push((to, slot));
    }
}
