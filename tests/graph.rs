#![allow(missing_docs)]

use mdf::error::GraphError;
use mdf::function::FnNode;
use mdf::graph::{Graph, Instruction};
use mdf::token::Token;
use mdf::types::TokenVec;

fn identity() -> FnNode<impl Fn(&[Token]) -> TokenVec + Send + Sync> {
    FnNode::new(1, 1, |inputs: &[Token]| vec![inputs[0].clone()])
}

fn source(outputs: usize) -> FnNode<impl Fn(&[Token]) -> TokenVec + Send + Sync> {
    FnNode::new(0, outputs, move |_: &[Token]| {
        (0..outputs).map(|i| Token::new(i)).collect()
    })
}

fn sink(inputs: usize) -> FnNode<impl Fn(&[Token]) -> TokenVec + Send + Sync> {
    FnNode::new(inputs, 1, |inputs: &[Token]| vec![inputs[0].clone()])
}

/// Minimal valid template: source -> sink.
fn chain() -> Graph {
    let mut graph = Graph::new();
    let a = graph.add_function(source(1)).unwrap();
    let b = graph.add_function(sink(1)).unwrap();
    graph.add_output(&a, (&b, 0)).unwrap();
    graph.mark_as_input(&a).unwrap();
    graph.mark_as_output(&b).unwrap();
    graph
}

#[test]
fn validate_accepts_chain_and_is_idempotent() {
    let graph = chain();
    assert!(!graph.is_validated());
    graph.validate().unwrap();
    assert!(graph.is_validated());
    graph.validate().unwrap();
}

#[test]
fn frozen_template_rejects_every_builder_call() {
    let mut graph = chain();
    graph.validate().unwrap();

    let foreign = chain().add_function(identity()).unwrap();
    assert_eq!(
        graph.add_function(identity()).unwrap_err(),
        GraphError::ModifiedAfterValidation,
    );
    assert_eq!(
        graph.add_split(2).unwrap_err(),
        GraphError::ModifiedAfterValidation,
    );
    assert_eq!(
        graph.add_merge(2).unwrap_err(),
        GraphError::ModifiedAfterValidation,
    );
    assert_eq!(
        graph.clone_node(&foreign).unwrap_err(),
        GraphError::ModifiedAfterValidation,
    );
    assert_eq!(
        graph.add_output(&foreign, (&foreign, 0)).unwrap_err(),
        GraphError::ModifiedAfterValidation,
    );
    assert_eq!(
        graph.mark_as_input(&foreign).unwrap_err(),
        GraphError::ModifiedAfterValidation,
    );
}

#[test]
fn foreign_handle_is_rejected() {
    let mut graph = Graph::new();
    let mut other = Graph::new();
    let ours = graph.add_function(source(1)).unwrap();
    let theirs = other.add_function(sink(1)).unwrap();

    assert!(matches!(
        graph.add_output(&ours, (&theirs, 0)),
        Err(GraphError::ForeignInstruction { .. }),
    ));
    assert!(matches!(
        graph.mark_as_output(&theirs),
        Err(GraphError::ForeignInstruction { .. }),
    ));
    assert!(matches!(
        graph.send_to(&ours, &[&theirs]),
        Err(GraphError::ForeignInstruction { .. }),
    ));
}

#[test]
fn null_handle_is_rejected() {
    let mut graph = Graph::new();
    let unset = Instruction::default();
    assert_eq!(
        graph.clone_node(&unset).unwrap_err(),
        GraphError::NullInstruction,
    );
    assert_eq!(
        graph.mark_as_input(&unset).unwrap_err(),
        GraphError::NullInstruction,
    );
    let node = graph.add_function(source(1)).unwrap();
    assert_eq!(
        graph.add_output(&node, (&unset, 0)).unwrap_err(),
        GraphError::NullInstruction,
    );
}

#[test]
fn split_and_merge_require_nonzero_fan() {
    let mut graph = Graph::new();
    assert_eq!(graph.add_split(0).unwrap_err(), GraphError::ZeroFanArity);
    assert_eq!(graph.add_merge(0).unwrap_err(), GraphError::ZeroFanArity);

    let split = graph.add_split(3).unwrap();
    assert_eq!(split.input_size(), 1);
    assert_eq!(split.output_size(), 3);
    let merge = graph.add_merge(3).unwrap();
    assert_eq!(merge.input_size(), 3);
    assert_eq!(merge.output_size(), 1);
}

#[test]
fn wiring_checks_slot_range_and_duplicates() {
    let mut graph = Graph::new();
    let a = graph.add_function(source(2)).unwrap();
    let b = graph.add_function(sink(1)).unwrap();

    assert_eq!(
        graph.add_output(&a, (&b, 3)).unwrap_err(),
        GraphError::SlotOutOfRange {
            node: b.id(),
            slot: 3,
            input_size: 1,
        },
    );
    graph.add_output(&a, (&b, 0)).unwrap();
    assert_eq!(
        graph.add_output(&a, (&b, 0)).unwrap_err(),
        GraphError::SlotAlreadyWired { node: b.id(), slot: 0 },
    );
}

#[test]
fn self_loops_are_rejected() {
    let mut graph = Graph::new();
    let a = graph.add_function(identity()).unwrap();
    assert_eq!(
        graph.add_output(&a, (&a, 0)).unwrap_err(),
        GraphError::SelfLoop { node: a.id() },
    );
    assert_eq!(
        graph.send_to(&a, &[&a]).unwrap_err(),
        GraphError::SelfLoop { node: a.id() },
    );
    assert_eq!(
        graph.gather_from(&a, &[&a]).unwrap_err(),
        GraphError::SelfLoop { node: a.id() },
    );
}

#[test]
fn output_map_cannot_overflow() {
    let mut graph = Graph::new();
    let a = graph.add_function(source(1)).unwrap();
    let b = graph.add_function(sink(2)).unwrap();
    graph.add_output(&a, (&b, 0)).unwrap();
    assert_eq!(
        graph.add_output(&a, (&b, 1)).unwrap_err(),
        GraphError::OutputMapFull { node: a.id() },
    );
}

#[test]
fn set_output_map_checks_length_and_emptiness() {
    let mut graph = Graph::new();
    let a = graph.add_function(source(2)).unwrap();
    let b = graph.add_function(sink(2)).unwrap();

    assert_eq!(
        graph.set_output_map(&a, &[(&b, 0)]).unwrap_err(),
        GraphError::OutputMapSize {
            node: a.id(),
            expected: 2,
            got: 1,
        },
    );

    graph.set_output_map(&a, &[(&b, 0), (&b, 1)]).unwrap();
    assert_eq!(
        graph.set_output_map(&a, &[(&b, 0), (&b, 1)]).unwrap_err(),
        GraphError::OutputMapFull { node: a.id() },
    );
}

#[test]
fn set_output_map_failure_leaves_template_untouched() {
    let mut graph = Graph::new();
    let a = graph.add_function(source(2)).unwrap();
    let b = graph.add_function(sink(2)).unwrap();

    // Second entry collides with the first within the batch; nothing may
    // be applied.
    assert_eq!(
        graph.set_output_map(&a, &[(&b, 0), (&b, 0)]).unwrap_err(),
        GraphError::SlotAlreadyWired { node: b.id(), slot: 0 },
    );

    // Both slots are still free.
    graph.set_output_map(&a, &[(&b, 1), (&b, 0)]).unwrap();
}

#[test]
fn duplicate_successors_collapse_in_adjacency() {
    let mut graph = Graph::new();
    let a = graph.add_function(source(2)).unwrap();
    let b = graph.add_function(sink(2)).unwrap();
    graph.add_output(&a, (&b, 0)).unwrap();
    graph.add_output(&a, (&b, 1)).unwrap();

    let adjacency = graph.adjacency();
    assert_eq!(adjacency[a.id()], (a.id(), vec![b.id()]));
    assert_eq!(adjacency[b.id()], (b.id(), vec![]));
}

#[test]
fn mark_as_input_requires_full_map_and_no_incoming() {
    let mut graph = Graph::new();
    let a = graph.add_function(source(1)).unwrap();
    let b = graph.add_function(identity()).unwrap();
    let c = graph.add_function(sink(1)).unwrap();

    assert_eq!(
        graph.mark_as_input(&a).unwrap_err(),
        GraphError::IncompleteOutputMap { node: a.id() },
    );

    graph.add_output(&a, (&b, 0)).unwrap();
    graph.add_output(&b, (&c, 0)).unwrap();
    assert_eq!(
        graph.mark_as_input(&b).unwrap_err(),
        GraphError::InputHasIncomingEdges { node: b.id() },
    );
    graph.mark_as_input(&a).unwrap();
    assert_eq!(graph.input_node(), Some(a.id()));
}

#[test]
fn mark_as_output_requires_empty_map_and_full_wiring() {
    let mut graph = Graph::new();
    let a = graph.add_function(source(1)).unwrap();
    let b = graph.add_function(identity()).unwrap();
    let c = graph.add_function(sink(1)).unwrap();
    graph.add_output(&a, (&b, 0)).unwrap();

    assert_eq!(
        graph.mark_as_output(&b).unwrap_err(),
        GraphError::OutputHasOutgoingEdges { node: b.id() },
    );
    assert_eq!(
        graph.mark_as_output(&c).unwrap_err(),
        GraphError::OutputNotFullyWired { node: c.id() },
    );

    graph.add_output(&b, (&c, 0)).unwrap();
    graph.mark_as_output(&c).unwrap();
    assert_eq!(graph.output_node(), Some(c.id()));
}

#[test]
fn markers_must_be_set_and_distinct() {
    let graph = Graph::new();
    assert_eq!(graph.validate().unwrap_err(), GraphError::InputOrOutputUnset);

    // An arity-less node qualifies for both markers; validation must then
    // reject the coincidence.
    let mut graph = Graph::new();
    let only = graph
        .add_function(FnNode::new(0, 0, |_: &[Token]| vec![]))
        .unwrap();
    graph.mark_as_input(&only).unwrap();
    graph.mark_as_output(&only).unwrap();
    assert_eq!(
        graph.validate().unwrap_err(),
        GraphError::InputOutputNotDistinct,
    );
}

#[test]
fn validation_recheck_catches_wiring_added_after_marking() {
    // The input node qualified when it was marked; an edge wired into it
    // afterwards must still fail validation.
    let mut graph = Graph::new();
    let a = graph.add_function(identity()).unwrap();
    let b = graph.add_function(sink(1)).unwrap();
    graph.add_output(&a, (&b, 0)).unwrap();
    graph.mark_as_input(&a).unwrap();
    graph.mark_as_output(&b).unwrap();
    let late = graph.add_function(source(1)).unwrap();
    graph.add_output(&late, (&a, 0)).unwrap();
    assert_eq!(
        graph.validate().unwrap_err(),
        GraphError::InputHasIncomingEdges { node: a.id() },
    );

    // Same for an output node that grows an outgoing edge after marking.
    let mut graph = Graph::new();
    let a = graph.add_function(source(1)).unwrap();
    let b = graph.add_function(identity()).unwrap();
    graph.add_output(&a, (&b, 0)).unwrap();
    graph.mark_as_input(&a).unwrap();
    graph.mark_as_output(&b).unwrap();
    let tail = graph.add_function(sink(1)).unwrap();
    graph.add_output(&b, (&tail, 0)).unwrap();
    assert_eq!(
        graph.validate().unwrap_err(),
        GraphError::OutputHasOutgoingEdges { node: b.id() },
    );
}

#[test]
fn validation_detects_incomplete_maps_downstream() {
    let mut graph = Graph::new();
    let a = graph.add_function(source(2)).unwrap();
    let b = graph.add_function(identity()).unwrap();
    let c = graph.add_function(sink(1)).unwrap();
    // a routes to both, but b never routes anywhere.
    graph.add_output(&a, (&b, 0)).unwrap();
    graph.add_output(&a, (&c, 0)).unwrap();
    graph.mark_as_input(&a).unwrap();
    graph.mark_as_output(&c).unwrap();

    assert_eq!(
        graph.validate().unwrap_err(),
        GraphError::IncompleteOutputMap { node: b.id() },
    );
}

#[test]
fn validation_detects_cycles() {
    let mut graph = Graph::new();
    let a = graph.add_function(source(1)).unwrap();
    let b = graph.add_function(sink(2)).unwrap();
    let c = graph.add_function(identity()).unwrap();
    let d = graph
        .add_function(FnNode::new(0, 1, |_: &[Token]| vec![Token::new(0)]))
        .unwrap();
    // a -> b.0, b -> c, c -> b.1: a back edge into b.
    graph.add_output(&a, (&b, 0)).unwrap();
    graph.add_output(&b, (&c, 0)).unwrap();
    graph.add_output(&c, (&b, 1)).unwrap();
    graph.mark_as_input(&a).unwrap();
    graph.mark_as_output(&d).unwrap();

    assert_eq!(
        graph.validate().unwrap_err(),
        GraphError::CycleDetected { node: b.id() },
    );
}

#[test]
fn validation_detects_unreachable_nodes() {
    let mut graph = Graph::new();
    let a = graph.add_function(source(1)).unwrap();
    let b = graph.add_function(sink(1)).unwrap();
    let stray = graph.add_function(identity()).unwrap();
    let _ = stray;
    graph.add_output(&a, (&b, 0)).unwrap();
    graph.mark_as_input(&a).unwrap();
    graph.mark_as_output(&b).unwrap();

    assert_eq!(
        graph.validate().unwrap_err(),
        GraphError::UnreachableNodes { visited: 2, total: 3 },
    );
}

#[test]
fn send_to_fans_out_in_declaration_order() {
    let mut graph = Graph::new();
    let producer = graph.add_function(source(3)).unwrap();
    let first = graph.add_function(sink(1)).unwrap();
    let second = graph.add_function(sink(2)).unwrap();
    graph.send_to(&producer, &[&first, &second]).unwrap();

    let adjacency = graph.adjacency();
    assert_eq!(
        adjacency[producer.id()],
        (producer.id(), vec![first.id(), second.id()]),
    );
}

#[test]
fn send_to_continues_where_the_previous_call_stopped() {
    let mut graph = Graph::new();
    let producer = graph.add_function(source(3)).unwrap();
    let first = graph.add_function(identity()).unwrap();
    let second = graph
        .add_function(FnNode::new(2, 2, |inputs: &[Token]| {
            vec![inputs[0].clone(), inputs[1].clone()]
        }))
        .unwrap();

    // First call exhausts `first` and stops; the later call routes the two
    // remaining outputs into `second`.
    graph.send_to(&producer, &[&first]).unwrap();
    graph.send_to(&producer, &[&second]).unwrap();

    graph.mark_as_input(&producer).unwrap();
    let merge = graph.add_merge(3).unwrap();
    // All sinks forward into a merge so the template validates.
    graph.send_to(&first, &[&merge]).unwrap();
    graph.send_to(&second, &[&merge]).unwrap();
    let out = graph.add_function(sink(1)).unwrap();
    graph.send_to(&merge, &[&out]).unwrap();
    graph.mark_as_output(&out).unwrap();
    graph.validate().unwrap();
}

#[test]
fn gather_from_fills_slots_from_successive_producers() {
    let mut graph = Graph::new();
    let left = graph.add_function(source(1)).unwrap();
    let right = graph.add_function(source(2)).unwrap();
    let consumer = graph.add_function(sink(3)).unwrap();
    graph.gather_from(&consumer, &[&left, &right]).unwrap();

    let adjacency = graph.adjacency();
    assert_eq!(adjacency[left.id()], (left.id(), vec![consumer.id()]));
    assert_eq!(adjacency[right.id()], (right.id(), vec![consumer.id()]));
    // Every slot is spoken for: marking the consumer as output succeeds.
    graph.mark_as_output(&consumer).unwrap();
}

#[test]
fn clone_node_copies_shape_but_not_wiring() {
    let mut graph = Graph::new();
    let original = graph.add_function(sink(2)).unwrap();
    let feeder = graph.add_function(source(2)).unwrap();
    graph.add_output(&feeder, (&original, 0)).unwrap();

    let copy = graph.clone_node(&original).unwrap();
    assert_eq!(copy.input_size(), 2);
    assert_eq!(copy.output_size(), 1);
    // The copy starts unwired even though the original has an incoming
    // edge.
    graph.add_output(&feeder, (&copy, 0)).unwrap();
}

#[test]
fn clone_node_works_across_templates() {
    let mut donor = Graph::new();
    let merge = donor.add_merge(4).unwrap();
    let split = donor.add_split(2).unwrap();

    let mut graph = Graph::new();
    let merge_copy = graph.clone_node(&merge).unwrap();
    let split_copy = graph.clone_node(&split).unwrap();
    assert_eq!(merge_copy.input_size(), 4);
    assert_eq!(merge_copy.output_size(), 1);
    assert_eq!(split_copy.input_size(), 1);
    assert_eq!(split_copy.output_size(), 2);
    assert_eq!(graph.len(), 2);
}

#[test]
fn remarking_replaces_the_previous_choice() {
    let mut graph = Graph::new();
    let a = graph.add_function(source(2)).unwrap();
    let b = graph.add_function(sink(1)).unwrap();
    let c = graph.add_function(sink(1)).unwrap();
    graph.add_output(&a, (&b, 0)).unwrap();
    graph.add_output(&a, (&c, 0)).unwrap();

    graph.mark_as_output(&b).unwrap();
    graph.mark_as_output(&c).unwrap();
    assert_eq!(graph.output_node(), Some(c.id()));
}
