//! Macro data flow execution engine.
//!
//! Applications describe a computation as a directed acyclic graph of
//! coarse-grained functions ("nodes") wired together by typed data
//! dependencies ("tokens"), then execute instances of that graph
//! concurrently on a fixed worker pool. The engine:
//! - Validates templates at construction time: slot wiring, output-map
//!   completeness, acyclicity and reachability are all checked before
//!   anything runs, so execution never has to diagnose a malformed graph.
//! - Fires each node exactly once per run, as soon as its last input token
//!   arrives. Readiness is an atomic pending counter; uniqueness of the
//!   firing is a one-shot claim flag, so no two workers ever schedule the
//!   same node of the same run.
//! - Interleaves any number of concurrent runs over one worker pool and
//!   delivers each run's terminal output through a one-shot future.
//!
//! Key modules:
//! - `graph`: the template builder — nodes, wiring, markers, validation.
//! - `function`: the `Function` contract nodes compute with, plus the
//!   `FnNode` closure adapter.
//! - `token`: the type-erased value cell flowing along edges.
//! - `executor`: the worker pool executing template instances.
//! - `future`: one-shot delivery of a run's result.
//! - `error`: construction-time and run-delivery error types.
//!
//! Quick start:
//! 1. Create a [`graph::Graph`]; add nodes with `add_function`,
//!    `add_split` and `add_merge`; wire them with `add_output`,
//!    `set_output_map`, or the `send_to`/`gather_from` helpers.
//! 2. Mark the entry node with `mark_as_input` and the terminal node with
//!    `mark_as_output`, then call `validate`.
//! 3. Create an [`executor::Executor`] and call `run` with the input
//!    tokens; the returned [`future::RunFuture`] resolves with the
//!    terminal node's output vector.
//!
//! A validated template is immutable and may seed any number of concurrent
//! runs. Per-run state lives in an internal instance that shares the
//! template's wiring and is released as soon as its terminal node fires.

/// Construction-time and run-delivery error types.
pub mod error;
/// The fixed worker pool executing instances of validated templates.
pub mod executor;
/// The `Function` contract nodes compute with, and an adapter over
/// closures.
pub mod function;
/// One-shot delivery of a run's terminal output.
pub mod future;
/// Graph templates: node table, wiring, markers, validation.
pub mod graph;
mod instance;
mod sync;
/// The type-erased value cell carried along graph edges.
pub mod token;
/// Common ids and aliases used across the crate.
pub mod types;
