use crate::token::Token;
use crate::types::TokenVec;
use core::fmt::Debug;

/// A node's computation: an opaque callable of fixed arity producing a
/// fixed-size vector of outputs.
///
/// Both arities are declared at construction time and never change; the
/// graph builder sizes input slots and output maps from them. `invoke`
/// receives the input tokens in slot order and must return exactly
/// [`output_arity`](Function::output_arity) tokens, the i-th of which is
/// routed through the i-th output-map entry.
///
/// Payload types are the wiring's contract: the builder decides which
/// producer output lands in which consumer slot, and a dynamic type
/// mismatch at fire time is a bug in the graph definition, not a condition
/// the engine diagnoses.
pub trait Function: Debug + Send + Sync {
    /// Declared number of input tokens.
    fn arity(&self) -> usize;

    /// Declared number of output tokens.
    fn output_arity(&self) -> usize;

    /// Run the callable on a complete input tuple.
    fn invoke(&self, inputs: &[Token]) -> TokenVec;
}

/// Adapter turning a closure into a [`Function`] with declared arities.
///
/// The closure receives the input tokens in slot order and must return
/// exactly `output_arity` tokens.
#[derive(derive_more::Debug)]
pub struct FnNode<F> {
    arity: usize,
    output_arity: usize,
    #[debug(skip)]
    callable: F,
}

impl<F> FnNode<F>
where
    F: Fn(&[Token]) -> TokenVec + Send + Sync,
{
    /// Wrap `callable` with the given input and output arities.
    pub fn new(arity: usize, output_arity: usize, callable: F) -> Self {
        Self {
            arity,
            output_arity,
            callable,
        }
    }
}

impl<F> Function for FnNode<F>
where
    F: Fn(&[Token]) -> TokenVec + Send + Sync,
{
    fn arity(&self) -> usize {
        self.arity
    }

    fn output_arity(&self) -> usize {
        self.output_arity
    }

    fn invoke(&self, inputs: &[Token]) -> TokenVec {
        (self.callable)(inputs)
    }
}

/// Stand-in carried by split and merge nodes, whose firing is handled by
/// the node engine directly.
#[derive(Debug, Default)]
pub(crate) struct Placeholder;

impl Function for Placeholder {
    fn arity(&self) -> usize {
        0
    }

    fn output_arity(&self) -> usize {
        0
    }

    fn invoke(&self, _inputs: &[Token]) -> TokenVec {
        unreachable!("Placeholder::invoke: split/merge nodes never call their function")
    }
}
