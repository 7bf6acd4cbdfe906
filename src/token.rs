use core::any::Any;
use core::fmt;
use std::sync::Arc;

/// A single typed value flowing along one edge of the graph.
///
/// Tokens are immutable once produced and cheap to clone: the payload lives
/// behind a shared pointer, so a split node hands the same value to every
/// successor without copying it. Ownership of a token moves from the
/// producing node's output vector into the consumer's input slot.
///
/// The payload type is erased; wiring is the caller's type contract. A
/// consumer downcasts back to the concrete type it expects from the
/// producer on the other end of the edge.
#[derive(Clone)]
pub struct Token(Arc<dyn Any + Send + Sync>);

impl Token {
    /// Wrap a value into a token.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Borrow the payload as `T`, or `None` on a type mismatch.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_ref().downcast_ref()
    }

    /// Whether the payload is a `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.0.as_ref().is::<T>()
    }

    /// Clone the payload out as `T`.
    ///
    /// # Panics
    /// If the payload is not a `T`. A mismatch here is a bug in the graph
    /// definition, not a runtime condition worth recovering from.
    #[must_use]
    pub fn value<T: Any + Clone>(&self) -> T {
        self.downcast_ref::<T>()
            .expect("Token::value: payload type mismatch")
            .clone()
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("Token(..)")
    }
}
