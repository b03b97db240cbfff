//! State identity trait for hierarchical machines.
//!
//! A machine lists every state it can ever be in as one enum. The runtime
//! never stores behavior in these values: they name a node in the hierarchy
//! and key its static definition.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

/// Trait for state identities.
///
/// All methods are pure. A value of this type identifies one state of the
/// hierarchy; the per-activation data lives in the state's handler.
///
/// # Required Traits
///
/// - `Clone` + `Eq` + `Hash`: identities key the definition tables
/// - `Debug`: identities appear in logs and errors
/// - `Serialize` + `Deserialize`: identities appear in history and snapshots
///
/// # Example
///
/// ```rust
/// use orthostate::core::State;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
/// enum Mission {
///     Navigate,
///     Dock,
///     Done,
/// }
///
/// impl State for Mission {
///     fn name(&self) -> &str {
///         match self {
///             Self::Navigate => "Navigate",
///             Self::Dock => "Dock",
///             Self::Done => "Done",
///         }
///     }
///
///     fn is_final(&self) -> bool {
///         matches!(self, Self::Done)
///     }
/// }
/// ```
pub trait State:
    Clone + Eq + Hash + Debug + Serialize + for<'de> Deserialize<'de> + Send + Sync + 'static
{
    /// Get the state's name for display/logging.
    fn name(&self) -> &str;

    /// Check if this is a final (terminal) state.
    ///
    /// The machine finishes once the current state of every root region is
    /// final. Final states nested inside other states have no special
    /// meaning.
    ///
    /// Default implementation returns `false`.
    fn is_final(&self) -> bool {
        false
    }
}
