//! Core value types of the machine.
//!
//! This module contains the pure pieces every other module builds on:
//! - State identities via the `State` trait
//! - Events and their kinds
//! - Guard predicates for table transitions
//! - Transition history tracking
//!
//! Nothing in this module touches the event queue or live state nodes.

mod event;
mod guard;
mod history;
mod state;

pub use event::{Completion, Event, EventKind, ABORTED, SUCCEEDED};
pub use guard::Guard;
pub use history::{StateHistory, StateTransition};
pub use state::State;
