//! Builder API for machine definitions.
//!
//! A definition is plain data: root regions, per-state tables and the
//! factories for handlers, behaviors and logic units. It is validated once
//! by [`MachineBuilder::build`] and then shared by every machine run from
//! it.

pub mod error;
pub mod machine;
pub mod macros;
pub mod region;
pub mod state;
pub mod transition;

pub use error::BuildError;
pub use machine::{MachineBuilder, MachineDefinition};
pub use region::RegionDef;
pub use state::StateDef;
pub use transition::TransitionRule;
