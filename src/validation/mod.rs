//! Definition validation using Stillwater's `Validation`.
//!
//! A definition is checked as a whole and every problem is reported at
//! once, instead of stopping at the first inconsistency.
//!
//! # Example
//!
//! ```rust
//! use orthostate::builder::{RegionDef, StateDef};
//! use orthostate::state_enum;
//! use orthostate::validation::{validate, DefinitionError};
//! use stillwater::validation::Validation;
//!
//! state_enum! {
//!     enum Dock {
//!         Approach,
//!         Align,
//!         Undock,
//!     }
//! }
//!
//! let roots = vec![RegionDef::new("main", Dock::Approach).state(Dock::Align)];
//! let states = vec![
//!     StateDef::new(Dock::Approach).on("near", Dock::Align),
//!     StateDef::new(Dock::Align).on("docked", Dock::Undock),
//! ];
//!
//! match validate(&roots, &states) {
//!     Validation::Failure(errors) => assert_eq!(errors.len(), 1),
//!     Validation::Success(_) => panic!("Undock belongs to no region"),
//! }
//! ```

pub mod rules;
pub mod violations;

pub use rules::validate;
pub use violations::DefinitionError;
