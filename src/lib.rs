//! Orthostate: a hierarchical state machine runtime with orthogonal regions
//!
//! Orthostate orchestrates long-running asynchronous operations (moving a
//! base, closing a gripper, waiting on a sensor) as a statechart. States are
//! arranged in parallel regions, events are dispatched one at a time to
//! completion, and external operations report back by posting events.
//!
//! # Core Concepts
//!
//! - **State**: A value of a user enum implementing the `State` trait
//! - **Region**: A parallel sub-machine with exactly one current state
//! - **Client**: A long-lived, lazily created owner of an external resource
//! - **Behavior**: A per-activation strategy bound to a region's client
//! - **Event**: The only way anything reaches the machine, from any thread
//!
//! # Example
//!
//! ```rust
//! use orthostate::builder::{MachineBuilder, RegionDef, StateDef};
//! use orthostate::core::Event;
//! use orthostate::runtime::{Reaction, StateContext, StateHandler};
//! use orthostate::{state_enum, StateMachine};
//!
//! state_enum! {
//!     enum Patrol {
//!         Forward,
//!         Rotate,
//!         Done,
//!     }
//!     final: [Done]
//! }
//!
//! #[derive(Default)]
//! struct CountTicks {
//!     ticks: u32,
//! }
//!
//! impl StateHandler<Patrol> for CountTicks {
//!     fn react(&mut self, _event: &Event, ctx: &mut StateContext<'_, Patrol>) -> Reaction {
//!         self.ticks += 1;
//!         if self.ticks == 2 {
//!             ctx.post(Event::new("rotated"));
//!         }
//!         Reaction::Discard
//!     }
//! }
//!
//! let definition = MachineBuilder::new()
//!     .region(RegionDef::new("main", Patrol::Forward).states([Patrol::Rotate, Patrol::Done]))
//!     .state(
//!         StateDef::new(Patrol::Forward)
//!             .on("moved", Patrol::Rotate)
//!             .on("stop", Patrol::Done),
//!     )
//!     .state(
//!         StateDef::new(Patrol::Rotate)
//!             .react_to("tick")
//!             .handler(CountTicks::default)
//!             .on("rotated", Patrol::Forward),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let mut machine = StateMachine::new(definition);
//! machine.start();
//! for kind in ["moved", "tick", "tick"] {
//!     machine.post_event(Event::new(kind)).unwrap();
//! }
//! machine.process_pending();
//! assert_eq!(machine.active_configuration(), vec![Patrol::Forward]);
//!
//! machine.post_event(Event::new("stop")).unwrap();
//! machine.process_pending();
//! assert!(machine.is_finished());
//! ```

pub mod bridge;
pub mod builder;
pub mod client;
pub mod config;
pub mod core;
pub mod error;
pub mod global;
pub mod logic;
pub mod runtime;
pub mod snapshot;
pub mod validation;

// Re-export commonly used types
pub use builder::{BuildError, MachineBuilder, MachineDefinition, RegionDef, StateDef, TransitionRule};
pub use client::{Client, ClientBehavior, ClientId, CompletionNotifier};
pub use config::{ClientParams, ConfigError, MachineConfig};
pub use core::{Event, EventKind, Guard, State, StateHistory, StateTransition};
pub use error::{BehaviorError, ClientError, ConfigurationError, MachineError};
pub use global::GlobalData;
pub use runtime::{EventSender, Reaction, StateContext, StateHandler, StateMachine};
pub use snapshot::{MachineSnapshot, SnapshotError};
