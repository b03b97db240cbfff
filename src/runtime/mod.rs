//! The machine runtime: live regions, dispatch and lifecycle.

mod context;
mod dispatch;
mod engine;
mod machine;
mod queue;
mod region;

pub use context::{Passive, Reaction, StateContext, StateHandler};
pub use dispatch::{DispatchReport, Disposition};
pub use engine::MachineStats;
pub use machine::{RunSummary, StateMachine};
pub(crate) use queue::EventQueue;
pub use queue::EventSender;
pub use region::{ActiveState, NodeId, RegionId};
