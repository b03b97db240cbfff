//! Dance Bot
//!
//! A robot that drives forward, rotates in place and repeats the pattern
//! three times before stopping.
//!
//! Key concepts:
//! - Operation states bridging asynchronous clients into events
//! - Abort retries (the navigation stack drops its first goal)
//! - A guarded loop with tagged transitions
//! - Running the machine on a tokio runtime
//!
//! Run with: RUST_LOG=orthostate=debug cargo run --example dance_bot

use orthostate::bridge::OperationState;
use orthostate::builder::{MachineBuilder, RegionDef, StateDef, TransitionRule};
use orthostate::client::{ClientParams, CompletionNotifier, TimerClient, TimerGoal};
use orthostate::core::Event;
use orthostate::runtime::{StateContext, StateHandler};
use orthostate::{state_enum, Client, ClientError, MachineConfig, StateMachine};
use serde_json::json;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

const LAPS: u32 = 3;

state_enum! {
    enum Dance {
        Forward,
        Rotate,
        LoopCheck,
        Done,
    }
    final: [Done]
}

// Simulated navigation stack: reaches a goal after `distance / speed`
// seconds, but drops the very first goal it receives.
struct Navigation {
    speed: f64,
    notifier: CompletionNotifier,
    goals: u32,
    task: Option<JoinHandle<()>>,
}

impl Client for Navigation {
    const NAME: &'static str = "navigation";
    type Goal = f64;

    fn initialize(params: ClientParams<'_>, notifier: CompletionNotifier) -> Result<Self, ClientError> {
        Ok(Self {
            speed: params.get("speed")?.unwrap_or(1.0),
            notifier,
            goals: 0,
            task: None,
        })
    }

    fn send_request(&mut self, distance: f64) -> Result<(), ClientError> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|_| ClientError::NoRuntime { client: Self::NAME })?;
        self.goals += 1;
        let drop_goal = self.goals == 1;
        let travel = Duration::from_secs_f64(distance / self.speed);
        let notifier = self.notifier.clone();

        self.task = Some(handle.spawn(async move {
            tokio::time::sleep(travel).await;
            let _ = if drop_goal {
                notifier.aborted()
            } else {
                notifier.succeeded()
            };
        }));
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn shutdown(&mut self) {
        self.cancel();
    }
}

// Counts laps and asks the loop rules whether to go again.
struct CountLap;

impl StateHandler<Dance> for CountLap {
    fn on_entry(&mut self, ctx: &mut StateContext<'_, Dance>) {
        let laps = ctx.global().get::<u32>("laps").copied().unwrap_or(0) + 1;
        ctx.global_mut().set("laps", laps);
        tracing::info!(lap = laps, "lap complete");
        ctx.post(Event::new("loop_check").with_payload(json!(laps)));
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("orthostate=info".parse()?))
        .compact()
        .init();

    let definition = MachineBuilder::new()
        .region(
            RegionDef::new("main", Dance::Forward).states([Dance::Rotate, Dance::LoopCheck, Dance::Done]),
        )
        .state(
            StateDef::new(Dance::Forward)
                .operation(OperationState::<Navigation>::new(0.5).finishing_with("moved"))
                .on("moved", Dance::Rotate),
        )
        .state(
            StateDef::new(Dance::Rotate)
                .operation(OperationState::<TimerClient>::new(TimerGoal::ticks(4)).finishing_with("rotated"))
                .on("rotated", Dance::LoopCheck),
        )
        .state(
            StateDef::new(Dance::LoopCheck)
                .handler(|| CountLap)
                .rule(
                    TransitionRule::new("loop_check", Dance::Done)
                        .when(|e| e.payload_as::<u32>().is_some_and(|laps| laps >= LAPS))
                        .tag("ENDLOOP"),
                )
                .rule(TransitionRule::new("loop_check", Dance::Forward).tag("LOOP")),
        )
        .build()?;

    let config = MachineConfig::new("dance_bot")
        .with_client("navigation", json!({ "speed": 2.0 }))
        .with_client("timer", json!({ "period_ms": 50 }));

    let mut machine = StateMachine::with_config(definition, config);
    let summary = machine.run().await?;

    println!("\nFinal configuration: {:?}", summary.final_configuration);
    println!(
        "Dispatched {} events, {} transitions",
        summary.stats.events_dispatched, summary.stats.transitions
    );
    println!("\nPath:");
    for transition in machine.history().transitions() {
        println!(
            "  {:<10} {:?} -> {:?} {}",
            transition.region,
            transition.from,
            transition.to,
            transition.tag.as_deref().unwrap_or("")
        );
    }

    Ok(())
}
