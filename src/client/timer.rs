//! Periodic timer client.
//!
//! Posts a `timer_tick` event every `period_ms` milliseconds from a tokio
//! task. A goal with a tick budget completes with `succeeded` once the
//! budget is spent.

use super::{Client, ClientId, CompletionNotifier};
use crate::config::ClientParams;
use crate::core::{Event, EventKind};
use crate::error::ClientError;
use serde_json::json;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Kind of the events posted on every timer period.
pub const TIMER_TICK: EventKind = EventKind::from_static("timer_tick");

/// Request accepted by [`TimerClient`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerGoal {
    ticks: Option<u32>,
}

impl TimerGoal {
    /// Tick until cancelled.
    pub fn forever() -> Self {
        Self { ticks: None }
    }

    /// Tick `count` times, then report success.
    pub fn ticks(count: u32) -> Self {
        Self { ticks: Some(count) }
    }
}

pub struct TimerClient {
    period: Duration,
    notifier: CompletionNotifier,
    task: Option<JoinHandle<()>>,
}

impl TimerClient {
    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Client for TimerClient {
    const NAME: &'static str = "timer";
    type Goal = TimerGoal;

    fn initialize(params: ClientParams<'_>, notifier: CompletionNotifier) -> Result<Self, ClientError> {
        let period_ms: u64 = params.require("period_ms")?;
        if period_ms == 0 {
            return Err(ClientError::InvalidParameter {
                client: Self::NAME,
                key: "period_ms".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(Self {
            period: Duration::from_millis(period_ms),
            notifier,
            task: None,
        })
    }

    fn send_request(&mut self, goal: TimerGoal) -> Result<(), ClientError> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|_| ClientError::NoRuntime { client: Self::NAME })?;
        self.cancel();

        let notifier = self.notifier.clone();
        let period = self.period;
        self.task = Some(handle.spawn(async move {
            let mut interval = tokio::time::interval(period);
            // the first tick of a tokio interval completes immediately
            interval.tick().await;
            let mut count: u32 = 0;
            loop {
                interval.tick().await;
                count += 1;
                let tick = Event::new(TIMER_TICK).with_payload(json!(count));
                if notifier.post(tick).is_err() {
                    break;
                }
                if goal.ticks.is_some_and(|budget| count >= budget) {
                    let _ = notifier.succeeded();
                    break;
                }
            }
        }));
        tracing::debug!(client = Self::NAME, period_ms = period.as_millis() as u64, "timer started");
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!(client = Self::NAME, "timer cancelled");
        }
    }

    fn shutdown(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for TimerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerClient")
            .field("period", &self.period)
            .field("client", &ClientId::of::<Self>())
            .finish()
    }
}
