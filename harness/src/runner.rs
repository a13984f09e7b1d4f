//! Virtual-user ramp runner
//!
//! Actor count follows the configured stages by linear interpolation,
//! re-evaluated on a fixed tick. Draining is graceful: an actor checks the
//! target between iterations and exits after finishing its in-flight
//! request; nothing is ever cancelled mid-call. A slot freed by a drain
//! stage is respawned when a later stage raises the target past it.

use crate::config::Config;
use crate::fixture::{FixtureSet, RunId};
use crate::harness::Harness;
use crate::metrics::{self, RunResults};
use anyhow::Context;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// How often the ramp controller re-evaluates the desired actor count
const RAMP_TICK: Duration = Duration::from_millis(500);

/// Event channel depth; sized so actors never block on the collector
const EVENT_BUFFER: usize = 50_000;

/// Executes one full run: setup, ramp, drain, teardown
pub struct LoadRunner {
    config: Config,
}

impl LoadRunner {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn run(&self) -> anyhow::Result<RunResults> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let harness = Arc::new(Harness::new(self.config.clone(), tx)?);
        let collector = tokio::spawn(metrics::collect(rx));

        let start = Instant::now();
        harness.probe_target().await;

        let run_id = RunId::now();
        let fixture = Arc::new(harness.setup(run_id).await);

        info!(
            "ramping {} stage(s) over {:?}, peak {} actors",
            self.config.ramp.len(),
            self.config.ramp_duration(),
            self.config.peak_actors()
        );

        let target = Arc::new(AtomicUsize::new(0));
        // Slot i holds the task for actor index i. Once drained the task
        // finishes, so the slot is respawned whenever the target climbs
        // back above the index
        let mut slots: Vec<JoinHandle<()>> = Vec::new();
        let mut stage_start_target = 0usize;

        for (stage_idx, stage) in self.config.ramp.iter().enumerate() {
            let ticks = (stage.duration.as_millis() / RAMP_TICK.as_millis()).max(1) as u32;
            debug!(
                "stage {}: {} -> {} actors over {:?}",
                stage_idx, stage_start_target, stage.target, stage.duration
            );

            for tick in 1..=ticks {
                let desired = interpolate(stage_start_target, stage.target, tick, ticks);
                target.store(desired, Ordering::SeqCst);

                for actor_idx in 0..desired {
                    // A live actor keeps looping while its index stays below
                    // the target; only a finished (or never started) slot
                    // needs a fresh task
                    if slots
                        .get(actor_idx)
                        .is_some_and(|handle| !handle.is_finished())
                    {
                        continue;
                    }
                    let handle = tokio::spawn(actor_loop(
                        harness.clone(),
                        fixture.clone(),
                        target.clone(),
                        actor_idx,
                    ));
                    if actor_idx < slots.len() {
                        slots[actor_idx] = handle;
                    } else {
                        slots.push(handle);
                    }
                }

                tokio::time::sleep(RAMP_TICK).await;
            }
            stage_start_target = stage.target;
        }

        // Drain whatever the final stage left running
        target.store(0, Ordering::SeqCst);
        let live = slots.iter().filter(|h| !h.is_finished()).count();
        info!("draining {} actor(s)", live);
        for handle in slots {
            let _ = handle.await;
        }

        harness.teardown(&fixture);
        let check_failure_rate = harness.error_rate().rate();

        // Dropping the harness closes the event channel so the collector
        // finishes once the backlog is drained
        drop(harness);
        let mut results = collector.await.context("event collector panicked")?;
        results.check_failure_rate = check_failure_rate;
        results.duration = start.elapsed();
        Ok(results)
    }
}

/// One virtual actor: iterate until the ramp target drops below our index
async fn actor_loop(
    harness: Arc<Harness>,
    fixture: Arc<FixtureSet>,
    target: Arc<AtomicUsize>,
    actor_idx: usize,
) {
    let mut rng = StdRng::from_os_rng();
    debug!("actor {} started", actor_idx);
    while actor_idx < target.load(Ordering::SeqCst) {
        harness.iteration(&fixture, &mut rng).await;
    }
    debug!("actor {} drained", actor_idx);
}

/// Linear interpolation of the actor count within a stage
fn interpolate(from: usize, to: usize, step: u32, steps: u32) -> usize {
    let from = from as f64;
    let to = to as f64;
    (from + (to - from) * (step as f64 / steps as f64)).round() as usize
}
