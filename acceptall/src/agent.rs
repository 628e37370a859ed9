//! The accept loop: scan, click, log, scroll, checkpoint.

use crate::engine::PageEngine;
use crate::errors::AutomationError;
use crate::identity;
use crate::locator::Locator;
use crate::selector::Selector;
use crate::storage::InvitationStore;
use rand::Rng;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Consecutive no-growth scrolls before the agent checkpoints and reloads.
pub const EMPTY_SCROLL_THRESHOLD: u32 = 5;

/// Timing knobs for the accept loop. Defaults carry the delays of the
/// original page script; tests shrink them to zero.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Settle time between scrolling a control into view and clicking it.
    pub click_settle: Duration,
    /// Base inter-click delay.
    pub click_delay_min: Duration,
    /// Random extra added to the inter-click delay to avoid rate limits.
    pub click_delay_jitter: Duration,
    /// Wait after a scroll-to-bottom for lazy content to land.
    pub scroll_settle: Duration,
    /// Pause after finishing a batch before re-querying.
    pub batch_pause: Duration,
    /// Wait before retrying when a scroll produced no growth.
    pub empty_retry_wait: Duration,
    /// No-growth scrolls tolerated before checkpoint + reload.
    pub empty_scroll_threshold: u32,
    /// Settle time after a reload before re-scanning for controls.
    pub resume_settle: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            click_settle: Duration::from_millis(300),
            click_delay_min: Duration::from_millis(800),
            click_delay_jitter: Duration::from_millis(400),
            scroll_settle: Duration::from_millis(1500),
            batch_pause: Duration::from_millis(1000),
            empty_retry_wait: Duration::from_secs(2),
            empty_scroll_threshold: EMPTY_SCROLL_THRESHOLD,
            resume_settle: Duration::from_secs(3),
        }
    }
}

/// Outbound notifications to the control surface. Fire-and-forget: a send
/// with no listener attached is silently dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AgentEvent {
    Progress { accepted: u64 },
    Done { accepted: u64 },
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Loop exited via stop or a caught error; session cleared, done emitted.
    Done { accepted: u64 },
    /// Checkpoint persisted and a full page reload forced. On a live page
    /// this terminates the execution context; resume picks the count up.
    Reloading { accepted: u64 },
    /// A run was already in flight; nothing happened.
    AlreadyRunning,
}

/// Cloneable handle for command handlers. Owns nothing but the run flag, so
/// stopping is available without access to the agent itself.
#[derive(Debug, Clone)]
pub struct AgentHandle {
    running: Arc<AtomicBool>,
}

impl AgentHandle {
    /// Request a cooperative stop. An in-flight click still completes before
    /// the loop observes this.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// The in-page automation loop.
pub struct AcceptAgent {
    engine: Arc<dyn PageEngine>,
    store: InvitationStore,
    config: AgentConfig,
    running: Arc<AtomicBool>,
    /// Count reached by the current or latest run, so the error path can
    /// still report how far it got.
    last_count: AtomicU64,
    events: mpsc::UnboundedSender<AgentEvent>,
}

impl AcceptAgent {
    pub fn new(
        engine: Arc<dyn PageEngine>,
        store: InvitationStore,
        config: AgentConfig,
    ) -> (Self, mpsc::UnboundedReceiver<AgentEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (
            Self {
                engine,
                store,
                config,
                running: Arc::new(AtomicBool::new(false)),
                last_count: AtomicU64::new(0),
                events,
            },
            rx,
        )
    }

    pub fn handle(&self) -> AgentHandle {
        AgentHandle {
            running: self.running.clone(),
        }
    }

    /// Selector for actionable Accept controls: enabled buttons whose
    /// trimmed, case-insensitive text equals "accept".
    pub fn accept_selector() -> Selector {
        Selector::Chain(vec![
            Selector::Tag("button".into()),
            Selector::Text("accept".into()),
            Selector::Enabled(true),
        ])
    }

    /// Run the accept loop, seeded with a prior count when resuming.
    /// No-op when a run is already in flight.
    ///
    /// Errors never escape: anything raised inside the loop is logged and
    /// the run concludes as `Done` with the count reached so far.
    pub async fn run(&self, start_count: u64) -> RunOutcome {
        if self.running.swap(true, Ordering::SeqCst) {
            debug!("start ignored, accept loop already running");
            return RunOutcome::AlreadyRunning;
        }
        info!(start_count, "accept loop starting");

        let outcome = match self.accept_loop(start_count).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "accept loop failed");
                RunOutcome::Done {
                    accepted: self.last_count.load(Ordering::SeqCst),
                }
            }
        };
        self.running.store(false, Ordering::SeqCst);

        if let RunOutcome::Done { accepted } = outcome {
            if let Err(e) = self.store.clear_session() {
                warn!(error = %e, "failed to clear resume session");
            }
            self.emit(AgentEvent::Done { accepted });
            info!(accepted, "accept loop done");
        }
        outcome
    }

    /// Run the loop and chase its own reloads: every `Reloading` outcome
    /// flows back through [`resume_if_pending`](Self::resume_if_pending)
    /// until the checkpoint is exhausted and the run concludes with `Done`.
    /// Drivers use this; [`run`](Self::run) stays available for one pass.
    pub async fn run_to_completion(&self, start_count: u64) -> RunOutcome {
        let mut outcome = self.run(start_count).await;
        while let RunOutcome::Reloading { accepted } = outcome {
            match self.resume_if_pending().await {
                Ok(Some(next)) => outcome = next,
                Ok(None) => {
                    // Checkpoint expired or cleared elsewhere in the gap.
                    warn!(accepted, "reload checkpoint vanished before resume");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "resume after reload failed");
                    break;
                }
            }
        }
        outcome
    }

    /// Resume entry point for a fresh page load. Returns `None` when there
    /// is no live checkpoint, which is the normal nothing-to-do case.
    pub async fn resume_if_pending(&self) -> Result<Option<RunOutcome>, AutomationError> {
        let Some(session) = self.store.load_session()? else {
            return Ok(None);
        };
        info!(
            total_accepted = session.total_accepted,
            "resume session found, re-scanning after reload"
        );
        tokio::time::sleep(self.config.resume_settle).await;

        let controls = self.accept_locator().all().await?;
        if controls.is_empty() {
            // Prior run exhausted the page: nothing left after the reload.
            self.store.clear_session()?;
            let accepted = session.total_accepted;
            self.emit(AgentEvent::Done { accepted });
            info!(accepted, "nothing to resume, run complete");
            return Ok(Some(RunOutcome::Done { accepted }));
        }

        self.emit(AgentEvent::Progress {
            accepted: session.total_accepted,
        });
        Ok(Some(self.run(session.total_accepted).await))
    }

    fn accept_locator(&self) -> Locator {
        Locator::new(self.engine.clone(), Self::accept_selector())
    }

    async fn accept_loop(&self, start_count: u64) -> Result<RunOutcome, AutomationError> {
        let mut accepted = start_count;
        self.last_count.store(accepted, Ordering::SeqCst);
        let mut empty_scrolls: u32 = 0;

        loop {
            if !self.running.load(Ordering::SeqCst) {
                return Ok(RunOutcome::Done { accepted });
            }

            let controls = self.accept_locator().all().await?;

            if controls.is_empty() {
                let before = self.engine.scroll_height().await?;
                self.engine.scroll_to_bottom().await?;
                tokio::time::sleep(self.config.scroll_settle).await;
                let after = self.engine.scroll_height().await?;

                if after > before {
                    empty_scrolls = 0;
                    continue;
                }

                empty_scrolls += 1;
                debug!(empty_scrolls, "scroll produced no growth");
                if empty_scrolls >= self.config.empty_scroll_threshold {
                    // Infinite scroll has stalled. Checkpoint and force a
                    // full reload; re-injection on the fresh page resumes.
                    self.store.save_session(accepted)?;
                    info!(accepted, "empty-scroll threshold reached, reloading page");
                    self.engine.reload().await?;
                    return Ok(RunOutcome::Reloading { accepted });
                }
                tokio::time::sleep(self.config.empty_retry_wait).await;
                continue;
            }

            empty_scrolls = 0;
            debug!(count = controls.len(), "found accept controls");

            for control in &controls {
                if !self.running.load(Ordering::SeqCst) {
                    return Ok(RunOutcome::Done { accepted });
                }

                control.scroll_into_view().await?;
                tokio::time::sleep(self.config.click_settle).await;
                control.click().await?;
                accepted += 1;
                self.last_count.store(accepted, Ordering::SeqCst);

                let name = identity::invitee_name(control);
                let profile_url = identity::profile_url(control);
                self.store.record_acceptance(&name, profile_url)?;
                info!(accepted, invitee = %name, "accepted invitation");
                self.emit(AgentEvent::Progress { accepted });

                let jitter_ms = self.config.click_delay_jitter.as_millis() as u64;
                let extra = if jitter_ms == 0 {
                    0
                } else {
                    rand::thread_rng().gen_range(0..=jitter_ms)
                };
                tokio::time::sleep(self.config.click_delay_min + Duration::from_millis(extra))
                    .await;
            }

            if !self.running.load(Ordering::SeqCst) {
                return Ok(RunOutcome::Done { accepted });
            }

            // Surface the next batch of lazy-loaded invitations.
            self.engine.scroll_to_bottom().await?;
            tokio::time::sleep(self.config.batch_pause).await;
        }
    }

    fn emit(&self, event: AgentEvent) {
        // Lost when no listener is attached; that is part of the contract.
        let _ = self.events.send(event);
    }
}
