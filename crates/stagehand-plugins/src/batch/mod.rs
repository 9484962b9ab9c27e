//! Scheduler-driven batch processing tools.
//!
//! A [`BatchProcessor`] runs a [`BatchJob`] one batch per scheduler tick.
//! Progress is reported to [`ProcessingObserver`]s when a run starts and
//! after every batch. A completion notice follows the tick that processes
//! the final batch, a failed batch, or a cancellation.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use stagehand_modes::Mode;
use stagehand_services::{Scheduler, TimerId};
use tracing::{debug, info, warn};

use crate::PLUGIN_TARGET;
use crate::catalog::ToolContext;
use crate::contract::{Tool, ToolCore};
use crate::error::ToolError;
use crate::metadata::ToolMetadata;

/// Work split into numbered batches.
pub trait BatchJob {
    /// Number of batches in the next run.
    fn total_batches(&self) -> u32;

    /// Prepares a run; called once per start.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] when the run cannot begin.
    fn prepare(&mut self) -> Result<(), ToolError> {
        Ok(())
    }

    /// Processes batch `index`, counting from zero.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] to abort the run.
    fn process_batch(&mut self, index: u32) -> Result<(), ToolError>;

    /// Summarises a successful run.
    fn finish(&mut self) -> String {
        String::from("completed")
    }
}

/// Receives progress and completion notices.
pub trait ProcessingObserver {
    /// Called when a run starts and after each batch, with progress in
    /// `[0, 1]`.
    fn on_progress(&self, progress: f64, status: &str);

    /// Called once when a run ends, including by cancellation.
    fn on_complete(&self, success: bool, result: &str);
}

enum Notice {
    Progress { progress: f64, status: String },
    Complete { success: bool, result: String },
}

struct BatchRun {
    name: String,
    job: Box<dyn BatchJob>,
    timer: Option<TimerId>,
    paused: bool,
    processed: u32,
    total: u32,
    observers: Vec<Rc<dyn ProcessingObserver>>,
}

impl BatchRun {
    #[expect(clippy::float_arithmetic, reason = "progress is a ratio of batch counts")]
    fn progress(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (f64::from(self.processed) / f64::from(self.total)).clamp(0.0, 1.0)
    }

    fn step(&mut self, scheduler: &Weak<dyn Scheduler>) -> Vec<Notice> {
        let index = self.processed;
        if let Err(error) = self.job.process_batch(index) {
            warn!(target: PLUGIN_TARGET, event = "batch_failed", tool = %self.name, index, error = %error);
            return vec![self.end(scheduler, false, error.to_string())];
        }
        self.processed = self.processed.saturating_add(1);
        let mut notices = vec![Notice::Progress {
            progress: self.progress(),
            status: format!("processed batch {}/{}", self.processed, self.total),
        }];
        if self.processed >= self.total {
            let result = self.job.finish();
            notices.push(self.end(scheduler, true, result));
        }
        notices
    }

    fn end(&mut self, scheduler: &Weak<dyn Scheduler>, success: bool, result: String) -> Notice {
        if let (Some(timer), Some(clock)) = (self.timer.take(), scheduler.upgrade()) {
            clock.cancel(timer);
        }
        self.paused = false;
        info!(
            target: PLUGIN_TARGET,
            event = "batch_run_finished",
            tool = %self.name,
            success,
            processed = self.processed,
            total = self.total
        );
        Notice::Complete { success, result }
    }
}

fn notify(observers: &[Rc<dyn ProcessingObserver>], notices: &[Notice]) {
    for notice in notices {
        for observer in observers {
            match notice {
                Notice::Progress { progress, status } => observer.on_progress(*progress, status),
                Notice::Complete { success, result } => observer.on_complete(*success, result),
            }
        }
    }
}

fn tick(run: &RefCell<BatchRun>, scheduler: &Weak<dyn Scheduler>) {
    let (notices, observers) = {
        let Ok(mut state) = run.try_borrow_mut() else {
            return;
        };
        if state.timer.is_none() || state.paused {
            return;
        }
        let notices = state.step(scheduler);
        (notices, state.observers.clone())
    };
    notify(&observers, &notices);
}

/// Batch-processing tool variant.
pub struct BatchProcessor {
    core: ToolCore,
    scheduler: Rc<dyn Scheduler>,
    interval: Duration,
    run: Rc<RefCell<BatchRun>>,
}

impl BatchProcessor {
    /// Creates a processor ticking every `interval`.
    #[must_use]
    pub fn new(
        metadata: ToolMetadata,
        job: Box<dyn BatchJob>,
        scheduler: Rc<dyn Scheduler>,
        interval: Duration,
    ) -> Self {
        let run = BatchRun {
            name: metadata.name.clone(),
            job,
            timer: None,
            paused: false,
            processed: 0,
            total: 0,
            observers: Vec::new(),
        };
        Self {
            core: ToolCore::new(metadata),
            scheduler,
            interval,
            run: Rc::new(RefCell::new(run)),
        }
    }

    /// Creates a processor using the context's scheduler and interval.
    #[must_use]
    pub fn from_context(metadata: ToolMetadata, job: Box<dyn BatchJob>, context: &ToolContext) -> Self {
        Self::new(metadata, job, context.scheduler(), context.batch_interval())
    }

    /// Tick interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Registers an observer for subsequent notices.
    pub fn subscribe(&self, observer: Rc<dyn ProcessingObserver>) {
        self.run.borrow_mut().observers.push(observer);
    }

    /// Starts a run. Returns `false` when inactive or already running.
    ///
    /// A job with no batches, or whose preparation fails, completes at once
    /// with `success = false`.
    pub fn start_processing(&mut self) -> bool {
        if !self.core.is_active() {
            warn!(target: PLUGIN_TARGET, event = "batch_inactive", tool = %self.core.metadata().name);
            return false;
        }
        let (notices, observers) = {
            let Ok(mut guard) = self.run.try_borrow_mut() else {
                return false;
            };
            let run = &mut *guard;
            if run.timer.is_some() {
                warn!(target: PLUGIN_TARGET, event = "batch_already_running", tool = %run.name);
                return false;
            }
            run.processed = 0;
            run.paused = false;
            run.total = run.job.total_batches();
            let notice = match run.job.prepare() {
                Err(error) => Notice::Complete {
                    success: false,
                    result: error.to_string(),
                },
                Ok(()) if run.total == 0 => Notice::Complete {
                    success: false,
                    result: String::from("no batches to process"),
                },
                Ok(()) => {
                    run.timer = Some(self.schedule());
                    info!(
                        target: PLUGIN_TARGET,
                        event = "batch_run_started",
                        tool = %run.name,
                        total = run.total,
                        interval_ms = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX)
                    );
                    Notice::Progress {
                        progress: 0.0,
                        status: String::from("processing started"),
                    }
                }
            };
            (vec![notice], run.observers.clone())
        };
        notify(&observers, &notices);
        true
    }

    /// Stops the run, resets progress and reports an unsuccessful
    /// completion. Returns `false` when idle.
    pub fn cancel_processing(&mut self) -> bool {
        let observers = {
            let mut guard = self.run.borrow_mut();
            let run = &mut *guard;
            let Some(timer) = run.timer.take() else {
                return false;
            };
            self.scheduler.cancel(timer);
            run.processed = 0;
            run.paused = false;
            info!(target: PLUGIN_TARGET, event = "batch_run_cancelled", tool = %run.name);
            run.observers.clone()
        };
        let cancelled = Notice::Complete {
            success: false,
            result: String::from("processing cancelled"),
        };
        notify(&observers, &[cancelled]);
        true
    }

    /// Suspends ticking, keeping progress. Returns `false` when idle or
    /// already paused.
    pub fn pause_processing(&mut self) -> bool {
        let mut guard = self.run.borrow_mut();
        let run = &mut *guard;
        match run.timer {
            Some(timer) if !run.paused => {
                self.scheduler.pause(timer);
                run.paused = true;
                debug!(target: PLUGIN_TARGET, event = "batch_run_paused", tool = %run.name);
                true
            }
            _ => false,
        }
    }

    /// Resumes a paused run. Returns `false` when not paused.
    pub fn resume_processing(&mut self) -> bool {
        let mut guard = self.run.borrow_mut();
        let run = &mut *guard;
        match run.timer {
            Some(timer) if run.paused => {
                self.scheduler.resume(timer);
                run.paused = false;
                debug!(target: PLUGIN_TARGET, event = "batch_run_resumed", tool = %run.name);
                true
            }
            _ => false,
        }
    }

    /// Returns `true` while a run is scheduled, paused or not.
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.run.borrow().timer.is_some()
    }

    /// Returns `true` while a run is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.run.borrow().paused
    }

    /// Fraction of the current run processed, in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> f64 {
        self.run.borrow().progress()
    }

    /// Batches processed in the current run.
    #[must_use]
    pub fn processed_batches(&self) -> u32 {
        self.run.borrow().processed
    }

    fn schedule(&self) -> TimerId {
        let target = Rc::downgrade(&self.run);
        let scheduler = Rc::downgrade(&self.scheduler);
        self.scheduler.schedule(
            self.interval,
            Box::new(move || {
                if let Some(run) = target.upgrade() {
                    tick(&run, &scheduler);
                }
            }),
        )
    }
}

impl Tool for BatchProcessor {
    fn initialize(&mut self) -> Result<(), ToolError> {
        self.core.initialize();
        Ok(())
    }

    fn activate(&mut self) -> Result<(), ToolError> {
        self.core.initialize();
        self.core.activate()?;
        Ok(())
    }

    fn deactivate(&mut self) {
        self.cancel_processing();
        self.core.deactivate();
    }

    fn shutdown(&mut self) {
        self.deactivate();
        self.core.shutdown();
    }

    fn metadata(&self) -> &ToolMetadata {
        self.core.metadata()
    }

    fn is_active(&self) -> bool {
        self.core.is_active()
    }

    fn on_mode_changed(&mut self, mode: Mode) {
        self.core.set_mode(mode);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl fmt::Debug for BatchProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchProcessor")
            .field("name", &self.core.metadata().name)
            .field("interval", &self.interval)
            .field("processing", &self.is_processing())
            .field("progress", &self.progress())
            .finish_non_exhaustive()
    }
}
