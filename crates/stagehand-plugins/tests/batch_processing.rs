//! Behavioural tests for scheduler-driven batch processing.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use stagehand_plugins::{BatchJob, BatchProcessor, ProcessingObserver, Tool, ToolError, ToolMetadata};
use stagehand_services::{ManualScheduler, Scheduler};

const TICK: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// Test world
// ---------------------------------------------------------------------------

struct Batches(u32);

impl BatchJob for Batches {
    fn total_batches(&self) -> u32 {
        self.0
    }

    fn process_batch(&mut self, _index: u32) -> Result<(), ToolError> {
        Ok(())
    }
}

#[derive(Default)]
struct Journal {
    progress: RefCell<Vec<f64>>,
    completions: RefCell<Vec<(bool, String)>>,
}

impl ProcessingObserver for Journal {
    fn on_progress(&self, progress: f64, _status: &str) {
        self.progress.borrow_mut().push(progress);
    }

    fn on_complete(&self, success: bool, result: &str) {
        self.completions
            .borrow_mut()
            .push((success, result.to_owned()));
    }
}

#[derive(Default)]
struct TestWorld {
    scheduler: Rc<ManualScheduler>,
    processor: Option<BatchProcessor>,
    journal: Rc<Journal>,
}

impl TestWorld {
    fn processor(&mut self) -> &mut BatchProcessor {
        self.processor
            .as_mut()
            .unwrap_or_else(|| panic!("no processor configured"))
    }
}

#[fixture]
fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::default())
}

// ---------------------------------------------------------------------------
// Given steps
// ---------------------------------------------------------------------------

#[given("an active processor with {count} batches")]
fn given_processor(world: &RefCell<TestWorld>, count: u32) {
    let mut world = world.borrow_mut();
    let mut processor = BatchProcessor::new(
        ToolMetadata::new("Importer"),
        Box::new(Batches(count)),
        Rc::clone(&world.scheduler) as Rc<dyn Scheduler>,
        TICK,
    );
    processor.subscribe(Rc::clone(&world.journal) as Rc<dyn ProcessingObserver>);
    processor
        .activate()
        .unwrap_or_else(|error| panic!("activate: {error}"));
    world.processor = Some(processor);
}

// ---------------------------------------------------------------------------
// When steps
// ---------------------------------------------------------------------------

#[when("processing starts")]
fn when_started(world: &RefCell<TestWorld>) {
    assert!(world.borrow_mut().processor().start_processing());
}

#[when("processing is paused")]
fn when_paused(world: &RefCell<TestWorld>) {
    assert!(world.borrow_mut().processor().pause_processing());
}

#[when("processing is resumed")]
fn when_resumed(world: &RefCell<TestWorld>) {
    assert!(world.borrow_mut().processor().resume_processing());
}

#[when("processing is cancelled")]
fn when_cancelled(world: &RefCell<TestWorld>) {
    assert!(world.borrow_mut().processor().cancel_processing());
}

#[when("the clock advances {count} ticks")]
fn when_clock_advances(world: &RefCell<TestWorld>, count: u32) {
    let scheduler = Rc::clone(&world.borrow().scheduler);
    for _ in 0..count {
        scheduler.advance(TICK);
    }
}

// ---------------------------------------------------------------------------
// Then steps
// ---------------------------------------------------------------------------

#[then("progress was reported as {expected}")]
fn then_progress(world: &RefCell<TestWorld>, expected: String) {
    let world = world.borrow();
    let reported = world
        .journal
        .progress
        .borrow()
        .iter()
        .map(|progress| format!("{progress:.2}"))
        .collect::<Vec<_>>()
        .join(", ");
    assert_eq!(reported, expected.trim_matches('"'));
}

#[then("no progress was reported")]
fn then_no_progress(world: &RefCell<TestWorld>) {
    assert!(world.borrow().journal.progress.borrow().is_empty());
}

#[then("the run completed successfully")]
fn then_succeeded(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    let completions = world.journal.completions.borrow();
    assert_eq!(completions.len(), 1);
    assert!(completions.iter().all(|(success, _)| *success));
    assert_eq!(world.scheduler.timer_count(), 0);
}

#[then("the run failed with {reason}")]
fn then_failed(world: &RefCell<TestWorld>, reason: String) {
    let world = world.borrow();
    assert_eq!(
        *world.journal.completions.borrow(),
        [(false, reason.trim_matches('"').to_owned())]
    );
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[scenario(
    path = "tests/features/batch_processing.feature",
    name = "A three batch job reports progress and completes"
)]
fn three_batch_job(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/batch_processing.feature",
    name = "A job without batches fails at once"
)]
fn empty_job(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/batch_processing.feature",
    name = "A paused run resumes where it stopped"
)]
fn paused_run(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/batch_processing.feature",
    name = "A cancelled run reports an unsuccessful completion"
)]
fn cancelled_run(world: RefCell<TestWorld>) {
    drop(world);
}
