use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread::JoinHandle;

use lp_affinity::AffinityBackend;
use lp_affinity::AffinityController;
use lp_affinity::AffinityError;
use lp_affinity::ApplyOutcome;
use lp_affinity::ProcessLocator;
use lp_log::LogTailer;
use lp_log::TailError;
use lp_log::classify;
use lp_types::LifecycleEvent;
use lp_types::Phase;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

/// Something that can put the game into a phase's affinity
pub trait PhaseApplier {
    fn apply_phase(&mut self, phase: Phase) -> Result<ApplyOutcome, AffinityError>;
}

impl<L: ProcessLocator, B: AffinityBackend> PhaseApplier for AffinityController<L, B> {
    fn apply_phase(&mut self, phase: Phase) -> Result<ApplyOutcome, AffinityError> {
        self.apply(phase)
    }
}

/// Drives affinity changes from classified log events
///
/// Transitions are level-triggered: every recognised marker applies its
/// phase, even when the coordinator is already in it.
pub struct LifecycleCoordinator<A> {
    applier: A,
    phase: Phase,
}

impl<A: PhaseApplier> LifecycleCoordinator<A> {
    pub fn new(applier: A) -> Self {
        Self { applier, phase: Phase::Resting }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn applier(&self) -> &A {
        &self.applier
    }

    /// Establish the resting baseline
    pub fn start(&mut self) {
        self.phase = Phase::Resting;
        self.apply(Phase::Resting);
    }

    /// Returns the phase that was applied, `None` for unrecognised events
    pub fn handle_event(&mut self, event: LifecycleEvent) -> Option<Phase> {
        let target = event.target_phase()?;

        match event {
            LifecycleEvent::GameStart => info!("Game start detected"),
            LifecycleEvent::LoadStart => info!("Loading event detected"),
            LifecycleEvent::LoadEnd => info!("End loading event detected"),
            LifecycleEvent::None => {}
        }

        if target != self.phase {
            info!("Phase {} -> {target}", self.phase);
        }

        // Updated even if the apply fails, the next marker retries
        self.phase = target;
        self.apply(target);

        Some(target)
    }

    pub fn handle_line(&mut self, line: &str) -> LifecycleEvent {
        let event = classify(line);
        self.handle_event(event);
        event
    }

    /// Apply the baseline, then process appended lines until stopped
    ///
    /// Lines still unread when `running` clears are dropped. Only a terminal
    /// tailing error ends the loop early.
    pub fn run(&mut self, tailer: LogTailer, running: &AtomicBool) -> Result<(), TailError> {
        self.start();

        for line in tailer.lines(running) {
            self.handle_line(&line?);
        }

        Ok(())
    }

    fn apply(&mut self, phase: Phase) {
        match self.applier.apply_phase(phase) {
            Ok(outcome) => debug!("{phase} affinity in effect: {}", outcome.mask()),
            Err(err @ AffinityError::ProcessNotFound { .. }) => warn!("{err}, skipping {phase} affinity"),
            Err(err @ AffinityError::AffinityRejected { .. }) => error!("Failed to apply {phase} affinity: {err}"),
        }
    }
}

/// Run the coordinator on a dedicated thread
///
/// The thread clears `running` when it exits so the foreground stops waiting.
pub fn spawn_monitor<A>(
    mut coordinator: LifecycleCoordinator<A>,
    tailer: LogTailer,
    running: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<Result<(), TailError>>>
where
    A: PhaseApplier + Send + 'static,
{
    std::thread::Builder::new().name("log-monitor".to_string()).spawn(move || {
        let result = coordinator.run(tailer, &running);
        match &result {
            Ok(()) => info!("Log monitor stopped"),
            Err(err) => error!("Log monitoring ended: {err}"),
        }
        running.store(false, Ordering::Relaxed);
        result
    })
}
