//! Playing a trial sequence.
//!
//! The [`TrialPlayer`] is the seam to whatever renders trials and collects
//! keypresses. [`Session`] walks a trial list in order, asks the player for
//! responses, scores them, appends each delta to its [`ScoreLedger`], and
//! produces one [`TrialRecord`] per trial.

use crate::pairing::BoxRegistry;
use crate::record::{RecordKind, TrialRecord};
use crate::response::Response;
use crate::scoring::{CheckpointSummary, ScoreLedger};
use crate::sequence::{Probe, Trial, TrialKind};

/// Presents trials and collects responses.
///
/// Only [`TrialPlayer::respond`] may block; it returns
/// [`Response::timeout`] when the deadline passes without a keypress.
pub trait TrialPlayer {
    /// Show a response trial and wait for a response within its duration.
    fn respond(&mut self, trial: &Trial, probe: &Probe) -> Response;

    /// Show a cue grid.
    fn show_cue(&mut self, _trial: &Trial) {}

    /// Reveal the outcome of the previous response along with its score.
    fn show_feedback(&mut self, _trial: &Trial, _score: i8) {}

    /// Show a score summary.
    fn show_checkpoint(&mut self, _trial: &Trial, _summary: &CheckpointSummary) {}
}

/// Runs trial lists against one ledger.
#[derive(Debug)]
pub struct Session<'a> {
    registry: &'a BoxRegistry,
    ledger: ScoreLedger,
}

impl<'a> Session<'a> {
    /// Starts a session with an empty ledger.
    #[must_use]
    pub fn new(registry: &'a BoxRegistry) -> Self {
        Self {
            registry,
            ledger: ScoreLedger::new(),
        }
    }

    /// Score ledger so far.
    #[must_use]
    pub const fn ledger(&self) -> &ScoreLedger {
        &self.ledger
    }

    /// Ends the session, keeping its ledger.
    #[must_use]
    pub fn into_ledger(self) -> ScoreLedger {
        self.ledger
    }

    /// Play every trial in order.
    pub fn run<P: TrialPlayer + ?Sized>(&mut self, trials: &[Trial], player: &mut P) -> Vec<TrialRecord> {
        let records: Vec<TrialRecord> = trials.iter().map(|t| self.play(t, player)).collect();

        if let Some(first) = trials.first() {
            tracing::info!(
                phase = %first.phase,
                trials = records.len(),
                phase_total = self.ledger.phase_total(first.phase),
                total = self.ledger.total(),
                "phase complete"
            );
        }
        records
    }

    /// Play a single trial.
    pub fn play<P: TrialPlayer + ?Sized>(&mut self, trial: &Trial, player: &mut P) -> TrialRecord {
        let kind = match trial.kind {
            TrialKind::Cue { .. } => RecordKind::Cue,
            TrialKind::Response(_) => RecordKind::Response,
            TrialKind::Feedback { .. } => RecordKind::Feedback,
            TrialKind::Checkpoint { .. } => RecordKind::Checkpoint,
        };
        let mut record = TrialRecord::new(trial.phase, kind, trial.block, trial.timing.onset);
        record.trial = trial.trial;

        match &trial.kind {
            TrialKind::Cue { .. } => player.show_cue(trial),
            TrialKind::Response(probe) => {
                let response = player.respond(trial, probe);
                let delta = probe.score(response.direction);
                self.ledger.record(trial.phase, trial.block, delta);
                tracing::debug!(
                    phase = %trial.phase,
                    block = trial.block,
                    label = %probe.label,
                    choice = ?response.direction,
                    correct = %probe.correct,
                    devalued = probe.devalued,
                    delta,
                    "scored response"
                );

                self.describe_box(&mut record, probe);
                record.devalued = probe.devalued;
                record.choice = response.direction;
                record.correct = Some(probe.correct);
                record.score = Some(delta);
                record.reaction_time_ms = response.reaction_time_ms;
            }
            TrialKind::Feedback { .. } => {
                let shown = self.ledger.last().unwrap_or(0);
                player.show_feedback(trial, shown);
                record.score = Some(shown);
            }
            TrialKind::Checkpoint { max } => {
                let summary = self.ledger.checkpoint(*max);
                player.show_checkpoint(trial, &summary);
                record.earned = Some(summary.earned);
                record.max = Some(summary.max);
            }
        }

        record.running_total = self.ledger.total();
        record
    }

    fn describe_box(&self, record: &mut TrialRecord, probe: &Probe) {
        record.box_label = Some(probe.label.clone());
        if let Some(bx) = self.registry.get(probe.box_id) {
            record.stimulus = Some(bx.stimulus().name().to_string());
            record.outcome = Some(bx.outcome().name().to_string());
        }
        if let Some(distractor) = &probe.distractor {
            record.distractor = Some(distractor.name.clone());
            record.distractor_on_top = Some(distractor.on_top);
        }
    }
}
