//! Flat per-trial records handed to persistence.
//!
//! One record is produced per executed trial. The field set is the durable
//! contract; how records are stored is up to the caller.

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::direction::Direction;
use crate::error::FabResult;
use crate::sequence::Phase;

/// Kind of trial a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Cue grid at the start of a test block.
    Cue,
    /// Keypress trial, scored.
    Response,
    /// Outcome reveal after a response.
    Feedback,
    /// Score summary.
    Checkpoint,
}

/// One executed trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    /// Phase the trial belongs to.
    pub phase: Phase,
    /// What kind of trial ran.
    pub kind: RecordKind,
    /// Block index within the phase.
    pub block: usize,
    /// Position within the block, for response and feedback trials.
    pub trial: Option<usize>,
    /// Label of the scored box.
    pub box_label: Option<String>,
    /// Stimulus name of the scored box.
    pub stimulus: Option<String>,
    /// Outcome name of the scored box.
    pub outcome: Option<String>,
    /// Name of the devalued item shown beside the valued one (outcome devaluation).
    pub distractor: Option<String>,
    /// Whether that distractor was drawn above the valued item.
    pub distractor_on_top: Option<bool>,
    /// Whether the scored box was devalued on this block.
    pub devalued: bool,
    /// Side pressed, `None` on timeout or an ambiguous press.
    pub choice: Option<Direction>,
    /// Side that opens the scored box.
    pub correct: Option<Direction>,
    /// Points for this response, or the score shown by a feedback trial.
    pub score: Option<i8>,
    /// Milliseconds from onset to keypress.
    pub reaction_time_ms: Option<f64>,
    /// Checkpoint: points earned since the previous checkpoint.
    pub earned: Option<i64>,
    /// Checkpoint: most points that could have been earned.
    pub max: Option<u32>,
    /// Running ledger total after this trial.
    pub running_total: i64,
    /// Scheduled onset in seconds from phase start.
    pub onset: f64,
    /// Wall-clock time the record was made.
    pub recorded_at: DateTime<Utc>,
}

impl TrialRecord {
    /// A record with only the trial coordinates filled in.
    #[must_use]
    pub fn new(phase: Phase, kind: RecordKind, block: usize, onset: f64) -> Self {
        Self {
            phase,
            kind,
            block,
            trial: None,
            box_label: None,
            stimulus: None,
            outcome: None,
            distractor: None,
            distractor_on_top: None,
            devalued: false,
            choice: None,
            correct: None,
            score: None,
            reaction_time_ms: None,
            earned: None,
            max: None,
            running_total: 0,
            onset,
            recorded_at: Utc::now(),
        }
    }
}

/// Write records as JSON lines.
///
/// # Errors
///
/// Returns `FabError::Serialization` or `FabError::Io` if a record cannot be
/// encoded or written.
pub fn write_json_lines<W: Write>(records: &[TrialRecord], mut writer: W) -> FabResult<()> {
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_defaults() {
        let record = TrialRecord::new(Phase::SlipsOfAction, RecordKind::Cue, 3, 3.0);
        assert_eq!(record.block, 3);
        assert_eq!(record.score, None);
        assert_eq!(record.distractor, None);
        assert!(!record.devalued);
    }

    #[test]
    fn test_write_json_lines() {
        let mut a = TrialRecord::new(Phase::InstructedDiscrimination, RecordKind::Response, 0, 3.0);
        a.choice = Some(Direction::Left);
        a.correct = Some(Direction::Left);
        a.score = Some(1);
        let b = TrialRecord::new(Phase::InstructedDiscrimination, RecordKind::Checkpoint, 0, 6.0);

        let mut out = Vec::new();
        write_json_lines(&[a, b], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["phase"], "ID");
        assert_eq!(first["kind"], "response");
        assert_eq!(first["choice"], "left");
        assert_eq!(first["score"], 1);

        let back: TrialRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(back.kind, RecordKind::Checkpoint);
    }
}
