//! # fabfruit - Fabulous Fruits slips-of-action task
//!
//! Counterbalanced design generation and scoring for an outcome-devaluation
//! paradigm. Participants learn which side opens each of a set of boxes
//! (a stimulus outside, an outcome inside), then are tested on whether they
//! can withhold responses to boxes whose contents have been devalued.
//!
//! ## Core Concepts
//!
//! - **Box**: a stimulus/outcome pair that opens to one side ([`TaskBox`])
//! - **Devaluation schedule**: which boxes are devalued on which test block
//! - **Phase**: instructed discrimination, outcome devaluation, slips of
//!   action, and devaluation discrimination
//! - **Session**: plays a trial list against a [`TrialPlayer`] and keeps the
//!   score ledger
//!
//! ## Usage
//!
//! ```rust
//! use fabfruit::{TaskDesign, TaskSettings, Phase};
//!
//! let fruits = [
//!     "apple", "bananas", "cherries", "coconut", "grape", "kiwi",
//!     "lemon", "melon", "orange", "pear", "pineapple", "strawberry",
//! ];
//! let design = TaskDesign::generate(&fruits, &TaskSettings::default(), 42)?;
//! assert_eq!(design.registry().len(), 6);
//! assert_eq!(design.phase(Phase::SlipsOfAction).len(), 126);
//! # Ok::<(), fabfruit::FabError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod design;
pub mod direction;
pub mod error;
pub mod pairing;
pub mod record;
pub mod response;
pub mod schedule;
pub mod scoring;
pub mod sequence;
pub mod session;

// Re-export primary types at crate root for convenience
pub use config::{PhaseSettings, ScheduleSettings, TaskSettings};
pub use design::{pick_seed, BoxEntry, BoxFile, TaskDesign};
pub use direction::{Direction, Role};
pub use error::{FabError, FabResult, GenerationError, ValidationError};
pub use pairing::{assign_pairing, BoxId, BoxRegistry, Item, TaskBox};
pub use record::{write_json_lines, RecordKind, TrialRecord};
pub use response::{KeyMap, Response};
pub use schedule::{generate_schedule, generate_schedule_with_limit, DevaluationSchedule, ScheduleParams};
pub use scoring::{score, CheckpointSummary, LedgerEntry, ScoreLedger};
pub use sequence::{
    build_instructed_discrimination, build_outcome_devaluation, build_slips_block, CueItem,
    Distractor, Phase, Probe, Timing, Trial, TrialKind,
};
pub use session::{Session, TrialPlayer};
