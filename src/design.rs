//! Whole-task design generation, box files, and seed files.
//!
//! A [`TaskDesign`] is everything a run needs before the first trial: the
//! box pairing (with its devaluation schedule) and the trial list of every
//! phase. Generation is a pure function of the name pool, the settings and
//! a seed.
//!
//! Pairing and trial order draw from separate random streams derived from
//! the same seed. A box file saved by one run can therefore be reused by a
//! later run (possibly with a different seed) without disturbing how that
//! later run orders its trials.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::TaskSettings;
use crate::direction::{Direction, Role};
use crate::error::{FabError, FabResult, ValidationError};
use crate::pairing::{assign_pairing, BoxRegistry, TaskBox};
use crate::schedule::{generate_schedule_with_limit, DevaluationSchedule};
use crate::sequence::{
    build_instructed_discrimination, build_outcome_devaluation, build_slips_block, Phase, Trial,
};

/// Mixed into the seed for the trial-order stream.
const ORDER_STREAM: u64 = 0x9e37_79b9_7f4a_7c15;

/// Upper bound (exclusive) for freshly drawn seeds.
const MAX_FRESH_SEED: u64 = 10_000_000_000;

/// One box as stored in a box file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxEntry {
    /// Box label, e.g. `L0`.
    pub label: String,
    /// Stimulus name.
    pub stimulus: String,
    /// Outcome name.
    pub outcome: String,
    /// Side that opens the box.
    pub direction: Direction,
    /// Test blocks on which the box is devalued.
    pub devalued_blocks: BTreeSet<usize>,
}

/// Saved pairing, so later sessions of the same participant see the same boxes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxFile {
    /// Seed of the run that generated the pairing.
    pub seed: u64,
    /// [`BoxRegistry::fingerprint`] of the stored boxes.
    pub fingerprint: String,
    /// Boxes in assignment order.
    pub boxes: Vec<BoxEntry>,
}

impl BoxFile {
    /// Snapshot a registry.
    #[must_use]
    pub fn from_registry(registry: &BoxRegistry, seed: u64) -> Self {
        let boxes = registry
            .iter()
            .map(|bx| BoxEntry {
                label: bx.label().to_string(),
                stimulus: bx.stimulus().name().to_string(),
                outcome: bx.outcome().name().to_string(),
                direction: bx.direction(),
                devalued_blocks: bx.devalued_blocks().clone(),
            })
            .collect();
        Self {
            seed,
            fingerprint: registry.fingerprint(),
            boxes,
        }
    }

    /// Rebuild the registry.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::BoxFileMismatch` if the rebuilt boxes do not
    /// hash to the stored fingerprint, or any error
    /// [`BoxRegistry::from_boxes`] raises.
    pub fn to_registry(&self) -> Result<BoxRegistry, ValidationError> {
        let boxes = self
            .boxes
            .iter()
            .map(|e| {
                TaskBox::new(
                    e.label.as_str(),
                    e.stimulus.as_str(),
                    e.outcome.as_str(),
                    e.direction,
                    e.devalued_blocks.clone(),
                )
            })
            .collect();
        let registry = BoxRegistry::from_boxes(boxes)?;
        if registry.fingerprint() != self.fingerprint {
            return Err(ValidationError::BoxFileMismatch {
                reason: "fingerprint does not match stored boxes".to_string(),
            });
        }
        Ok(registry)
    }

    /// All item names in the file.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.boxes
            .iter()
            .flat_map(|e| [e.stimulus.as_str(), e.outcome.as_str()])
    }

    /// Write the file as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns `FabError::Io` or `FabError::Serialization` on failure.
    pub fn save(&self, path: impl AsRef<Path>) -> FabResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Read a file written by [`BoxFile::save`].
    ///
    /// # Errors
    ///
    /// Returns `FabError::Io` or `FabError::Serialization` on failure.
    pub fn load(path: impl AsRef<Path>) -> FabResult<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// A complete, reproducible task design.
#[derive(Debug, Clone)]
pub struct TaskDesign {
    seed: u64,
    registry: BoxRegistry,
    schedule_attempts: Option<usize>,
    phases: BTreeMap<Phase, Vec<Trial>>,
}

impl TaskDesign {
    /// Generate pairing, schedule and every phase from `seed`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `settings` are inconsistent or the name
    /// pool cannot be paired into balanced boxes, and a generation error if
    /// the devaluation schedule or a run-limited order cannot be drawn.
    pub fn generate<S: AsRef<str>>(names: &[S], settings: &TaskSettings, seed: u64) -> FabResult<Self> {
        settings.validate()?;
        if names.is_empty() {
            return Err(ValidationError::EmptyNamePool.into());
        }
        if names.len() % 2 != 0 {
            return Err(ValidationError::OddNamePool { size: names.len() }.into());
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let params = settings.schedule.params(names.len() / 2);
        let schedule = generate_schedule_with_limit(params, settings.max_schedule_attempts, &mut rng)?;
        let attempts = schedule.attempts();
        let registry = assign_pairing(names, schedule.per_item(), &mut rng)?;

        Self::assemble(registry, settings, seed, Some(attempts))
    }

    /// Build every phase around an existing pairing.
    ///
    /// The registry's devalued blocks must form an exact schedule under
    /// `settings.schedule`: every box devalued on `reps_per_item` blocks and
    /// every test block devaluing `choose` boxes.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `settings` are inconsistent, and
    /// `ValidationError::ScheduleCapacityMismatch` or
    /// `ValidationError::ScheduleShapeMismatch` if the registry's devaluation
    /// pattern does not fit the configured schedule.
    pub fn from_registry(registry: BoxRegistry, settings: &TaskSettings, seed: u64) -> FabResult<Self> {
        settings.validate()?;
        let per_item = registry.iter().map(|bx| bx.devalued_blocks().clone()).collect();
        DevaluationSchedule::from_per_item(settings.schedule.params(registry.len()), per_item)?;
        Self::assemble(registry, settings, seed, None)
    }

    /// Reuse the pairing stored at `path`, or generate one and store it there.
    ///
    /// An existing file must hold exactly the names in `names`. Trial order
    /// always follows `seed`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::BoxFileMismatch` if the stored boxes do not
    /// match the pool, and otherwise as [`TaskDesign::generate`] and
    /// [`BoxFile::load`].
    pub fn with_box_file<S: AsRef<str>>(
        path: impl AsRef<Path>,
        names: &[S],
        settings: &TaskSettings,
        seed: u64,
    ) -> FabResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            let design = Self::generate(names, settings, seed)?;
            design.box_file().save(path)?;
            tracing::info!(path = %path.display(), "created box file");
            return Ok(design);
        }

        let file = BoxFile::load(path)?;
        let stored: HashSet<&str> = file.names().collect();
        let pool: HashSet<&str> = names.iter().map(AsRef::as_ref).collect();
        if stored != pool || stored.len() != names.len() {
            return Err(ValidationError::BoxFileMismatch {
                reason: format!(
                    "{} stores {} names that differ from the {}-name pool",
                    path.display(),
                    stored.len(),
                    names.len()
                ),
            }
            .into());
        }
        let registry = file.to_registry()?;
        tracing::info!(path = %path.display(), stored_seed = file.seed, "reusing box file");
        Self::from_registry(registry, settings, seed)
    }

    fn assemble(
        registry: BoxRegistry,
        settings: &TaskSettings,
        seed: u64,
        schedule_attempts: Option<usize>,
    ) -> FabResult<Self> {
        let mut rng = StdRng::seed_from_u64(seed ^ ORDER_STREAM);
        let phases = build_phases(&registry, settings, &mut rng)?;

        tracing::info!(
            seed,
            boxes = registry.len(),
            schedule_attempts = ?schedule_attempts,
            trials = phases.values().map(Vec::len).sum::<usize>(),
            fingerprint = %registry.fingerprint(),
            "task design ready"
        );
        Ok(Self {
            seed,
            registry,
            schedule_attempts,
            phases,
        })
    }

    /// Seed the trial order was drawn from.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// The box pairing.
    #[must_use]
    pub const fn registry(&self) -> &BoxRegistry {
        &self.registry
    }

    /// Draws the schedule needed, or `None` if the pairing was reused.
    #[must_use]
    pub const fn schedule_attempts(&self) -> Option<usize> {
        self.schedule_attempts
    }

    /// Trials of one phase.
    #[must_use]
    pub fn phase(&self, phase: Phase) -> &[Trial] {
        self.phases.get(&phase).map(Vec::as_slice).unwrap_or_default()
    }

    /// Trials of every phase, in running order.
    #[must_use]
    pub const fn phases(&self) -> &BTreeMap<Phase, Vec<Trial>> {
        &self.phases
    }

    /// The pairing as a saveable box file.
    #[must_use]
    pub fn box_file(&self) -> BoxFile {
        BoxFile::from_registry(&self.registry, self.seed)
    }

    /// Write each phase's trials to `<dir>/<code>.json`.
    ///
    /// # Errors
    ///
    /// Returns `FabError::Io` or `FabError::Serialization` on failure.
    pub fn save_trials(&self, dir: impl AsRef<Path>) -> FabResult<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        for (phase, trials) in &self.phases {
            let path = dir.join(format!("{}.json", phase.code()));
            fs::write(&path, serde_json::to_string_pretty(trials)?)?;
            tracing::debug!(path = %path.display(), trials = trials.len(), "wrote phase trials");
        }
        Ok(())
    }
}

fn build_phases<R: Rng + ?Sized>(
    registry: &BoxRegistry,
    settings: &TaskSettings,
    rng: &mut R,
) -> FabResult<BTreeMap<Phase, Vec<Trial>>> {
    let mut phases = BTreeMap::new();
    let id = &settings.instructed;
    phases.insert(
        Phase::InstructedDiscrimination,
        build_instructed_discrimination(registry, id.reps, id.blocks, settings, rng)?,
    );
    phases.insert(
        Phase::OutcomeDevaluation,
        build_outcome_devaluation(registry, settings.outcome.reps, settings, rng)?,
    );
    let soa = &settings.slips;
    phases.insert(
        Phase::SlipsOfAction,
        build_slips_block(registry, Role::Outcome, soa.blocks, soa.reps, settings, rng)?,
    );
    let dd = &settings.discrimination;
    phases.insert(
        Phase::DevaluationDiscrimination,
        build_slips_block(registry, Role::Stimulus, dd.blocks, dd.reps, settings, rng)?,
    );
    Ok(phases)
}

/// Settle the seed for a participant.
///
/// A seed stored at `path` wins when none is requested; a requested seed is
/// used and stored when no file exists; with neither, a fresh seed is drawn
/// and stored.
///
/// # Errors
///
/// Returns `ValidationError::SeedMismatch` if a stored seed and a requested
/// seed disagree, `FabError::Serialization` if the file does not hold a
/// number, and `FabError::Io` if it cannot be read or written.
pub fn pick_seed(path: impl AsRef<Path>, requested: Option<u64>) -> FabResult<u64> {
    let path = path.as_ref();
    let stored = if path.exists() {
        let text = fs::read_to_string(path)?;
        let seed = text.trim().parse::<u64>().map_err(|e| FabError::Serialization {
            message: format!("seed file {}: {e}", path.display()),
        })?;
        Some(seed)
    } else {
        None
    };

    let seed = match (stored, requested) {
        (Some(stored), Some(requested)) if stored != requested => {
            return Err(ValidationError::SeedMismatch { stored, requested }.into());
        }
        (Some(stored), _) => stored,
        (None, Some(requested)) => requested,
        (None, None) => rand::thread_rng().gen_range(1..MAX_FRESH_SEED),
    };

    if stored.is_none() {
        fs::write(path, seed.to_string())?;
        tracing::info!(path = %path.display(), seed, "stored seed");
    }
    Ok(seed)
}
