//! Box construction: pairing stimuli with outcomes and response sides.
//!
//! Every box pairs one stimulus (drawn on the outside) with one outcome
//! (hidden inside). Both items open to the same side and share the same
//! devalued-block set. Items refer to their box through a [`BoxId`]; the
//! [`BoxRegistry`] resolves ids to box records.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::direction::{Direction, Role};
use crate::error::ValidationError;

/// Namespace for deriving box identifiers.
const BOX_NAMESPACE: Uuid = Uuid::from_u128(0x6a1f_3c2e_9b4d_4f70_8e15_c0ff_ee5a_11ce);

/// Stable box identifier.
///
/// Derived from the box label and its two item names, so the same pairing
/// always yields the same id (a reloaded box file resolves to the same ids).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoxId(Uuid);

impl BoxId {
    /// Derives the id for a box from its label and contents.
    #[must_use]
    pub fn derive(label: &str, stimulus: &str, outcome: &str) -> Self {
        let key = format!("{label}\u{1f}{stimulus}\u{1f}{outcome}");
        Self(Uuid::new_v5(&BOX_NAMESPACE, key.as_bytes()))
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for BoxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named stimulus or outcome, bound to exactly one box.
///
/// All fields are assigned when the owning box is constructed and never
/// change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    name: String,
    role: Role,
    direction: Direction,
    box_id: BoxId,
    devalued_blocks: BTreeSet<usize>,
}

impl Item {
    /// Name from the pool, e.g. `apple`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the item is drawn on the outside or hidden inside.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Side that opens the owning box.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Id of the box this item belongs to.
    #[must_use]
    pub const fn box_id(&self) -> BoxId {
        self.box_id
    }

    /// Test blocks on which this item is devalued.
    #[must_use]
    pub const fn devalued_blocks(&self) -> &BTreeSet<usize> {
        &self.devalued_blocks
    }

    /// Returns true if this item is devalued on the given test block.
    #[must_use]
    pub fn is_devalued_at(&self, block: usize) -> bool {
        self.devalued_blocks.contains(&block)
    }
}

/// A stimulus/outcome pair sharing one response direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskBox {
    id: BoxId,
    label: String,
    stimulus: Item,
    outcome: Item,
}

impl TaskBox {
    /// Builds a box and binds both items to it.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::BTreeSet;
    /// use fabfruit::{Direction, TaskBox};
    ///
    /// let bx = TaskBox::new("L0", "apple", "kiwi", Direction::Left, BTreeSet::from([1, 4]));
    /// assert_eq!(bx.stimulus().direction(), bx.outcome().direction());
    /// assert_eq!(bx.outcome().box_id(), bx.id());
    /// assert!(bx.is_devalued_at(4));
    /// ```
    #[must_use]
    pub fn new(
        label: impl Into<String>,
        stimulus: impl Into<String>,
        outcome: impl Into<String>,
        direction: Direction,
        devalued_blocks: BTreeSet<usize>,
    ) -> Self {
        let label = label.into();
        let stimulus = stimulus.into();
        let outcome = outcome.into();
        let id = BoxId::derive(&label, &stimulus, &outcome);

        Self {
            id,
            label,
            stimulus: Item {
                name: stimulus,
                role: Role::Stimulus,
                direction,
                box_id: id,
                devalued_blocks: devalued_blocks.clone(),
            },
            outcome: Item {
                name: outcome,
                role: Role::Outcome,
                direction,
                box_id: id,
                devalued_blocks,
            },
        }
    }

    /// Stable id derived from label and contents.
    #[must_use]
    pub const fn id(&self) -> BoxId {
        self.id
    }

    /// Short label such as `L0` or `R2`.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Item drawn on the outside.
    #[must_use]
    pub const fn stimulus(&self) -> &Item {
        &self.stimulus
    }

    /// Item hidden inside.
    #[must_use]
    pub const fn outcome(&self) -> &Item {
        &self.outcome
    }

    /// Returns the item on the given side of the box.
    #[must_use]
    pub const fn item(&self, role: Role) -> &Item {
        match role {
            Role::Stimulus => &self.stimulus,
            Role::Outcome => &self.outcome,
        }
    }

    /// Side that opens the box.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.stimulus.direction
    }

    /// Test blocks on which both items are devalued.
    #[must_use]
    pub const fn devalued_blocks(&self) -> &BTreeSet<usize> {
        &self.stimulus.devalued_blocks
    }

    /// Returns true if the box is devalued on the given test block.
    #[must_use]
    pub fn is_devalued_at(&self, block: usize) -> bool {
        self.stimulus.is_devalued_at(block)
    }
}

impl fmt::Display for TaskBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} -> {} ({})",
            self.label,
            self.stimulus.name,
            self.outcome.name,
            self.direction()
        )
    }
}

/// Registry of boxes keyed by [`BoxId`], in assignment order.
#[derive(Debug, Clone, Default)]
pub struct BoxRegistry {
    boxes: Vec<TaskBox>,
    by_id: HashMap<BoxId, usize>,
    by_name: HashMap<String, BoxId>,
}

impl BoxRegistry {
    /// Builds a registry from already-constructed boxes.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::DuplicateName` if an item name is used twice
    /// and `ValidationError::UnbalancedBoxCount` if left and right boxes are
    /// not equally many.
    pub fn from_boxes(boxes: Vec<TaskBox>) -> Result<Self, ValidationError> {
        let mut by_id = HashMap::with_capacity(boxes.len());
        let mut by_name = HashMap::with_capacity(boxes.len() * 2);

        for (idx, bx) in boxes.iter().enumerate() {
            by_id.insert(bx.id, idx);
            for item in [&bx.stimulus, &bx.outcome] {
                if by_name.insert(item.name.clone(), bx.id).is_some() {
                    return Err(ValidationError::DuplicateName {
                        name: item.name.clone(),
                    });
                }
            }
        }

        let lefts = boxes
            .iter()
            .filter(|b| b.direction() == Direction::Left)
            .count();
        if lefts * 2 != boxes.len() {
            return Err(ValidationError::UnbalancedBoxCount { boxes: boxes.len() });
        }

        Ok(Self {
            boxes,
            by_id,
            by_name,
        })
    }

    /// Number of boxes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    /// Returns true if the registry holds no boxes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Boxes in assignment order.
    #[must_use]
    pub fn boxes(&self) -> &[TaskBox] {
        &self.boxes
    }

    /// Iterates boxes in assignment order.
    pub fn iter(&self) -> std::slice::Iter<'_, TaskBox> {
        self.boxes.iter()
    }

    /// Looks up a box by id.
    #[must_use]
    pub fn get(&self, id: BoxId) -> Option<&TaskBox> {
        self.by_id.get(&id).map(|&idx| &self.boxes[idx])
    }

    /// Position of a box in assignment order.
    #[must_use]
    pub fn position(&self, id: BoxId) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    /// Looks up an item by name.
    #[must_use]
    pub fn item(&self, name: &str) -> Option<&Item> {
        let id = self.by_name.get(name)?;
        let bx = self.get(*id)?;
        if bx.stimulus.name == name {
            Some(&bx.stimulus)
        } else {
            Some(&bx.outcome)
        }
    }

    /// Resolves the box an item belongs to.
    #[must_use]
    pub fn box_of(&self, item: &Item) -> Option<&TaskBox> {
        self.get(item.box_id)
    }

    /// All items with the given role, in box order.
    pub fn items(&self, role: Role) -> impl Iterator<Item = &Item> {
        self.boxes.iter().map(move |b| b.item(role))
    }

    /// Digest of the pairing: labels, names, directions and devalued blocks.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for bx in &self.boxes {
            hasher.update(bx.label.as_bytes());
            hasher.update(&[0x1f]);
            hasher.update(bx.stimulus.name.as_bytes());
            hasher.update(&[0x1f]);
            hasher.update(bx.outcome.name.as_bytes());
            hasher.update(&[0x1f, bx.direction().letter() as u8]);
            for block in bx.devalued_blocks() {
                hasher.update(&(*block as u64).to_le_bytes());
            }
            hasher.update(&[0x1e]);
        }
        hasher.finalize().to_hex().to_string()
    }
}

/// Randomly pairs stimuli with outcomes and assigns balanced response sides.
///
/// The pool is shuffled and split in half: position `i` of the first half
/// becomes the stimulus of box `i`, position `i` of the second half its
/// outcome. An independently shuffled list of exactly `N/2` left and `N/2`
/// right sides gives each box its direction, and `per_box_devaluation[i]` is
/// attached to both items of box `i`.
///
/// # Errors
///
/// Returns a `ValidationError` if the pool is empty, odd-sized, holds
/// duplicates, yields an odd number of boxes, or if the number of
/// devaluation sets differs from the number of boxes.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeSet;
/// use fabfruit::{assign_pairing, Direction};
/// use rand::SeedableRng;
///
/// let mut rng = rand::rngs::StdRng::seed_from_u64(7);
/// let names = ["apple", "kiwi", "lemon", "melon"];
/// let devals = vec![BTreeSet::new(), BTreeSet::new()];
/// let registry = assign_pairing(&names, &devals, &mut rng).unwrap();
///
/// let lefts = registry.iter().filter(|b| b.direction() == Direction::Left).count();
/// assert_eq!(lefts, 1);
/// ```
pub fn assign_pairing<S, R>(
    names: &[S],
    per_box_devaluation: &[BTreeSet<usize>],
    rng: &mut R,
) -> Result<BoxRegistry, ValidationError>
where
    S: AsRef<str>,
    R: Rng + ?Sized,
{
    if names.is_empty() {
        return Err(ValidationError::EmptyNamePool);
    }
    if names.len() % 2 != 0 {
        return Err(ValidationError::OddNamePool { size: names.len() });
    }
    let n_boxes = names.len() / 2;
    if n_boxes % 2 != 0 {
        return Err(ValidationError::UnbalancedBoxCount { boxes: n_boxes });
    }
    if per_box_devaluation.len() != n_boxes {
        return Err(ValidationError::DevaluationCountMismatch {
            expected: n_boxes,
            actual: per_box_devaluation.len(),
        });
    }

    let mut seen = HashSet::with_capacity(names.len());
    for name in names {
        if !seen.insert(name.as_ref()) {
            return Err(ValidationError::DuplicateName {
                name: name.as_ref().to_string(),
            });
        }
    }

    let mut pool: Vec<&str> = names.iter().map(AsRef::as_ref).collect();
    pool.shuffle(rng);

    let mut sides: Vec<Direction> = Direction::ALL
        .iter()
        .flat_map(|&d| std::iter::repeat(d).take(n_boxes / 2))
        .collect();
    sides.shuffle(rng);

    let (stimuli, outcomes) = pool.split_at(n_boxes);
    let mut per_side = [0usize; 2];
    let boxes = stimuli
        .iter()
        .zip(outcomes)
        .zip(sides)
        .zip(per_box_devaluation)
        .map(|(((stim, outcome), side), devalued)| {
            let slot = &mut per_side[side as usize];
            let label = format!("{}{}", side.letter(), *slot);
            *slot += 1;
            TaskBox::new(label, *stim, *outcome, side, devalued.clone())
        })
        .collect();

    BoxRegistry::from_boxes(boxes)
}
