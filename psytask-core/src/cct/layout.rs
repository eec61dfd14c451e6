//! Search-display generation: items, configurations, and the repeated pool.
use std::fmt;

use rand::Rng;
use rand::seq::index;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{ConfigError, SessionError};

/// Largest grid side; cell coordinates are stored as `u8`.
pub const MAX_GRID_SIZE: usize = u8::MAX as usize;

/// Inline capacity covering the default twelve-item display.
pub type ItemList = SmallVec<[Item; 16]>;

/// Orientation of a letter stimulus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum Rotation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub const ALL: [Self; 4] = [Self::Deg0, Self::Deg90, Self::Deg180, Self::Deg270];

    #[must_use]
    pub const fn degrees(self) -> u16 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// Uniform draw over the four orientations.
    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

impl From<Rotation> for u16 {
    fn from(value: Rotation) -> Self {
        value.degrees()
    }
}

impl TryFrom<u16> for Rotation {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|rotation| rotation.degrees() == value)
            .ok_or_else(|| format!("unsupported rotation {value}"))
    }
}

/// Target (rotated T) or distractor (rotated L).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Target,
    Distractor,
}

/// Grid coordinate, both components in `[0, grid_size)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    pub column: u8,
    pub row: u8,
}

impl GridCell {
    #[must_use]
    pub const fn new(column: u8, row: u8) -> Self {
        Self { column, row }
    }
}

impl fmt::Display for GridCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.column, self.row)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    pub kind: ItemKind,
    pub cell: GridCell,
    pub rotation: Rotation,
}

/// Identity of a configuration; novel displays share the `-1` label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigId {
    Repeated(usize),
    Novel,
}

impl ConfigId {
    /// Integer label written to the trial log.
    #[must_use]
    pub fn label(self) -> i64 {
        match self {
            Self::Repeated(index) => i64::try_from(index).unwrap_or(i64::MAX),
            Self::Novel => -1,
        }
    }
}

impl fmt::Display for ConfigId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One search display: a target plus distractors on pairwise distinct cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    id: ConfigId,
    items: ItemList,
}

impl Configuration {
    #[must_use]
    pub const fn id(&self) -> ConfigId {
        self.id
    }

    #[must_use]
    pub const fn is_repeated(&self) -> bool {
        matches!(self.id, ConfigId::Repeated(_))
    }

    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// The single target item.
    #[must_use]
    pub fn target(&self) -> &Item {
        // Generation always places the target first.
        &self.items[0]
    }
}

/// Generate a display with `item_count` items on a `grid_size²` grid.
///
/// Cells are sampled without replacement; the first sampled cell holds the
/// target and every item gets an independent uniform rotation.
///
/// # Errors
///
/// Returns `ConfigError::TooManyItems` when the grid cannot hold the items,
/// `ConfigError::GridTooLarge` past [`MAX_GRID_SIZE`], and
/// `ConfigError::MinViolation` for an empty grid or display.
pub fn generate_configuration<R: Rng + ?Sized>(
    grid_size: usize,
    item_count: usize,
    id: ConfigId,
    rng: &mut R,
) -> Result<Configuration, ConfigError> {
    if grid_size == 0 {
        return Err(ConfigError::MinViolation {
            field: "grid_size",
            min: 1,
            value: grid_size,
        });
    }
    if grid_size > MAX_GRID_SIZE {
        return Err(ConfigError::GridTooLarge {
            grid: grid_size,
            max: MAX_GRID_SIZE,
        });
    }
    if item_count == 0 {
        return Err(ConfigError::MinViolation {
            field: "item_count",
            min: 1,
            value: item_count,
        });
    }
    let cells = grid_size * grid_size;
    if item_count > cells {
        return Err(ConfigError::TooManyItems {
            items: item_count,
            grid: grid_size,
            cells,
        });
    }

    let mut items = ItemList::with_capacity(item_count);
    for (position, cell_index) in index::sample(rng, cells, item_count)
        .into_iter()
        .enumerate()
    {
        let kind = if position == 0 {
            ItemKind::Target
        } else {
            ItemKind::Distractor
        };
        items.push(Item {
            kind,
            cell: cell_from_index(cell_index, grid_size),
            rotation: Rotation::sample(rng),
        });
    }
    Ok(Configuration { id, items })
}

/// Fresh, never reused display for a novel trial.
///
/// # Errors
///
/// See [`generate_configuration`].
pub fn generate_novel_configuration<R: Rng + ?Sized>(
    grid_size: usize,
    item_count: usize,
    rng: &mut R,
) -> Result<Configuration, ConfigError> {
    generate_configuration(grid_size, item_count, ConfigId::Novel, rng)
}

fn cell_from_index(cell_index: usize, grid_size: usize) -> GridCell {
    // grid_size <= MAX_GRID_SIZE was checked by the caller.
    let column = u8::try_from(cell_index / grid_size).unwrap_or(u8::MAX);
    let row = u8::try_from(cell_index % grid_size).unwrap_or(u8::MAX);
    GridCell::new(column, row)
}

/// Repeated displays generated once at setup and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatedPool {
    configurations: Vec<Configuration>,
}

impl RepeatedPool {
    /// Generate `size` repeated configurations.
    ///
    /// # Errors
    ///
    /// See [`generate_configuration`].
    pub fn generate<R: Rng + ?Sized>(
        size: usize,
        grid_size: usize,
        item_count: usize,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        let configurations = (0..size)
            .map(|index| {
                generate_configuration(grid_size, item_count, ConfigId::Repeated(index), rng)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { configurations })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.configurations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }

    /// The same configuration on every call for a given index.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::RepeatedIndexOutOfRange` for an index past the pool.
    pub fn select(&self, index: usize) -> Result<&Configuration, SessionError> {
        self.configurations
            .get(index)
            .ok_or(SessionError::RepeatedIndexOutOfRange {
                index,
                pool: self.configurations.len(),
            })
    }
}

/// Outcome of the per-trial repeated/novel decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialKind {
    Repeated(usize),
    Novel,
}

/// Biased coin between repeated and novel displays.
///
/// The coin is always drawn. The trial is novel when the coin lands below
/// `novel_probability` or when `trial_in_block` has run past the repeated
/// pool; otherwise it replays pool entry `trial_in_block % pool_size`. This
/// does not balance conditions within a block.
pub fn select_trial_kind<R: Rng + ?Sized>(
    trial_in_block: usize,
    pool_size: usize,
    novel_probability: f64,
    rng: &mut R,
) -> TrialKind {
    let coin = rng.r#gen::<f64>();
    if coin < novel_probability || trial_in_block >= pool_size || pool_size == 0 {
        TrialKind::Novel
    } else {
        TrialKind::Repeated(trial_in_block % pool_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use std::collections::HashSet;

    fn cells(config: &Configuration) -> HashSet<GridCell> {
        config.items().iter().map(|item| item.cell).collect()
    }

    #[test]
    fn generated_cells_are_distinct_with_one_target() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        for _ in 0..200 {
            let config = generate_novel_configuration(6, 12, &mut rng).unwrap();
            assert_eq!(config.items().len(), 12);
            assert_eq!(cells(&config).len(), 12);
            let targets = config
                .items()
                .iter()
                .filter(|item| item.kind == ItemKind::Target)
                .count();
            assert_eq!(targets, 1);
            assert_eq!(config.target().kind, ItemKind::Target);
            assert!(
                config
                    .items()
                    .iter()
                    .all(|item| item.cell.column < 6 && item.cell.row < 6)
            );
        }
    }

    #[test]
    fn full_grid_is_allowed_and_overflow_rejected() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let full = generate_novel_configuration(3, 9, &mut rng).unwrap();
        assert_eq!(cells(&full).len(), 9);
        assert_eq!(
            generate_novel_configuration(3, 10, &mut rng),
            Err(ConfigError::TooManyItems {
                items: 10,
                grid: 3,
                cells: 9
            })
        );
        assert_eq!(
            generate_novel_configuration(MAX_GRID_SIZE + 1, 4, &mut rng),
            Err(ConfigError::GridTooLarge {
                grid: 256,
                max: MAX_GRID_SIZE
            })
        );
    }

    #[test]
    fn different_seeds_give_different_layouts() {
        let mut first = ChaCha20Rng::seed_from_u64(11);
        let mut second = ChaCha20Rng::seed_from_u64(12);
        let a = generate_novel_configuration(6, 12, &mut first).unwrap();
        let b = generate_novel_configuration(6, 12, &mut second).unwrap();
        assert_ne!(cells(&a), cells(&b));
    }

    #[test]
    fn repeated_selection_is_stable() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let pool = RepeatedPool::generate(4, 6, 12, &mut rng).unwrap();
        let first = pool.select(2).unwrap().clone();
        let second = pool.select(2).unwrap();
        assert_eq!(&first, second);
        assert_eq!(first.id(), ConfigId::Repeated(2));
        assert!(first.is_repeated());
        assert!(matches!(
            pool.select(4),
            Err(SessionError::RepeatedIndexOutOfRange { index: 4, pool: 4 })
        ));
    }

    #[test]
    fn trial_kind_forces_novel_past_pool() {
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        for trial in 12..24 {
            assert_eq!(select_trial_kind(trial, 12, 0.0, &mut rng), TrialKind::Novel);
        }
        for trial in 0..12 {
            assert_eq!(
                select_trial_kind(trial, 12, 0.0, &mut rng),
                TrialKind::Repeated(trial)
            );
            assert_eq!(select_trial_kind(trial, 12, 1.0, &mut rng), TrialKind::Novel);
        }
    }

    #[test]
    fn rotation_serializes_as_degrees() {
        assert_eq!(serde_json::to_string(&Rotation::Deg270).unwrap(), "270");
        let parsed: Rotation = serde_json::from_str("90").unwrap();
        assert_eq!(parsed, Rotation::Deg90);
        assert!(serde_json::from_str::<Rotation>("45").is_err());
        assert_eq!(GridCell::new(3, 4).to_string(), "(3, 4)");
        assert_eq!(ConfigId::Novel.to_string(), "-1");
    }
}
