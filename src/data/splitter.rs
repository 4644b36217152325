// ============================================================
// Layer 4 — Train / Validation / Inference Splitter
// ============================================================
// Partitions rows into three disjoint sets with two sequential
// shuffled splits:
//
//   all rows ──split(val_size)──▶ train | temp
//   temp     ──split(inference_size)──▶ validation | inference
//
// Sizes (N rows):
//   temp       = ceil(N * val_size)
//   train      = N - temp
//   inference  = ceil(temp * inference_size)
//   validation = temp - inference
//
// e.g. N=5000, val_size=0.2, inference_size=0.05
//      → train 4000, validation 950, inference 50
//
// Both shuffles use a StdRng seeded with the same fixed seed, so
// identical input + identical ratios always yield identical
// partitions. Empty partitions are valid output.
//
// Why shuffle before splitting?
//   Exported datasets are often sorted (by signup date, by label).
//   Cutting them in file order would put only recent users, or only
//   filers, into validation.
//
// Why a fixed seed?
//   Two retraining runs on the same CSV must hold out the same rows,
//   otherwise their validation scores are not comparable.
//
// Why two sequential splits?
//   The inference slice is carved out of the held-out rows, not out
//   of the whole dataset, so inference_size is a fraction of temp.
//   This keeps the train share at exactly 1 - val_size.
//
// Reference: Rust Book §8 (Vectors)
//            rand crate documentation (SeedableRng, SliceRandom)

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::domain::error::{ModelError, ModelResult};

/// Shuffle seed used when the caller does not pick one.
pub const DEFAULT_SPLIT_SEED: u64 = 42;

// Products like 30 * 0.1 land a hair above the integer in binary
// floating point; without this slack ceil() would take one extra row.
const SIZE_EPSILON: f64 = 1e-9;

/// Validated pair of split fractions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitRatios {
    val_size:       f64,
    inference_size: f64,
}

impl SplitRatios {
    /// Both fractions must lie in (0, 1) and sum to less than 1 so a
    /// training partition remains.
    pub fn new(val_size: f64, inference_size: f64) -> ModelResult<Self> {
        for (name, value) in [("val_size", val_size), ("inference_size", inference_size)] {
            if !(value > 0.0 && value < 1.0) {
                return Err(ModelError::InvalidConfig(format!(
                    "{name} must be in (0, 1), got {value}"
                )));
            }
        }
        if val_size + inference_size >= 1.0 {
            return Err(ModelError::InvalidConfig(format!(
                "val_size + inference_size must be < 1, got {}",
                val_size + inference_size
            )));
        }
        Ok(Self { val_size, inference_size })
    }

    pub fn val_size(&self) -> f64 {
        self.val_size
    }

    pub fn inference_size(&self) -> f64 {
        self.inference_size
    }

    /// Partition sizes for a dataset of `n` rows.
    pub fn partition_sizes(&self, n: usize) -> PartitionSizes {
        let temp      = carved_len(n, self.val_size);
        let inference = carved_len(temp, self.inference_size);
        PartitionSizes {
            train:      n - temp,
            validation: temp - inference,
            inference,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSizes {
    pub train:      usize,
    pub validation: usize,
    pub inference:  usize,
}

impl PartitionSizes {
    pub fn total(&self) -> usize {
        self.train + self.validation + self.inference
    }
}

/// The three disjoint partitions of one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Partitions<T> {
    pub train:      Vec<T>,
    pub validation: Vec<T>,
    pub inference:  Vec<T>,
}

impl<T> Partitions<T> {
    pub fn sizes(&self) -> PartitionSizes {
        PartitionSizes {
            train:      self.train.len(),
            validation: self.validation.len(),
            inference:  self.inference.len(),
        }
    }
}

/// Shuffle and split `items` into train / validation / inference.
///
/// Every item lands in exactly one partition.
pub fn split_partitions<T>(items: Vec<T>, ratios: SplitRatios, seed: u64) -> Partitions<T> {
    let total = items.len();

    let (train, temp)          = carve(items, ratios.val_size, seed);
    let (validation, inference) = carve(temp, ratios.inference_size, seed);

    let partitions = Partitions { train, validation, inference };
    tracing::debug!(
        "Split {} rows: {} train, {} validation, {} inference",
        total,
        partitions.train.len(),
        partitions.validation.len(),
        partitions.inference.len(),
    );
    partitions
}

/// Number of rows a `fraction` split takes out of `n`.
fn carved_len(n: usize, fraction: f64) -> usize {
    let raw = (n as f64 * fraction - SIZE_EPSILON).ceil();
    (raw.max(0.0) as usize).min(n)
}

/// Shuffle, then return (kept, carved) where `carved` holds
/// `carved_len(n, fraction)` items.
fn carve<T>(mut items: Vec<T>, fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let carved_count = carved_len(items.len(), fraction);

    let mut rng = StdRng::seed_from_u64(seed);
    items.shuffle(&mut rng);

    // split_off leaves [0, carved_count) in `items`.
    let kept = items.split_off(carved_count);
    (kept, items)
}
