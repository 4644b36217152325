// ============================================================
// Layer 6 — Artifact Store
// ============================================================
// Persists the (classifier, preprocessor) pair as one unit.
//
// On-disk layout for canonical paths model_path / preprocessor_path:
//
//   <model dir>/
//     model.json              ← current classifier
//     preprocessor.json       ← current preprocessor (same generation)
//     old_model.json          ← previous generation, exactly one kept
//     old_preprocessor.json
//
// The "old_" names keep the canonical file's extension and always
// live next to the canonical model file.
//
// Both files wrap their payload in an envelope:
//
//   { "format_version": 1, "generation": <u64>, "kind": "model", "artifact": { .. } }
//
// A save stamps both files with the same generation; load refuses a
// pair whose generations differ.
//
// Save sequence:
//   0. take the write lock  (.model.json.lock beside the model)
//   1. serialise both payloads in memory
//   2. write + fsync both to hidden staging files beside the targets
//      (.model.json.<generation>.staging)
//   3. rotate current pair → old_* (discarding the older old_* pair)
//   4. rename staging → canonical (preprocessor first, model last)
// Any failure rolls back what was moved and removes staging files,
// so the canonical paths hold either the untouched old pair or the
// complete new one. A half-written file is never at a canonical path.
//
// Why stage and rename instead of writing in place?
//   - serde_json writes a file in many small chunks; a crash halfway
//     leaves truncated JSON that no later load can decode
//   - rename() swaps a directory entry in one step on the same
//     filesystem, so model.json is always either the old bytes or
//     the new bytes
//   - staging beside the target keeps source and destination on one
//     filesystem, where rename cannot degrade into a copy
//
// Why a lock file?
//   Two retraining runs aimed at the same model path would otherwise
//   interleave their rotate and promote steps and leave a model from
//   one run next to a preprocessor from the other. The lock is created
//   with create_new, which the OS resolves atomically, so it excludes
//   runs in other threads, other ModelService instances and other
//   processes alike. A process killed mid-run leaves the file behind;
//   it holds the owner's pid and must be removed by hand.
//
// Reference: Rust Book §9 (Error Handling)
//            std::fs::rename, std::fs::OpenOptions::create_new

use std::{
    fs::{self, File, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::data::preprocessor::FittedPreprocessor;
use crate::domain::error::{ModelError, ModelResult};
use crate::ml::model::Classifier;

const FORMAT_VERSION: u32 = 1;

const MODEL_KIND: &str        = "model";
const PREPROCESSOR_KIND: &str = "preprocessor";

pub const PREVIOUS_MODEL_STEM: &str        = "old_model";
pub const PREVIOUS_PREPROCESSOR_STEM: &str = "old_preprocessor";

// ─── ArtifactPair ─────────────────────────────────────────────────────────────
/// A classifier and the preprocessor whose output it was trained on.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactPair {
    model:        Classifier,
    preprocessor: FittedPreprocessor,
}

impl ArtifactPair {
    /// Couple a classifier with its preprocessor. The classifier's input
    /// width must equal the preprocessor's output width.
    pub fn new(model: Classifier, preprocessor: FittedPreprocessor) -> ModelResult<Self> {
        if model.n_features() != preprocessor.output_width() {
            return Err(ModelError::schema(format!(
                "model expects {} features but preprocessor produces {}",
                model.n_features(),
                preprocessor.output_width()
            )));
        }
        Ok(Self { model, preprocessor })
    }

    pub fn model(&self) -> &Classifier {
        &self.model
    }

    pub fn preprocessor(&self) -> &FittedPreprocessor {
        &self.preprocessor
    }

    pub fn into_parts(self) -> (Classifier, FittedPreprocessor) {
        (self.model, self.preprocessor)
    }
}

// ─── ArtifactPaths ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model:        PathBuf,
    pub preprocessor: PathBuf,
}

impl ArtifactPaths {
    pub fn new(model: impl Into<PathBuf>, preprocessor: impl Into<PathBuf>) -> Self {
        Self {
            model:        model.into(),
            preprocessor: preprocessor.into(),
        }
    }

    /// The rotated-backup slot, derived from the canonical model's
    /// parent directory.
    pub fn previous(&self) -> ArtifactPaths {
        let dir = parent_dir(&self.model);
        ArtifactPaths {
            model:        dir.join(backup_name(PREVIOUS_MODEL_STEM, &self.model)),
            preprocessor: dir.join(backup_name(PREVIOUS_PREPROCESSOR_STEM, &self.preprocessor)),
        }
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn backup_name(stem: &str, canonical: &Path) -> String {
    match canonical.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem.to_string(),
    }
}

/// `<dir>/.<file name>.<suffix>`
fn hidden_sibling(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_string());
    parent_dir(path).join(format!(".{name}.{suffix}"))
}

fn staging_path(path: &Path, generation: u64) -> PathBuf {
    hidden_sibling(path, &format!("{generation}.staging"))
}

fn lock_path(model: &Path) -> PathBuf {
    hidden_sibling(model, "lock")
}

// ─── Write lock ───────────────────────────────────────────────────────────────
/// Exclusive write intent over one canonical artifact location.
///
/// Released (the lock file removed) on drop.
#[derive(Debug)]
pub struct ArtifactLock {
    path: PathBuf,
}

impl ArtifactLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ArtifactLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!("Could not release artifact lock '{}': {e}", self.path.display());
        }
    }
}

// ─── Envelope ─────────────────────────────────────────────────────────────────
#[derive(Debug, Serialize, Deserialize)]
struct StoredArtifact<T> {
    format_version: u32,
    generation:     u64,
    kind:           String,
    artifact:       T,
}

fn next_generation() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

fn encode<T: Serialize>(path: &Path, kind: &str, generation: u64, artifact: &T) -> ModelResult<Vec<u8>> {
    let envelope = StoredArtifact {
        format_version: FORMAT_VERSION,
        generation,
        kind: kind.to_string(),
        artifact,
    };
    serde_json::to_vec_pretty(&envelope).map_err(|e| ModelError::persistence(path, e))
}

fn decode<T: DeserializeOwned>(path: &Path, kind: &str) -> ModelResult<StoredArtifact<T>> {
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ModelError::ArtifactNotFound(path.to_path_buf()),
        _ => ModelError::persistence(path, e),
    })?;
    let stored: StoredArtifact<T> = serde_json::from_slice(&bytes)
        .map_err(|e| ModelError::persistence(path, format!("cannot decode {kind}: {e}")))?;

    if stored.format_version != FORMAT_VERSION {
        return Err(ModelError::persistence(
            path,
            format!("unsupported format version {}", stored.format_version),
        ));
    }
    if stored.kind != kind {
        return Err(ModelError::persistence(
            path,
            format!("expected a {kind} artifact, found '{}'", stored.kind),
        ));
    }
    Ok(stored)
}

// ─── ArtifactStore ────────────────────────────────────────────────────────────
/// Owns the canonical on-disk artifact pair.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    paths: ArtifactPaths,
}

impl ArtifactStore {
    pub fn new(paths: ArtifactPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    /// Claim the canonical location for writing. Fails with
    /// `RetrainInProgress` while another holder has it.
    pub fn lock(&self) -> ModelResult<ArtifactLock> {
        let path = lock_path(&self.paths.model);
        let dir  = parent_dir(&path);
        fs::create_dir_all(&dir).map_err(|e| ModelError::persistence(&dir, e))?;

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                tracing::warn!(
                    "Artifacts at '{}' are locked by '{}'",
                    self.paths.model.display(),
                    path.display()
                );
                return Err(ModelError::RetrainInProgress);
            }
            Err(e) => return Err(ModelError::persistence(&path, e)),
        };

        let lock = ArtifactLock { path };
        writeln!(file, "{}", std::process::id()).map_err(|e| ModelError::persistence(&lock.path, e))?;
        Ok(lock)
    }

    /// Rotate the current pair (if any) into the previous slot and write
    /// `pair` to the canonical paths, holding the write lock meanwhile.
    pub fn save(&self, pair: &ArtifactPair) -> ModelResult<()> {
        let lock = self.lock()?;
        self.save_locked(&lock, pair)
    }

    /// `save` for a caller that already holds this store's lock.
    pub fn save_locked(&self, lock: &ArtifactLock, pair: &ArtifactPair) -> ModelResult<()> {
        let paths    = &self.paths;
        if lock.path != lock_path(&paths.model) {
            return Err(ModelError::InvalidConfig(format!(
                "lock '{}' does not cover '{}'",
                lock.path.display(),
                paths.model.display()
            )));
        }
        let previous = paths.previous();
        check_distinct(paths, &previous)?;

        let generation = next_generation();
        let model_bytes = encode(&paths.model, MODEL_KIND, generation, pair.model())?;
        let preprocessor_bytes =
            encode(&paths.preprocessor, PREPROCESSOR_KIND, generation, pair.preprocessor())?;

        for path in [&paths.model, &paths.preprocessor] {
            let dir = parent_dir(path);
            fs::create_dir_all(&dir).map_err(|e| ModelError::persistence(&dir, e))?;
        }

        // ── Stage ─────────────────────────────────────────────────────────────
        let staged = ArtifactPaths::new(
            staging_path(&paths.model, generation),
            staging_path(&paths.preprocessor, generation),
        );
        let staging = write_file(&staged.model, &model_bytes)
            .and_then(|_| write_file(&staged.preprocessor, &preprocessor_bytes));
        if let Err(e) = staging {
            discard_staging(&staged);
            return Err(e);
        }

        // ── Rotate ────────────────────────────────────────────────────────────
        let rotation = if paths.model.exists() {
            tracing::info!(
                "Saving model: rotating existing pair to '{}' / '{}'",
                previous.model.display(),
                previous.preprocessor.display()
            );
            match rotate(paths, &previous) {
                Ok(rotation) => rotation,
                Err(e) => {
                    discard_staging(&staged);
                    return Err(e);
                }
            }
        } else {
            Rotation::default()
        };

        // ── Promote ───────────────────────────────────────────────────────────
        if let Err(e) = rename(&staged.preprocessor, &paths.preprocessor) {
            restore(paths, &previous, rotation, false);
            discard_staging(&staged);
            return Err(e);
        }
        if let Err(e) = promote_model(&staged.model, &paths.model) {
            restore(paths, &previous, rotation, true);
            discard_staging(&staged);
            return Err(e);
        }

        tracing::info!(
            "Saving model: model saved to '{}', preprocessor saved to '{}' (generation {})",
            paths.model.display(),
            paths.preprocessor.display(),
            generation
        );
        Ok(())
    }

    /// Load the canonical pair. Both files must exist.
    pub fn load(&self) -> ModelResult<ArtifactPair> {
        load_pair(&self.paths)
    }

    /// Load the rotated-backup pair kept by the last save.
    pub fn load_previous(&self) -> ModelResult<ArtifactPair> {
        load_pair(&self.paths.previous())
    }
}

/// Load a pair from explicit paths, all-or-nothing.
pub fn load_pair(paths: &ArtifactPaths) -> ModelResult<ArtifactPair> {
    for path in [&paths.model, &paths.preprocessor] {
        if !path.is_file() {
            return Err(ModelError::ArtifactNotFound(path.clone()));
        }
    }

    let model: StoredArtifact<Classifier> = decode(&paths.model, MODEL_KIND)?;
    let preprocessor: StoredArtifact<FittedPreprocessor> =
        decode(&paths.preprocessor, PREPROCESSOR_KIND)?;

    if model.generation != preprocessor.generation {
        return Err(ModelError::persistence(
            &paths.preprocessor,
            format!(
                "preprocessor generation {} does not match model generation {}",
                preprocessor.generation, model.generation
            ),
        ));
    }

    preprocessor
        .artifact
        .validate()
        .map_err(|e| ModelError::persistence(&paths.preprocessor, e))?;
    let classifier = &model.artifact;
    if !classifier.bias().is_finite() || classifier.weights().iter().any(|w| !w.is_finite()) {
        return Err(ModelError::persistence(&paths.model, "classifier has non-finite parameters"));
    }

    let pair = ArtifactPair::new(model.artifact, preprocessor.artifact)
        .map_err(|e| ModelError::persistence(&paths.model, e))?;

    tracing::info!(
        "Loaded model '{}' and preprocessor '{}' (generation {})",
        paths.model.display(),
        paths.preprocessor.display(),
        model.generation
    );
    Ok(pair)
}

// ─── Filesystem steps ─────────────────────────────────────────────────────────
/// Which canonical files were moved into the previous slot.
#[derive(Debug, Clone, Copy, Default)]
struct Rotation {
    model:        bool,
    preprocessor: bool,
}

fn check_distinct(paths: &ArtifactPaths, previous: &ArtifactPaths) -> ModelResult<()> {
    let all = [&paths.model, &paths.preprocessor, &previous.model, &previous.preprocessor];
    for (i, a) in all.iter().enumerate() {
        if all[i + 1..].iter().any(|b| a == b) {
            return Err(ModelError::InvalidConfig(format!(
                "artifact path '{}' collides with another artifact slot",
                a.display()
            )));
        }
    }
    Ok(())
}

fn write_file(path: &Path, bytes: &[u8]) -> ModelResult<()> {
    let fail = |e: std::io::Error| ModelError::persistence(path, e);
    let mut file = File::create(path).map_err(fail)?;
    file.write_all(bytes).map_err(fail)?;
    file.sync_all().map_err(fail)
}

fn rename(from: &Path, to: &Path) -> ModelResult<()> {
    fs::rename(from, to).map_err(|e| {
        ModelError::persistence(to, format!("cannot move '{}' here: {e}", from.display()))
    })
}

#[cfg(test)]
thread_local! {
    static FAIL_MODEL_PROMOTION: std::cell::Cell<bool> = const { std::cell::Cell::new(false) };
}

fn promote_model(from: &Path, to: &Path) -> ModelResult<()> {
    #[cfg(test)]
    if FAIL_MODEL_PROMOTION.with(|fail| fail.get()) {
        return Err(ModelError::persistence(to, "model promotion interrupted"));
    }
    rename(from, to)
}

fn remove_if_exists(path: &Path) -> ModelResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ModelError::persistence(path, e)),
    }
}

/// Move the canonical pair into the previous slot. On failure the
/// canonical pair is left (or put back) in place.
fn rotate(paths: &ArtifactPaths, previous: &ArtifactPaths) -> ModelResult<Rotation> {
    remove_if_exists(&previous.model)?;
    remove_if_exists(&previous.preprocessor)?;

    rename(&paths.model, &previous.model)?;

    if !paths.preprocessor.exists() {
        tracing::warn!(
            "Saving model: '{}' had no paired preprocessor at '{}'",
            paths.model.display(),
            paths.preprocessor.display()
        );
        return Ok(Rotation { model: true, preprocessor: false });
    }

    if let Err(e) = rename(&paths.preprocessor, &previous.preprocessor) {
        if let Err(undo) = rename(&previous.model, &paths.model) {
            tracing::error!("Saving model: could not restore model after failed rotation: {undo}");
        }
        return Err(e);
    }
    Ok(Rotation { model: true, preprocessor: true })
}

/// Undo a partially completed promotion.
fn restore(paths: &ArtifactPaths, previous: &ArtifactPaths, rotation: Rotation, preprocessor_promoted: bool) {
    let mut steps: Vec<ModelResult<()>> = Vec::new();
    if preprocessor_promoted {
        steps.push(remove_if_exists(&paths.preprocessor));
    }
    if rotation.preprocessor {
        steps.push(rename(&previous.preprocessor, &paths.preprocessor));
    }
    if rotation.model {
        steps.push(rename(&previous.model, &paths.model));
    }
    for failed in steps.into_iter().filter_map(Result::err) {
        tracing::error!("Saving model: rollback step failed: {failed}");
    }
}

fn discard_staging(staged: &ArtifactPaths) {
    for path in [&staged.model, &staged.preprocessor] {
        if let Err(e) = remove_if_exists(path) {
            tracing::warn!("Saving model: could not remove staging file: {e}");
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::preprocessor::Preprocessor;
    use crate::testing::synthetic_records;

    fn pair_with_bias(bias: f64) -> ArtifactPair {
        let rows = synthetic_records(60, 4);
        let (_, fitted) = Preprocessor::new().fit_transform(&rows).unwrap();
        let weights = (0..fitted.output_width()).map(|i| 0.1 * i as f64 - 0.7).collect();
        ArtifactPair::new(Classifier::new(weights, bias), fitted).unwrap()
    }

    /// Hidden files (staging, lock) left in the artifact directory.
    fn leftovers(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with('.'))
            .collect()
    }

    fn store_in(dir: &Path) -> ArtifactStore {
        ArtifactStore::new(ArtifactPaths::new(
            dir.join("output_models/model.json"),
            dir.join("output_models/preprocessor.json"),
        ))
    }

    #[test]
    fn test_previous_slot_sits_beside_model() {
        let paths = ArtifactPaths::new("a/b/c/model.json", "elsewhere/preprocessor.bin");
        let previous = paths.previous();
        assert_eq!(previous.model, PathBuf::from("a/b/c/old_model.json"));
        assert_eq!(previous.preprocessor, PathBuf::from("a/b/c/old_preprocessor.bin"));
    }

    #[test]
    fn test_previous_slot_for_bare_file_name() {
        let previous = ArtifactPaths::new("model.json", "preprocessor.json").previous();
        assert_eq!(previous.model, PathBuf::from("./old_model.json"));
    }

    #[test]
    fn test_round_trip_preserves_predictions_exactly() {
        let dir   = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let pair  = pair_with_bias(0.123_456_789_012_345_67);
        store.save(&pair).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, pair);

        for record in synthetic_records(25, 77) {
            let before = pair.model().probability(&pair.preprocessor().transform_one(&record).unwrap()).unwrap();
            let after  = loaded.model().probability(&loaded.preprocessor().transform_one(&record).unwrap()).unwrap();
            assert_eq!(before.to_bits(), after.to_bits());
        }
    }

    #[test]
    fn test_rotation_keeps_exactly_one_generation() {
        let dir   = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let (first, second, third) = (pair_with_bias(1.0), pair_with_bias(2.0), pair_with_bias(3.0));

        store.save(&first).unwrap();
        assert!(matches!(store.load_previous(), Err(ModelError::ArtifactNotFound(_))));

        store.save(&second).unwrap();
        assert_eq!(store.load().unwrap(), second);
        assert_eq!(store.load_previous().unwrap(), first);

        store.save(&third).unwrap();
        assert_eq!(store.load().unwrap(), third);
        assert_eq!(store.load_previous().unwrap(), second);

        let mut names: Vec<String> = fs::read_dir(dir.path().join("output_models"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, ["model.json", "old_model.json", "old_preprocessor.json", "preprocessor.json"]);
    }

    #[test]
    fn test_missing_preprocessor_fails_whole_load() {
        let dir   = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        store.save(&pair_with_bias(0.0)).unwrap();
        fs::remove_file(&store.paths().preprocessor).unwrap();

        match store.load() {
            Err(ModelError::ArtifactNotFound(path)) => assert_eq!(path, store.paths().preprocessor),
            other => panic!("expected ArtifactNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_mixed_generations_are_rejected() {
        let dir   = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        store.save(&pair_with_bias(1.0)).unwrap();
        store.save(&pair_with_bias(2.0)).unwrap();

        // put the older preprocessor next to the newer model
        fs::copy(&store.paths().previous().preprocessor, &store.paths().preprocessor).unwrap();
        assert!(matches!(store.load(), Err(ModelError::Persistence { .. })));
    }

    #[test]
    fn test_failed_rotation_leaves_current_pair_intact() {
        let dir   = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let current = pair_with_bias(1.0);
        store.save(&current).unwrap();

        // a non-empty directory squatting on the backup slot cannot be removed
        let blocker = store.paths().previous().model;
        fs::create_dir_all(blocker.join("keep")).unwrap();

        let err = store.save(&pair_with_bias(2.0)).unwrap_err();
        assert!(matches!(err, ModelError::Persistence { .. }));
        assert_eq!(store.load().unwrap(), current);
        assert!(leftovers(&dir.path().join("output_models")).is_empty());
    }

    #[test]
    fn test_failed_promotion_restores_current_pair() {
        let dir   = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let (first, second) = (pair_with_bias(1.0), pair_with_bias(2.0));
        store.save(&first).unwrap();
        store.save(&second).unwrap();

        FAIL_MODEL_PROMOTION.with(|fail| fail.set(true));
        let result = store.save(&pair_with_bias(3.0));
        FAIL_MODEL_PROMOTION.with(|fail| fail.set(false));

        assert!(matches!(result, Err(ModelError::Persistence { .. })));
        // preprocessor was already promoted; rollback put generation 2 back
        assert_eq!(store.load().unwrap(), second);
        assert!(leftovers(&dir.path().join("output_models")).is_empty());

        store.save(&pair_with_bias(4.0)).unwrap();
        assert_eq!(store.load_previous().unwrap(), second);
    }

    #[test]
    fn test_failed_first_promotion_leaves_nothing_behind() {
        let dir   = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        // a non-empty directory at the preprocessor path cannot be replaced by a file
        let blocker = store.paths().preprocessor.clone();
        fs::create_dir_all(blocker.join("keep")).unwrap();

        let err = store.save(&pair_with_bias(1.0)).unwrap_err();
        assert!(matches!(err, ModelError::Persistence { .. }));
        assert!(blocker.join("keep").is_dir());
        assert!(!store.paths().model.exists());
        assert!(leftovers(&dir.path().join("output_models")).is_empty());
    }

    #[test]
    fn test_no_staging_files_after_save() {
        let dir   = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        store.save(&pair_with_bias(0.5)).unwrap();
        store.save(&pair_with_bias(0.6)).unwrap();

        assert!(leftovers(&dir.path().join("output_models")).is_empty());
    }

    #[test]
    fn test_staging_names_carry_generation() {
        let first  = staging_path(Path::new("out/model.json"), 1);
        let second = staging_path(Path::new("out/model.json"), 2);
        assert_eq!(first, PathBuf::from("out/.model.json.1.staging"));
        assert_ne!(first, second);
    }

    #[test]
    fn test_held_lock_rejects_save() {
        let dir     = tempfile::tempdir().unwrap();
        let store   = store_in(dir.path());
        let current = pair_with_bias(1.0);
        store.save(&current).unwrap();

        let lock = store.lock().unwrap();
        assert!(lock.path().is_file());
        assert!(matches!(store.lock(), Err(ModelError::RetrainInProgress)));
        assert!(matches!(store.save(&pair_with_bias(2.0)), Err(ModelError::RetrainInProgress)));
        assert_eq!(store.load().unwrap(), current);

        let next = pair_with_bias(3.0);
        store.save_locked(&lock, &next).unwrap();
        assert_eq!(store.load().unwrap(), next);

        let lock_file = lock.path().to_path_buf();
        drop(lock);
        assert!(!lock_file.exists());
        store.save(&pair_with_bias(4.0)).unwrap();
    }

    #[test]
    fn test_lock_for_other_paths_is_refused() {
        let dir   = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let other = ArtifactStore::new(ArtifactPaths::new(
            dir.path().join("elsewhere/model.json"),
            dir.path().join("elsewhere/preprocessor.json"),
        ));

        let lock = other.lock().unwrap();
        let err  = store.save_locked(&lock, &pair_with_bias(0.0)).unwrap_err();
        assert!(matches!(err, ModelError::InvalidConfig(_)));
        assert!(!store.paths().model.exists());
    }

    #[test]
    fn test_concurrent_saves_never_mix_generations() {
        let dir   = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let pairs: Vec<ArtifactPair> = (0..4).map(|i| pair_with_bias(i as f64)).collect();

        std::thread::scope(|scope| {
            for pair in &pairs {
                let store = store.clone();
                scope.spawn(move || {
                    for _ in 0..10 {
                        match store.save(pair) {
                            Ok(()) | Err(ModelError::RetrainInProgress) => {}
                            Err(e) => panic!("unexpected save error: {e}"),
                        }
                    }
                });
            }
        });

        let loaded = store.load().unwrap();
        assert!(pairs.contains(&loaded));
        assert!(leftovers(&dir.path().join("output_models")).is_empty());
    }

    #[test]
    fn test_unsorted_categories_on_disk_are_rejected() {
        let dir   = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        store.save(&pair_with_bias(0.0)).unwrap();

        let path = &store.paths().preprocessor;
        let mut value: serde_json::Value = serde_json::from_slice(&fs::read(path).unwrap()).unwrap();
        let encoders = value["artifact"]["categorical"].as_array_mut().unwrap();
        let encoder  = encoders
            .iter_mut()
            .find(|e| e["categories"].as_array().unwrap().len() > 1)
            .unwrap();
        encoder["categories"].as_array_mut().unwrap().reverse();
        fs::write(path, serde_json::to_vec(&value).unwrap()).unwrap();

        match store.load() {
            Err(ModelError::Persistence { path: bad, .. }) => assert_eq!(&bad, path),
            other => panic!("expected Persistence, got {other:?}"),
        }
    }

    #[test]
    fn test_colliding_paths_are_config_error() {
        let dir   = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(ArtifactPaths::new(
            dir.path().join("old_model.json"),
            dir.path().join("preprocessor.json"),
        ));
        let err = store.save(&pair_with_bias(0.0)).unwrap_err();
        assert!(matches!(err, ModelError::InvalidConfig(_)));
    }

    #[test]
    fn test_width_mismatch_cannot_form_pair() {
        let pair = pair_with_bias(0.0);
        let (_, preprocessor) = pair.into_parts();
        let err = ArtifactPair::new(Classifier::new(vec![1.0], 0.0), preprocessor).unwrap_err();
        assert!(matches!(err, ModelError::Schema(_)));
    }
}
