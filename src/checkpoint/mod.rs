//! Working-tree checkpoints backed by the git stash.
//!
//! A checkpoint is opened before any file is patched and resolved exactly
//! once afterwards with [`Checkpoint::accept`] or [`Checkpoint::revert`].
//! Uncommitted work (including untracked files) is captured in a named
//! stash entry and immediately reapplied, so the patch step sees the tree
//! the user left behind.

use crate::domain::{MEMORY_FILE_NAME, UNPARSED_ARTIFACT_NAME};
use crate::error::CheckpointError;
use crate::utils::short_hash;
use git2::build::CheckoutBuilder;
use git2::{ErrorCode, Oid, Repository, ResetType, Signature, StashApplyOptions, StashFlags, Status, StatusOptions};
use std::fs;
use std::path::{Path, PathBuf};

const SIDECAR_FILES: &[&str] = &[MEMORY_FILE_NAME, UNPARSED_ARTIFACT_NAME];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointKind {
    /// No usable repository; rollback is unavailable.
    NoRepo,
    /// Repository with nothing uncommitted.
    Clean,
    /// Uncommitted work captured in a stash entry.
    Stashed,
}

struct Snapshot {
    name: String,
    oid: Oid,
}

pub struct Checkpoint {
    root: PathBuf,
    repo: Option<Repository>,
    kind: CheckpointKind,
    snapshot: Option<Snapshot>,
    resolved: bool,
}

impl Checkpoint {
    /// Probe `root` for a repository and snapshot its uncommitted state.
    pub fn open(root: &Path) -> Result<Self, CheckpointError> {
        let mut checkpoint = Self {
            root: root.to_path_buf(),
            repo: None,
            kind: CheckpointKind::NoRepo,
            snapshot: None,
            resolved: false,
        };

        let mut repo = match Repository::discover(root) {
            Ok(repo) => repo,
            Err(err) => {
                tracing::warn!("No git repository at {}: changes cannot be rolled back", root.display());
                tracing::debug!("Repository discovery failed: {}", err);
                return Ok(checkpoint);
            }
        };
        if repo.is_bare() {
            tracing::warn!("Repository is bare: changes cannot be rolled back");
            return Ok(checkpoint);
        }
        match repo.head() {
            Ok(_) => {}
            Err(err) if err.code() == ErrorCode::UnbornBranch => {
                tracing::warn!("Repository has no commits yet: changes cannot be rolled back");
                return Ok(checkpoint);
            }
            Err(err) => return Err(err.into()),
        }

        if is_dirty(&repo)? {
            let name = format!("mend-checkpoint-{}", short_hash(&format!("{:?}-{}", chrono::Utc::now(), std::process::id())));
            let signature = repo.signature().or_else(|_| Signature::now("mend", "mend@localhost"))?;
            let oid = repo.stash_save(&signature, &name, Some(StashFlags::INCLUDE_UNTRACKED))?;
            if let Err(err) = apply_snapshot(&mut repo, oid) {
                return Err(CheckpointError::ReapplyFailed { name, reason: err.to_string() });
            }
            tracing::info!("Captured uncommitted work as {}", name);
            checkpoint.snapshot = Some(Snapshot { name, oid });
            checkpoint.kind = CheckpointKind::Stashed;
        } else {
            checkpoint.kind = CheckpointKind::Clean;
        }

        checkpoint.repo = Some(repo);
        Ok(checkpoint)
    }

    pub fn kind(&self) -> CheckpointKind {
        self.kind
    }

    /// True when [`Checkpoint::revert`] can restore the tree.
    pub fn is_protected(&self) -> bool {
        self.kind != CheckpointKind::NoRepo
    }

    pub fn snapshot_name(&self) -> Option<&str> {
        self.snapshot.as_ref().map(|s| s.name.as_str())
    }

    /// Keep the patched tree and discard the snapshot.
    pub fn accept(&mut self) -> Result<(), CheckpointError> {
        if self.resolved {
            tracing::debug!("Checkpoint already resolved; accept ignored");
            return Ok(());
        }
        self.resolved = true;

        if let (Some(repo), Some(snapshot)) = (self.repo.as_mut(), self.snapshot.as_ref()) {
            if let Some(index) = stash_index(repo, snapshot.oid)? {
                repo.stash_drop(index)?;
            }
            tracing::info!("Dropped snapshot {}", snapshot.name);
        }
        Ok(())
    }

    /// Reset to the last commit, remove new untracked files, then restore
    /// the captured uncommitted work if there was any.
    pub fn revert(&mut self) -> Result<(), CheckpointError> {
        if self.resolved {
            tracing::debug!("Checkpoint already resolved; revert ignored");
            return Ok(());
        }
        self.resolved = true;

        let Some(repo) = self.repo.as_mut() else {
            return Ok(());
        };

        let sidecars = take_sidecars(&self.root)?;
        let reverted = restore_tree(repo, self.snapshot.as_ref());
        let restored = restore_sidecars(sidecars);
        reverted?;
        restored?;
        tracing::info!("Working tree reverted");
        Ok(())
    }
}

/// Hard reset to HEAD, clear untracked files, then reapply `snapshot`.
fn restore_tree(repo: &mut Repository, snapshot: Option<&Snapshot>) -> Result<(), CheckpointError> {
    {
        let head = repo.head()?.peel_to_commit()?;
        repo.reset(head.as_object(), ResetType::Hard, Some(CheckoutBuilder::new().force()))?;
    }
    remove_untracked(repo)?;

    if let Some(snapshot) = snapshot {
        apply_snapshot(repo, snapshot.oid).map_err(|err| CheckpointError::ReapplyFailed {
            name: snapshot.name.clone(),
            reason: err.to_string(),
        })?;
        if let Some(index) = stash_index(repo, snapshot.oid)? {
            repo.stash_drop(index)?;
        }
        tracing::info!("Restored uncommitted work from {}", snapshot.name);
    }
    Ok(())
}

impl Drop for Checkpoint {
    fn drop(&mut self) {
        if !self.resolved && self.kind != CheckpointKind::NoRepo {
            match self.snapshot_name() {
                Some(name) => tracing::warn!("Checkpoint dropped unresolved; snapshot {} left in stash", name),
                None => tracing::warn!("Checkpoint dropped unresolved"),
            }
        }
    }
}

fn status_options() -> StatusOptions {
    let mut options = StatusOptions::new();
    options.include_untracked(true).recurse_untracked_dirs(true).include_ignored(false);
    options
}

fn is_dirty(repo: &Repository) -> Result<bool, git2::Error> {
    Ok(!repo.statuses(Some(&mut status_options()))?.is_empty())
}

fn stash_index(repo: &mut Repository, oid: Oid) -> Result<Option<usize>, git2::Error> {
    let mut found = None;
    repo.stash_foreach(|index, _message, stash_oid| {
        if *stash_oid == oid {
            found = Some(index);
            false
        } else {
            true
        }
    })?;
    Ok(found)
}

fn apply_snapshot(repo: &mut Repository, oid: Oid) -> Result<(), git2::Error> {
    let index = stash_index(repo, oid)?
        .ok_or_else(|| git2::Error::from_str("snapshot is no longer in the stash list"))?;
    let mut options = StashApplyOptions::new();
    options.reinstantiate_index();
    if let Err(err) = repo.stash_apply(index, Some(&mut options)) {
        tracing::debug!("Stash apply with index failed ({}); retrying without", err);
        repo.stash_apply(index, None)?;
    }
    Ok(())
}

fn remove_untracked(repo: &Repository) -> Result<(), CheckpointError> {
    let Some(workdir) = repo.workdir().map(Path::to_path_buf) else {
        return Ok(());
    };
    let untracked: Vec<String> = repo
        .statuses(Some(&mut status_options()))?
        .iter()
        .filter(|entry| entry.status().contains(Status::WT_NEW))
        .filter_map(|entry| entry.path().map(str::to_string))
        .collect();

    for rel in untracked {
        let path = workdir.join(&rel);
        tracing::debug!("Removing untracked {}", rel);
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else if path.exists() {
            fs::remove_file(&path)?;
        }
        prune_empty_parents(&workdir, &path);
    }
    Ok(())
}

fn prune_empty_parents(workdir: &Path, path: &Path) {
    let mut current = path.parent();
    while let Some(dir) = current {
        if dir == workdir || !dir.starts_with(workdir) {
            break;
        }
        let is_empty = fs::read_dir(dir).map(|mut entries| entries.next().is_none()).unwrap_or(false);
        if !is_empty || fs::remove_dir(dir).is_err() {
            break;
        }
        current = dir.parent();
    }
}

/// Move sidecar files out of the way so a reset cannot clobber them.
///
/// Everything is read before anything is removed, and a failed removal puts
/// back what was already taken.
fn take_sidecars(root: &Path) -> Result<Vec<(PathBuf, Vec<u8>)>, CheckpointError> {
    let mut saved = Vec::new();
    for name in SIDECAR_FILES {
        let path = root.join(name);
        if path.is_file() {
            let bytes = fs::read(&path)?;
            saved.push((path, bytes));
        }
    }
    for (taken, (path, _)) in saved.iter().enumerate() {
        if let Err(err) = fs::remove_file(path) {
            restore_sidecars(saved[..taken].to_vec())?;
            return Err(err.into());
        }
    }
    Ok(saved)
}

/// Write every sidecar back, attempting all of them before reporting a failure.
fn restore_sidecars(saved: Vec<(PathBuf, Vec<u8>)>) -> Result<(), CheckpointError> {
    let mut first_error = None;
    for (path, bytes) in saved {
        if let Err(err) = fs::write(&path, bytes) {
            tracing::error!("Could not restore {}: {}", path.display(), err);
            first_error.get_or_insert(err);
        }
    }
    match first_error {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}
