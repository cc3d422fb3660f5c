//! The `native` touchpoint: filesystem actions
//!
//! Every action keeps a journal of what it actually changed so that
//! `undo` only reverts its own work. Paths go through [`paths::expand`],
//! so `~` and environment variables work in instructions.

use crate::paths;
use anyhow::{Context, Result, anyhow, bail};
use provisioning::{
    ActionContext, ActionRef, ArtifactRequest, Parameters, ProvisioningAction, Status, Touchpoint,
    TouchpointType, queue_artifact, unqueue_artifact,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Touchpoint type id for units handled here
pub const TOUCHPOINT_ID: &str = "native";

/// Action names the native touchpoint provides
pub const ACTIONS: [&str; 5] = ["mkdir", "rmdir", "link", "remove", "collect"];

/// Filesystem touchpoint
///
/// `backup_root` receives whatever `remove` takes away, so that undo can
/// put it back.
#[derive(Debug, Clone)]
pub struct NativeTouchpoint {
    backup_root: PathBuf,
}

impl NativeTouchpoint {
    pub fn new(backup_root: impl Into<PathBuf>) -> Self {
        Self {
            backup_root: backup_root.into(),
        }
    }
}

impl Touchpoint for NativeTouchpoint {
    fn touchpoint_type(&self) -> TouchpointType {
        TouchpointType::new(TOUCHPOINT_ID)
    }

    fn action(&self, name: &str) -> Option<ActionRef> {
        let action: ActionRef = match name {
            "mkdir" => Arc::new(MkdirAction::default()),
            "rmdir" => Arc::new(RmdirAction::default()),
            "link" => Arc::new(LinkAction::default()),
            "remove" => Arc::new(RemoveAction::new(self.backup_root.clone())),
            "collect" => Arc::new(CollectAction::default()),
            _ => return None,
        };
        Some(action)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Undo records keyed by target path, most recent last
#[derive(Debug)]
struct Journal<T>(Mutex<Vec<(PathBuf, T)>>);

impl<T> Default for Journal<T> {
    fn default() -> Self {
        Self(Mutex::new(Vec::new()))
    }
}

impl<T> Journal<T> {
    fn record(&self, path: PathBuf, entry: T) -> Result<()> {
        self.0
            .lock()
            .map_err(|_| anyhow!("action journal is poisoned"))?
            .push((path, entry));
        Ok(())
    }

    /// Remove and return the latest record for `path`
    fn take(&self, path: &Path) -> Result<Option<T>> {
        let mut entries = self
            .0
            .lock()
            .map_err(|_| anyhow!("action journal is poisoned"))?;
        Ok(entries
            .iter()
            .rposition(|(recorded, _)| recorded == path)
            .map(|index| entries.remove(index).1))
    }
}

fn required<'a>(params: &'a Parameters, key: &str) -> Result<&'a str> {
    params
        .get_str(key)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| anyhow!("missing parameter '{key}'"))
}

fn required_path(params: &Parameters, key: &str) -> Result<PathBuf> {
    required(params, key).map(paths::expand)
}

// ============================================================================
// mkdir
// ============================================================================

/// `mkdir(path:...)`: create a directory and any missing parents
#[derive(Debug, Default)]
pub struct MkdirAction {
    /// Directories this action created, outermost first
    created: Journal<Vec<PathBuf>>,
}

impl ProvisioningAction for MkdirAction {
    fn id(&self) -> &str {
        "native.mkdir"
    }

    fn execute(&self, ctx: &mut ActionContext<'_>) -> Result<Status> {
        let path = required_path(ctx.params, "path")?;
        if path.is_dir() {
            return Ok(Status::ok());
        }

        let mut missing: Vec<PathBuf> = path
            .ancestors()
            .take_while(|dir| !dir.exists())
            .map(Path::to_path_buf)
            .collect();
        missing.reverse();

        fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
        log::debug!("Created directory {}", path.display());
        self.created.record(path, missing)?;
        Ok(Status::ok())
    }

    fn undo(&self, ctx: &mut ActionContext<'_>) -> Result<Status> {
        let path = required_path(ctx.params, "path")?;
        let Some(created) = self.created.take(&path)? else {
            return Ok(Status::ok());
        };

        let mut status = Status::multi(format!("Removing {}", path.display()));
        for dir in created.iter().rev() {
            if let Err(err) = fs::remove_dir(dir) {
                status.merge(Status::warning(format!(
                    "Could not remove {}: {err}",
                    dir.display()
                )));
            }
        }
        Ok(status)
    }
}

// ============================================================================
// rmdir
// ============================================================================

/// `rmdir(path:...)`: remove an empty directory
#[derive(Debug, Default)]
pub struct RmdirAction {
    removed: Journal<()>,
}

impl ProvisioningAction for RmdirAction {
    fn id(&self) -> &str {
        "native.rmdir"
    }

    fn execute(&self, ctx: &mut ActionContext<'_>) -> Result<Status> {
        let path = required_path(ctx.params, "path")?;
        if !path.exists() {
            return Ok(Status::info(format!("{} does not exist", path.display())));
        }

        fs::remove_dir(&path)
            .with_context(|| format!("Failed to remove directory: {}", path.display()))?;
        self.removed.record(path, ())?;
        Ok(Status::ok())
    }

    fn undo(&self, ctx: &mut ActionContext<'_>) -> Result<Status> {
        let path = required_path(ctx.params, "path")?;
        if self.removed.take(&path)?.is_some() {
            fs::create_dir_all(&path)
                .with_context(|| format!("Failed to recreate directory: {}", path.display()))?;
        }
        Ok(Status::ok())
    }
}

// ============================================================================
// link
// ============================================================================

/// `link(target:..., linkName:...)`: create `linkName` pointing at `target`
///
/// An existing file at `linkName` is never replaced.
#[derive(Debug, Default)]
pub struct LinkAction {
    created: Journal<()>,
}

impl LinkAction {
    fn create_link(source: &Path, link: &Path) -> Result<()> {
        if !source.exists() {
            bail!("Link target does not exist: {}", source.display());
        }
        if link.exists() || link.is_symlink() {
            bail!("Path already exists: {}", link.display());
        }
        if let Some(parent) = link.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create parent directory: {}", parent.display())
            })?;
        }

        #[cfg(unix)]
        std::os::unix::fs::symlink(source, link).with_context(|| {
            format!(
                "Failed to create symlink: {} -> {}",
                link.display(),
                source.display()
            )
        })?;

        #[cfg(windows)]
        {
            use std::os::windows::fs::{symlink_dir, symlink_file};

            if source.is_dir() {
                // Junctions do not need admin rights
                if let Err(e) = junction::create(source, link) {
                    log::debug!("Junction creation failed ({e}), trying symlink_dir");
                    symlink_dir(source, link).with_context(|| {
                        format!(
                            "Failed to create directory symlink: {} -> {}",
                            link.display(),
                            source.display()
                        )
                    })?;
                }
            } else {
                symlink_file(source, link).with_context(|| {
                    format!(
                        "Failed to create file symlink: {} -> {}",
                        link.display(),
                        source.display()
                    )
                })?;
            }
        }

        #[cfg(not(any(unix, windows)))]
        bail!("Symlinks not supported on this platform");

        Ok(())
    }

    fn remove_link(link: &Path) -> Result<()> {
        #[cfg(windows)]
        {
            if link.is_dir() {
                return fs::remove_dir(link)
                    .with_context(|| format!("Failed to remove link: {}", link.display()));
            }
        }
        fs::remove_file(link).with_context(|| format!("Failed to remove link: {}", link.display()))
    }
}

impl ProvisioningAction for LinkAction {
    fn id(&self) -> &str {
        "native.link"
    }

    fn execute(&self, ctx: &mut ActionContext<'_>) -> Result<Status> {
        let source = required_path(ctx.params, "target")?;
        let link = required_path(ctx.params, "linkName")?;

        Self::create_link(&source, &link)?;
        log::debug!("Linked {} -> {}", link.display(), source.display());
        self.created.record(link, ())?;
        Ok(Status::ok())
    }

    fn undo(&self, ctx: &mut ActionContext<'_>) -> Result<Status> {
        let link = required_path(ctx.params, "linkName")?;
        if self.created.take(&link)?.is_some() && link.is_symlink() {
            Self::remove_link(&link)?;
        }
        Ok(Status::ok())
    }
}

// ============================================================================
// remove
// ============================================================================

static BACKUP_SEQ: AtomicU64 = AtomicU64::new(0);

/// `remove(path:...)`: move a file or directory into the backup area
///
/// Undo moves it back.
#[derive(Debug)]
pub struct RemoveAction {
    backup_root: PathBuf,
    backups: Journal<PathBuf>,
}

impl RemoveAction {
    pub fn new(backup_root: PathBuf) -> Self {
        Self {
            backup_root,
            backups: Journal::default(),
        }
    }

    fn backup_path(&self, path: &Path) -> PathBuf {
        let seq = BACKUP_SEQ.fetch_add(1, Ordering::Relaxed);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "root".to_string());
        self.backup_root.join(seq.to_string()).join(name)
    }
}

impl ProvisioningAction for RemoveAction {
    fn id(&self) -> &str {
        "native.remove"
    }

    fn execute(&self, ctx: &mut ActionContext<'_>) -> Result<Status> {
        let path = required_path(ctx.params, "path")?;
        if !path.exists() && !path.is_symlink() {
            return Ok(Status::info(format!("{} does not exist", path.display())));
        }

        let backup = self.backup_path(&path);
        if let Some(parent) = backup.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create backup directory: {}", parent.display())
            })?;
        }
        fs::rename(&path, &backup).with_context(|| {
            format!(
                "Failed to move {} to {}",
                path.display(),
                backup.display()
            )
        })?;
        log::debug!("Moved {} to {}", path.display(), backup.display());
        self.backups.record(path, backup)?;
        Ok(Status::ok())
    }

    fn undo(&self, ctx: &mut ActionContext<'_>) -> Result<Status> {
        let path = required_path(ctx.params, "path")?;
        let Some(backup) = self.backups.take(&path)? else {
            return Ok(Status::ok());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create parent directory: {}", parent.display())
            })?;
        }
        fs::rename(&backup, &path).with_context(|| {
            format!(
                "Failed to restore {} from {}",
                path.display(),
                backup.display()
            )
        })?;
        Ok(Status::ok())
    }
}

/// Delete a backup area once the run that filled it has committed
pub fn discard_backups(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)
            .with_context(|| format!("Failed to remove backups: {}", dir.display()))?;
    }
    Ok(())
}

/// Delete a rolled-back run's backup area if every backup was restored
///
/// Returns `false` and leaves the area alone while anything is still in it.
pub fn release_backups(dir: &Path) -> Result<bool> {
    if !dir.exists() {
        return Ok(true);
    }
    if holds_entries(dir)? {
        return Ok(false);
    }
    discard_backups(dir)?;
    Ok(true)
}

/// True if anything other than empty directories lives under `dir`
fn holds_entries(dir: &Path) -> Result<bool> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?;
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() || holds_entries(&entry.path())? {
            return Ok(true);
        }
    }
    Ok(false)
}

// ============================================================================
// collect
// ============================================================================

/// `collect(artifact:..., destination:...)`: request an artifact download
///
/// Only queues the request; the collect phase hands the queue to the
/// artifact sink when it completes.
#[derive(Debug, Default)]
pub struct CollectAction;

impl CollectAction {
    fn request(ctx: &ActionContext<'_>) -> Result<ArtifactRequest> {
        let unit = ctx
            .operand
            .second()
            .or(ctx.operand.first())
            .map(|unit| unit.key())
            .unwrap_or_default();
        Ok(ArtifactRequest {
            unit,
            artifact: required(ctx.params, "artifact")?.to_string(),
            destination: ctx
                .params
                .get_str("destination")
                .filter(|d| !d.trim().is_empty())
                .map(str::to_string),
        })
    }
}

impl ProvisioningAction for CollectAction {
    fn id(&self) -> &str {
        "native.collect"
    }

    fn execute(&self, ctx: &mut ActionContext<'_>) -> Result<Status> {
        let request = Self::request(ctx)?;
        if queue_artifact(ctx.params, request.clone()) {
            Ok(Status::ok())
        } else {
            Ok(Status::warning(format!(
                "No artifact queue in phase '{}'; {} not collected",
                ctx.phase_id, request.artifact
            )))
        }
    }

    fn undo(&self, ctx: &mut ActionContext<'_>) -> Result<Status> {
        let request = Self::request(ctx)?;
        unqueue_artifact(ctx.params, &request);
        Ok(Status::ok())
    }
}
