//! Artifact cache: receives the requests queued during `collect`
//!
//! `http(s)://` artifacts are downloaded, anything else is treated as a
//! local path and copied. Without an explicit destination an artifact
//! lands in `<cache>/artifacts/<unit>/<file name>`. An explicit destination
//! is a relative path under the cache root. Fetching runs after the collect
//! phase has completed, where rollback cannot restore a replaced file, so
//! nothing outside the cache is ever written.

use crate::paths;
use anyhow::{Context, Result};
use provisioning::{ArtifactRequest, ArtifactSink, Profile, Status};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Upper bound for a single download
const MAX_DOWNLOAD_SIZE: u64 = 512 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ArtifactCache {
    root: PathBuf,
}

impl ArtifactCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn destination(&self, request: &ArtifactRequest) -> Result<PathBuf> {
        if let Some(dest) = &request.destination {
            return self.contained(Path::new(dest));
        }
        let file_name = request
            .artifact
            .rsplit(['/', '\\'])
            .find(|segment| !segment.is_empty())
            .unwrap_or("artifact");
        Ok(self.root.join(sanitize(&request.unit)).join(file_name))
    }

    /// Resolve `dest` under the cache root, refusing anything that escapes it
    fn contained(&self, dest: &Path) -> Result<PathBuf> {
        let mut resolved = self.root.clone();
        for component in dest.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    anyhow::bail!(
                        "Destination must be a relative path inside the artifact cache: {}",
                        dest.display()
                    );
                }
            }
        }
        if resolved == self.root {
            anyhow::bail!("Destination names no file: {}", dest.display());
        }
        Ok(resolved)
    }

    fn fetch_one(&self, request: &ArtifactRequest) -> Result<PathBuf> {
        let dest = self.destination(request)?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        if is_remote(&request.artifact) {
            let bytes = download(&request.artifact)?;
            fs::write(&dest, bytes)
                .with_context(|| format!("Failed to write {}", dest.display()))?;
        } else {
            let source = paths::expand(&request.artifact);
            copy_local(&source, &dest)?;
        }
        Ok(dest)
    }
}

impl ArtifactSink for ArtifactCache {
    fn fetch(&self, profile: &Profile, requests: Vec<ArtifactRequest>) -> Status {
        let mut status = Status::multi(format!(
            "Collecting {} artifact(s) for profile '{}'",
            requests.len(),
            profile.id()
        ));
        for request in &requests {
            match self.fetch_one(request) {
                Ok(dest) => log::info!("Collected {} into {}", request.artifact, dest.display()),
                Err(err) => status.merge(Status::from_error(
                    &format!("Could not collect {} for {}", request.artifact, request.unit),
                    &err,
                )),
            }
        }
        status
    }
}

fn is_remote(artifact: &str) -> bool {
    artifact.starts_with("http://") || artifact.starts_with("https://")
}

/// `id@version` with path separators replaced
fn sanitize(unit: &str) -> String {
    unit.replace(['/', '\\', ':'], "_")
}

fn download(url: &str) -> Result<Vec<u8>> {
    let agent = ureq::Agent::new_with_defaults();

    let mut response = agent
        .get(url)
        .header("User-Agent", "provisio")
        .call()
        .with_context(|| format!("Failed to download {url}"))?;

    response
        .body_mut()
        .with_config()
        .limit(MAX_DOWNLOAD_SIZE)
        .read_to_vec()
        .context("Failed to read response body")
}

fn copy_local(source: &Path, dest: &Path) -> Result<()> {
    if !source.is_file() {
        anyhow::bail!("Artifact not found: {}", source.display());
    }
    fs::copy(source, dest).with_context(|| {
        format!("Failed to copy {} to {}", source.display(), dest.display())
    })?;
    Ok(())
}
