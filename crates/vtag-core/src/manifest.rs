//! Cargo manifest reading.
//!
//! Extracts `package.version` from a `Cargo.toml`. A member that declares
//! `version.workspace = true` is resolved against `[workspace.package]` in
//! the nearest ancestor manifest carrying a `[workspace]` table.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, VtagError};
use crate::version::ReleaseVersion;

pub const MANIFEST_FILE: &str = "Cargo.toml";

/// The version field as written in a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
enum VersionField {
    Literal(String),
    Inherited,
}

/// Read and validate the release version from `manifest_path`.
pub fn read_version(manifest_path: &Path) -> Result<ReleaseVersion> {
    let doc = load(manifest_path)?;

    match version_field(&doc, manifest_path)? {
        VersionField::Literal(v) => {
            debug!(manifest = %manifest_path.display(), version = %v, "Read package version");
            ReleaseVersion::parse(&v)
        }
        VersionField::Inherited => {
            let (root, v) = workspace_version(manifest_path)?;
            debug!(
                manifest = %manifest_path.display(),
                workspace = %root.display(),
                version = %v,
                "Resolved inherited workspace version"
            );
            ReleaseVersion::parse(&v)
        }
    }
}

/// Resolve the manifest path for a workspace directory or explicit file.
pub fn manifest_path(workspace: &Path, explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(p) => p.to_path_buf(),
        None => workspace.join(MANIFEST_FILE),
    }
}

fn load(path: &Path) -> Result<toml::Table> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| VtagError::Manifest(format!("failed to read {}: {e}", path.display())))?;
    Ok(text.parse::<toml::Table>()?)
}

fn version_field(doc: &toml::Table, path: &Path) -> Result<VersionField> {
    let missing = || VtagError::MissingVersion {
        path: path.display().to_string(),
    };

    let version = doc
        .get("package")
        .and_then(|p| p.get("version"))
        .ok_or_else(missing)?;

    if let Some(s) = version.as_str() {
        return Ok(VersionField::Literal(s.to_string()));
    }

    let inherited = version
        .as_table()
        .and_then(|t| t.get("workspace"))
        .and_then(|w| w.as_bool())
        .unwrap_or(false);

    if inherited {
        Ok(VersionField::Inherited)
    } else {
        Err(VtagError::Manifest(format!(
            "{}: package.version must be a string or {{ workspace = true }}",
            path.display()
        )))
    }
}

/// Walk up from the member manifest to the workspace root and read
/// `workspace.package.version`.
fn workspace_version(member: &Path) -> Result<(PathBuf, String)> {
    let start = member
        .canonicalize()
        .map_err(|e| VtagError::Manifest(format!("failed to resolve {}: {e}", member.display())))?;

    // The member's own manifest may itself be the workspace root.
    for dir in start.ancestors().skip(1) {
        let candidate = dir.join(MANIFEST_FILE);
        if !candidate.is_file() {
            continue;
        }
        let doc = load(&candidate)?;
        let Some(workspace) = doc.get("workspace") else {
            continue;
        };
        return workspace
            .get("package")
            .and_then(|p| p.get("version"))
            .and_then(|v| v.as_str())
            .map(|v| (candidate.clone(), v.to_string()))
            .ok_or_else(|| VtagError::MissingVersion {
                path: format!("{} (workspace.package.version)", candidate.display()),
            });
    }

    Err(VtagError::Manifest(format!(
        "{} inherits its version but no workspace root was found",
        member.display()
    )))
}
