//! Folder resolution: turning a marker into an existing folder.

use std::collections::HashSet;
use std::io;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::app::scan::normalize_folder_name;
use crate::domain::errors::ResolutionError;
use crate::domain::model::{Marker, OutcomeKind, ResolutionOutcome, ResolutionRequest};
use crate::infra::config::PluginSettings;
use crate::infra::vault::Vault;

const NOTE_EXTENSION: &str = "md";

/// Per-call switches for [`FolderResolver::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResolveOptions {
    /// Create `<folder>/<folder>.md` when the folder is newly created.
    pub create_placeholder_note: bool,
}

impl ResolveOptions {
    pub fn from_settings(settings: &PluginSettings) -> Self {
        Self {
            create_placeholder_note: settings.create_folder_note(),
        }
    }
}

/// Outcome of resolving one marker from a scanned document.
#[derive(Debug)]
pub struct MarkerResolution {
    pub marker: Marker,
    pub result: Result<ResolutionOutcome, ResolutionError>,
}

/// Ensures marker folders exist in a [`Vault`].
///
/// The existence check and the creation that follows it run under a lock keyed by the resolved
/// path, so concurrent requests for one folder issue a single `create_folder` call.
pub struct FolderResolver<V> {
    vault: V,
    in_flight: DashMap<String, Arc<Mutex<()>>>,
}

impl<V: Vault> FolderResolver<V> {
    pub fn new(vault: V) -> Self {
        Self {
            vault,
            in_flight: DashMap::new(),
        }
    }

    pub fn vault(&self) -> &V {
        &self.vault
    }

    /// Resolve `folder_name` relative to `origin` and make sure the folder exists.
    #[tracing::instrument(level = "debug", skip(self, options), err(Display))]
    pub fn resolve(
        &self,
        folder_name: &str,
        origin: &str,
        options: ResolveOptions,
    ) -> Result<ResolutionOutcome, ResolutionError> {
        let target = target_path(folder_name, origin)?;

        if !self.is_document(origin)? {
            return Err(ResolutionError::OriginNotFound(origin.to_owned()));
        }

        let outcome = self.with_path_lock(&target, || self.create_if_absent(&target))?;

        if outcome.kind == OutcomeKind::Created && options.create_placeholder_note {
            self.ensure_placeholder_note(&target)?;
        }

        tracing::info!(path = %outcome.path, kind = ?outcome.kind, "resolved folder marker");
        Ok(outcome)
    }

    pub fn resolve_request(
        &self,
        request: &ResolutionRequest,
        options: ResolveOptions,
    ) -> Result<ResolutionOutcome, ResolutionError> {
        self.resolve(&request.folder_name, &request.origin, options)
    }

    /// Resolve every marker found in `origin`, in order.
    ///
    /// A folder targeted by more than one marker is resolved once; later markers report
    /// [`OutcomeKind::Skipped`]. Failures stay with the marker that caused them.
    pub fn resolve_markers(
        &self,
        markers: Vec<Marker>,
        origin: &str,
        options: ResolveOptions,
    ) -> Vec<MarkerResolution> {
        let mut seen = HashSet::new();
        markers
            .into_iter()
            .map(|marker| {
                let result = match target_path(&marker.folder_name, origin) {
                    Ok(target) if !seen.insert(target.clone()) => {
                        Ok(ResolutionOutcome::skipped(target))
                    }
                    Ok(_) => self.resolve(&marker.folder_name, origin, options),
                    Err(err) => Err(err),
                };
                MarkerResolution { marker, result }
            })
            .collect()
    }

    /// Delete `document` when it exists only to declare the folder `marker` resolved to.
    ///
    /// Takes the resolution outcome so the folder is known to exist before anything is removed.
    /// Returns whether the document was deleted.
    pub fn remove_placeholder_document(
        &self,
        document: &str,
        body: &str,
        marker: &Marker,
        outcome: &ResolutionOutcome,
    ) -> Result<bool, ResolutionError> {
        if outcome.kind == OutcomeKind::Skipped || !is_self_naming(document, body, marker) {
            return Ok(false);
        }
        if !self.is_document(document)? {
            return Ok(false);
        }

        self.vault
            .delete_document(document)
            .map_err(|err| ResolutionError::storage(document, err))?;
        tracing::info!(document, folder = %outcome.path, "deleted placeholder document");
        Ok(true)
    }

    fn is_document(&self, path: &str) -> Result<bool, ResolutionError> {
        self.vault
            .is_document(path)
            .map_err(|err| ResolutionError::storage(path, err))
    }

    fn exists(&self, path: &str) -> Result<bool, ResolutionError> {
        self.vault
            .exists(path)
            .map_err(|err| ResolutionError::storage(path, err))
    }

    fn create_if_absent(&self, target: &str) -> Result<ResolutionOutcome, ResolutionError> {
        if self.exists(target)? {
            return Ok(ResolutionOutcome::already_exists(target));
        }

        for ancestor in ancestors(target) {
            self.with_path_lock(ancestor, || self.create_ancestor(ancestor))?;
        }

        self.vault
            .create_folder(target)
            .map_err(|err| ResolutionError::storage(target, err))?;
        Ok(ResolutionOutcome::created(target))
    }

    fn create_ancestor(&self, path: &str) -> Result<(), ResolutionError> {
        if self.exists(path)? {
            return Ok(());
        }
        tracing::debug!(path, "creating missing parent folder");
        match self.vault.create_folder(path) {
            Err(err) if err.kind() != io::ErrorKind::AlreadyExists => {
                Err(ResolutionError::storage(path, err))
            }
            _ => Ok(()),
        }
    }

    fn ensure_placeholder_note(&self, folder: &str) -> Result<(), ResolutionError> {
        let note = placeholder_note_path(folder);
        if self.exists(&note)? {
            return Ok(());
        }
        self.vault
            .create_document(&note, "")
            .map_err(|err| ResolutionError::storage(&note, err))?;
        tracing::debug!(note = %note, "created placeholder note");
        Ok(())
    }

    fn with_path_lock<T>(&self, path: &str, f: impl FnOnce() -> T) -> T {
        let lock = self
            .in_flight
            .entry(path.to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();

        let result = {
            let _guard = lock.lock();
            f()
        };

        drop(lock);
        self.in_flight
            .remove_if(path, |_, entry| Arc::strong_count(entry) == 1);
        result
    }
}

/// Compute the vault path a folder name refers to when written inside `origin`.
///
/// Names are relative to the origin's parent folder; a leading `/` anchors them at the root.
pub fn target_path(folder_name: &str, origin: &str) -> Result<String, ResolutionError> {
    let invalid = || ResolutionError::InvalidFolderName(folder_name.to_owned());
    let name = normalize_folder_name(folder_name).ok_or_else(invalid)?;

    if let Some(rooted) = name.strip_prefix('/') {
        check_segments(rooted).ok_or_else(invalid)?;
        return Ok(rooted.to_owned());
    }
    check_segments(&name).ok_or_else(invalid)?;

    let origin = origin.trim_matches('/');
    Ok(match origin.rsplit_once('/') {
        Some((parent, _)) if !parent.is_empty() => format!("{parent}/{name}"),
        _ => name,
    })
}

/// Path of the note created inside a freshly created folder.
pub fn placeholder_note_path(folder: &str) -> String {
    format!("{folder}/{}.{NOTE_EXTENSION}", leaf(folder))
}

fn check_segments(name: &str) -> Option<()> {
    name.split('/')
        .all(|segment| segment != "." && segment != "..")
        .then_some(())
}

fn is_self_naming(document: &str, body: &str, marker: &Marker) -> bool {
    body.trim() == marker.raw || file_stem(document) == leaf(&marker.folder_name)
}

fn leaf(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn file_stem(document: &str) -> &str {
    let name = leaf(document);
    name.rsplit_once('.')
        .map(|(stem, _)| stem)
        .filter(|stem| !stem.is_empty())
        .unwrap_or(name)
}

/// Proper ancestors of `path`, shallowest first.
fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    path.match_indices('/').map(move |(idx, _)| &path[..idx])
}
