//! Vault-wide sweeps: find every markdown document and run the opened trigger on it.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::{DirEntry, WalkBuilder, WalkState};
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::Serialize;

use crate::app::linker::{FolderLinker, is_markdown};
use crate::domain::model::Notice;
use crate::infra::config::Config;
use crate::infra::vault::{LocalVault, Vault};

const FOLDERMARK_IGNORE: &str = ".foldermarkignore";

/// Notices produced for one document during a sweep.
#[derive(Debug, Clone, Serialize)]
pub struct SweepEntry {
    pub document: String,
    pub notices: Vec<Notice>,
}

/// Lists markdown documents in a vault, honouring gitignore files, configured ignore paths and
/// `.foldermarkignore`.
#[derive(Debug, Clone)]
pub struct DocumentWalker {
    matcher: Arc<IgnoreMatcher>,
}

impl DocumentWalker {
    pub fn new(root: &Path, config: &Config) -> Result<Self> {
        Ok(Self {
            matcher: Arc::new(build_ignore_matcher(root, config)?),
        })
    }

    /// Whether a vault path is excluded by the ignore rules.
    pub fn is_ignored(&self, document: &str) -> bool {
        self.matcher.should_skip(Path::new(document))
    }

    /// Vault paths of all markdown documents, sorted.
    pub fn documents(&self, vault: &LocalVault) -> Vec<String> {
        let root = vault.root().to_path_buf();
        let mut builder = WalkBuilder::new(&root);
        builder.git_ignore(true).hidden(true);

        builder.filter_entry({
            let matcher = self.matcher.clone();
            let root = root.clone();
            move |entry| {
                if entry.depth() == 0 {
                    return true;
                }
                let rel = entry.path().strip_prefix(&root).unwrap_or(entry.path());
                !matcher.should_skip(rel)
            }
        });

        let documents = Mutex::new(Vec::new());
        builder.build_parallel().run(|| {
            let documents = &documents;
            Box::new(move |result| match result {
                Ok(entry) => {
                    if let Some(document) = markdown_entry(&entry, vault) {
                        documents.lock().push(document);
                    }
                    WalkState::Continue
                }
                Err(err) => {
                    tracing::warn!(error = %err, "vault walk error");
                    WalkState::Continue
                }
            })
        });

        let mut documents = documents.into_inner();
        documents.sort();
        documents
    }
}

/// Run the opened trigger over `documents` in parallel.
///
/// Documents naming the same folder are serialized by the resolver's per-path lock.
pub fn sweep<V: Vault>(linker: &FolderLinker<V>, documents: &[String]) -> Vec<SweepEntry> {
    documents
        .par_iter()
        .map(|document| SweepEntry {
            document: document.clone(),
            notices: linker.document_opened(document),
        })
        .collect()
}

fn markdown_entry(entry: &DirEntry, vault: &LocalVault) -> Option<String> {
    if !entry.file_type()?.is_file() {
        return None;
    }
    let document = vault.vault_path(entry.path())?;
    is_markdown(&document).then_some(document)
}

#[derive(Debug, Clone)]
struct IgnoreMatcher {
    globs: Option<GlobSet>,
}

impl IgnoreMatcher {
    fn should_skip(&self, rel: &Path) -> bool {
        self.globs.as_ref().is_some_and(|set| set.is_match(rel))
    }
}

fn build_ignore_matcher(root: &Path, config: &Config) -> Result<IgnoreMatcher> {
    let mut builder = GlobSetBuilder::new();

    for pattern in &config.scan.ignore {
        for expanded in expand_dir_pattern(pattern) {
            let glob = Glob::new(&expanded).context("invalid ignore path pattern")?;
            builder.add(glob);
        }
    }

    for pattern in load_foldermarkignore(root)? {
        for expanded in expand_dir_pattern(&pattern) {
            let glob = Glob::new(&expanded).context("invalid .foldermarkignore pattern")?;
            builder.add(glob);
        }
    }

    let globs = builder.build().context("failed to build ignore matcher")?;

    Ok(IgnoreMatcher { globs: Some(globs) })
}

fn expand_dir_pattern(raw: &str) -> Vec<String> {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Vec::new();
    }
    vec![
        trimmed.to_owned(),
        format!("{trimmed}/**"),
        format!("**/{trimmed}"),
        format!("**/{trimmed}/**"),
    ]
}

fn load_foldermarkignore(root: &Path) -> Result<Vec<String>> {
    let path = root.join(FOLDERMARK_IGNORE);
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(&path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut patterns = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        patterns.push(trimmed.to_owned());
    }
    Ok(patterns)
}
