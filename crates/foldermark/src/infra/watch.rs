//! Filesystem watching for newly created vault documents.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, RecvTimeoutError, channel};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::infra::vault::LocalVault;

/// Created documents that are still being written.
///
/// Editors usually create an empty file and fill it right after, so a document is only reported
/// once no event has touched it for the settle period.
#[derive(Debug, Default)]
pub struct PendingDocuments {
    last_seen: HashMap<String, Instant>,
}

impl PendingDocuments {
    pub fn created(&mut self, document: String, now: Instant) {
        self.last_seen.insert(document, now);
    }

    /// Refresh a document's timer if it is pending.
    pub fn modified(&mut self, document: &str, now: Instant) {
        if let Some(seen) = self.last_seen.get_mut(document) {
            *seen = now;
        }
    }

    pub fn removed(&mut self, document: &str) {
        self.last_seen.remove(document);
    }

    /// Remove and return documents untouched for at least `settle`, sorted.
    pub fn drain_settled(&mut self, now: Instant, settle: Duration) -> Vec<String> {
        let mut settled: Vec<String> = self
            .last_seen
            .iter()
            .filter(|(_, seen)| now.duration_since(**seen) >= settle)
            .map(|(document, _)| document.clone())
            .collect();
        for document in &settled {
            self.last_seen.remove(document);
        }
        settled.sort();
        settled
    }

    pub fn is_empty(&self) -> bool {
        self.last_seen.is_empty()
    }
}

/// Watches a vault recursively and reports documents created inside it.
pub struct CreatedDocuments {
    _watcher: RecommendedWatcher,
    events: Receiver<notify::Result<Event>>,
    vault: LocalVault,
    settle: Duration,
    pending: PendingDocuments,
}

impl CreatedDocuments {
    pub fn watch(vault: LocalVault, settle: Duration) -> Result<Self> {
        let (tx, events) = channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let _ = tx.send(res);
            },
            Config::default(),
        )
        .context("failed to create filesystem watcher")?;
        watcher
            .watch(vault.root(), RecursiveMode::Recursive)
            .with_context(|| format!("failed to watch {}", vault.root().display()))?;
        tracing::info!(root = %vault.root().display(), "watching vault for new documents");

        Ok(Self {
            _watcher: watcher,
            events,
            vault,
            settle,
            pending: PendingDocuments::default(),
        })
    }

    /// Wait up to `timeout` for events and return the created documents that have settled.
    pub fn poll(&mut self, timeout: Duration) -> Result<Vec<String>> {
        let deadline = Instant::now() + timeout;
        loop {
            let now = Instant::now();
            let settled = self.pending.drain_settled(now, self.settle);
            if !settled.is_empty() || now >= deadline {
                return Ok(settled);
            }

            let wait = if self.pending.is_empty() {
                deadline - now
            } else {
                self.settle.min(deadline - now)
            };
            match self.events.recv_timeout(wait) {
                Ok(Ok(event)) => self.apply(event),
                Ok(Err(err)) => tracing::warn!(error = %err, "watch error"),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => bail!("filesystem watcher stopped"),
            }
        }
    }

    fn apply(&mut self, event: Event) {
        let now = Instant::now();
        match event.kind {
            EventKind::Create(_) => {
                for document in self.documents(&event.paths) {
                    self.pending.created(document, now);
                }
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                for document in self.documents(&event.paths) {
                    self.pending.created(document, now);
                }
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                let mut renamed = self.documents(&event.paths).into_iter();
                if let Some(from) = renamed.next() {
                    self.pending.removed(&from);
                }
                if let Some(to) = renamed.last() {
                    self.pending.created(to, now);
                }
            }
            EventKind::Modify(_) => {
                for document in self.documents(&event.paths) {
                    self.pending.modified(&document, now);
                }
            }
            EventKind::Remove(_) => {
                for document in self.documents(&event.paths) {
                    self.pending.removed(&document);
                }
            }
            _ => {}
        }
    }

    fn documents(&self, paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .filter_map(|path| self.vault.vault_path(path))
            .filter(|document| !document.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    const SETTLE: Duration = Duration::from_millis(100);

    #[test]
    fn documents_settle_after_quiet_period() {
        let start = Instant::now();
        let mut pending = PendingDocuments::default();

        pending.created("a.md".into(), start);
        pending.created("b.md".into(), start);
        pending.modified("a.md", start + Duration::from_millis(80));
        pending.modified("unknown.md", start);

        assert_eq!(
            pending.drain_settled(start + Duration::from_millis(120), SETTLE),
            vec!["b.md"]
        );
        assert!(pending
            .drain_settled(start + Duration::from_millis(150), SETTLE)
            .is_empty());
        assert_eq!(
            pending.drain_settled(start + Duration::from_millis(200), SETTLE),
            vec!["a.md"]
        );
        assert!(pending.is_empty());
    }

    #[test]
    fn removed_documents_are_forgotten() {
        let start = Instant::now();
        let mut pending = PendingDocuments::default();
        pending.created("gone.md".into(), start);
        pending.removed("gone.md");
        assert!(pending.drain_settled(start + SETTLE, SETTLE).is_empty());
    }

    #[test]
    fn reports_file_created_in_vault() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let root = temp.path().canonicalize()?;
        let mut watcher = CreatedDocuments::watch(LocalVault::new(&root), SETTLE)?;

        fs::write(root.join("fresh.md"), "||Fresh/||")?;

        let mut seen = Vec::new();
        for _ in 0..20 {
            seen.extend(watcher.poll(Duration::from_millis(250))?);
            if !seen.is_empty() {
                break;
            }
        }
        assert_eq!(seen, vec!["fresh.md"]);
        Ok(())
    }
}
