//! Trigger entry points: what happens when a document is opened, created, rendered, or a
//! rendered folder link is activated.

use std::io;

use anyhow::{Context, Result};

use crate::app::render::{FolderLink, RenderedDocument, Renderer, render_document};
use crate::app::resolve::{FolderResolver, MarkerResolution, ResolveOptions};
use crate::app::scan::scan;
use crate::domain::errors::ResolutionError;
use crate::domain::model::{Notice, ResolutionOutcome};
use crate::infra::config::PluginSettings;
use crate::infra::vault::Vault;

const MARKDOWN_EXTENSION: &str = ".md";

/// Connects host document events to the scanner and resolver.
pub struct FolderLinker<V> {
    resolver: FolderResolver<V>,
    settings: PluginSettings,
}

impl<V: Vault> FolderLinker<V> {
    pub fn new(vault: V, settings: PluginSettings) -> Self {
        Self {
            resolver: FolderResolver::new(vault),
            settings,
        }
    }

    pub fn options(&self) -> ResolveOptions {
        ResolveOptions::from_settings(&self.settings)
    }

    /// Create the folders named by every marker in an opened markdown document.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn document_opened(&self, document: &str) -> Vec<Notice> {
        if !is_markdown(document) {
            return Vec::new();
        }
        match self.read(document) {
            Ok(body) => self
                .resolve_body(document, &body)
                .iter()
                .map(notice_for)
                .collect(),
            Err(notice) => vec![notice],
        }
    }

    /// Like [`Self::document_opened`], then delete the document if it only declared a folder.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn document_created(&self, document: &str) -> Vec<Notice> {
        if !is_markdown(document) {
            return Vec::new();
        }
        let body = match self.read(document) {
            Ok(body) => body,
            Err(notice) => return vec![notice],
        };

        let resolutions = self.resolve_body(document, &body);
        let mut notices: Vec<Notice> = resolutions.iter().map(notice_for).collect();

        for resolution in &resolutions {
            let Ok(outcome) = &resolution.result else {
                continue;
            };
            match self.resolver.remove_placeholder_document(
                document,
                &body,
                &resolution.marker,
                outcome,
            ) {
                Ok(true) => {
                    notices.push(Notice::PlaceholderDeleted(document.to_owned()));
                    break;
                }
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(document, error = %err, "failed to delete placeholder document");
                    notices.push(Notice::Failed(err.to_string()));
                    break;
                }
            }
        }

        notices
    }

    /// Render a document's markers. Folders are only created once a returned link is activated.
    pub fn document_rendered(
        &self,
        document: &str,
        renderer: &dyn Renderer,
    ) -> Result<RenderedDocument> {
        let body = self
            .resolver
            .vault()
            .read_document(document)
            .with_context(|| format!("failed to read document {document}"))?;
        render_document(&body, document, renderer)
    }

    /// Resolve the folder bound to a rendered link.
    pub fn link_activated(&self, link: &FolderLink) -> Notice {
        let result = link.activate(&self.resolver, self.options());
        notice_for_result(&result)
    }

    fn resolve_body(&self, document: &str, body: &str) -> Vec<MarkerResolution> {
        let markers = scan(body);
        tracing::debug!(document, markers = markers.len(), "scanned document");
        self.resolver.resolve_markers(markers, document, self.options())
    }

    fn read(&self, document: &str) -> Result<String, Notice> {
        self.resolver
            .vault()
            .read_document(document)
            .map_err(|err| match err.kind() {
                io::ErrorKind::NotFound => Notice::OriginUnknown,
                _ => {
                    tracing::warn!(document, error = %err, "failed to read document");
                    Notice::Failed(format!("{document}: {err}"))
                }
            })
    }
}

pub fn is_markdown(document: &str) -> bool {
    document.ends_with(MARKDOWN_EXTENSION)
}

fn notice_for(resolution: &MarkerResolution) -> Notice {
    notice_for_result(&resolution.result)
}

fn notice_for_result(result: &Result<ResolutionOutcome, ResolutionError>) -> Notice {
    match result {
        Ok(outcome) => Notice::from(outcome),
        Err(ResolutionError::OriginNotFound(_)) => Notice::OriginUnknown,
        Err(err) => {
            tracing::warn!(error = %err, "folder resolution failed");
            Notice::Failed(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use crate::app::render::MarkdownRenderer;
    use crate::infra::vault::LocalVault;

    fn linker_with(
        files: &[(&str, &str)],
        settings: PluginSettings,
    ) -> (tempfile::TempDir, FolderLinker<LocalVault>) {
        let temp = tempfile::tempdir().expect("tempdir");
        for (path, body) in files {
            let full = temp.path().join(path);
            fs::create_dir_all(full.parent().expect("parent")).expect("create parent");
            fs::write(full, body).expect("write document");
        }
        let linker = FolderLinker::new(LocalVault::new(temp.path()), settings);
        (temp, linker)
    }

    fn without_notes() -> PluginSettings {
        let mut settings = PluginSettings::default();
        settings.set_create_folder_note(false);
        settings
    }

    #[test]
    fn opened_document_creates_each_folder() {
        let (temp, linker) = linker_with(
            &[("Notes/index.md", "||Projects/|| and ||Archive/|| and ||Projects/||")],
            without_notes(),
        );

        let notices = linker.document_opened("Notes/index.md");
        assert_eq!(
            notices,
            vec![
                Notice::Created("Notes/Projects".into()),
                Notice::Created("Notes/Archive".into()),
                Notice::Skipped("Notes/Projects".into()),
            ]
        );
        assert!(temp.path().join("Notes/Projects").is_dir());

        let again = linker.document_opened("Notes/index.md");
        assert_eq!(again[0], Notice::AlreadyExists("Notes/Projects".into()));
    }

    #[test]
    fn non_markdown_documents_are_ignored() {
        let (temp, linker) = linker_with(&[("data.txt", "||Projects/||")], without_notes());
        assert!(linker.document_opened("data.txt").is_empty());
        assert!(!temp.path().join("Projects").exists());
    }

    #[test]
    fn missing_document_reports_unknown_origin() {
        let (_temp, linker) = linker_with(&[], without_notes());
        assert_eq!(
            linker.document_opened("ghost.md"),
            vec![Notice::OriginUnknown]
        );
    }

    #[test]
    fn created_placeholder_document_is_deleted_after_folder() {
        let (temp, linker) = linker_with(&[("a/X.md", "||X/||\n")], PluginSettings::default());

        let notices = linker.document_created("a/X.md");
        assert_eq!(
            notices,
            vec![
                Notice::Created("a/X".into()),
                Notice::PlaceholderDeleted("a/X.md".into()),
            ]
        );
        assert!(temp.path().join("a/X").is_dir());
        assert!(temp.path().join("a/X/X.md").is_file());
        assert!(!temp.path().join("a/X.md").exists());
    }

    #[test]
    fn created_document_with_content_is_kept() {
        let (temp, linker) =
            linker_with(&[("a/plan.md", "Kick off ||X/|| today")], without_notes());

        let notices = linker.document_created("a/plan.md");
        assert_eq!(notices, vec![Notice::Created("a/X".into())]);
        assert!(temp.path().join("a/plan.md").exists());
    }

    #[test]
    fn created_document_named_after_its_folder_is_deleted_despite_content() {
        let (temp, linker) = linker_with(
            &[("Reading.md", "# Books\n\nQueue for ||Reading/|| this winter.\n")],
            without_notes(),
        );

        let notices = linker.document_created("Reading.md");
        assert_eq!(
            notices,
            vec![
                Notice::Created("Reading".into()),
                Notice::PlaceholderDeleted("Reading.md".into()),
            ]
        );
        assert!(temp.path().join("Reading").is_dir());
        assert!(!temp.path().join("Reading.md").exists());
    }

    #[test]
    fn opened_trigger_never_deletes() {
        let (temp, linker) = linker_with(&[("a/X.md", "||X/||")], without_notes());
        linker.document_opened("a/X.md");
        assert!(temp.path().join("a/X.md").exists());
    }

    #[test]
    fn invalid_marker_does_not_stop_the_rest() {
        let (temp, linker) = linker_with(&[("doc.md", "||../|| ||Fine/||")], without_notes());

        let notices = linker.document_opened("doc.md");
        assert!(matches!(notices[0], Notice::Failed(_)));
        assert_eq!(notices[1], Notice::Created("Fine".into()));
        assert!(temp.path().join("Fine").is_dir());
    }

    #[test]
    fn rendered_links_resolve_on_activation() -> Result<()> {
        let (temp, linker) = linker_with(&[("Notes/index.md", "see ||Ideas/||")], without_notes());

        let rendered = linker.document_rendered("Notes/index.md", &MarkdownRenderer::default())?;
        assert_eq!(rendered.output, "see `Ideas/`");
        assert!(!temp.path().join("Notes/Ideas").exists());

        let notice = linker.link_activated(&rendered.links[0]);
        assert_eq!(notice.to_string(), "Created folder: Notes/Ideas");
        Ok(())
    }

    #[test]
    fn activation_after_origin_removed_reports_unknown_origin() -> Result<()> {
        let (temp, linker) = linker_with(&[("Notes/index.md", "||Ideas/||")], without_notes());
        let rendered = linker.document_rendered("Notes/index.md", &MarkdownRenderer::default())?;

        fs::remove_file(temp.path().join("Notes/index.md"))?;
        assert_eq!(
            linker.link_activated(&rendered.links[0]),
            Notice::OriginUnknown
        );
        assert!(!temp.path().join("Notes/Ideas").exists());
        Ok(())
    }
}
