//! Rendering folder markers into activatable elements.

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use serde::Serialize;

use crate::app::resolve::{FolderResolver, ResolveOptions};
use crate::app::scan::{Fragment, fragments};
use crate::domain::errors::ResolutionError;
use crate::domain::model::{ResolutionOutcome, ResolutionRequest};
use crate::infra::vault::Vault;

const HTML_TEMPLATE_NAME: &str = "folder_link.html";
const HTML_TEMPLATE: &str = r#"<a class="folder-link" data-folder="{{ folder }}" data-origin="{{ origin }}">{{ label }}/</a>"#;

/// A rendered marker, bound to the folder it names and the document it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderLink {
    pub folder_name: String,
    pub origin: String,
}

impl FolderLink {
    /// Resolve the bound folder, as when the user clicks the rendered element.
    pub fn activate<V: Vault>(
        &self,
        resolver: &FolderResolver<V>,
        options: ResolveOptions,
    ) -> Result<ResolutionOutcome, ResolutionError> {
        resolver.resolve_request(&self.request(), options)
    }

    pub fn request(&self) -> ResolutionRequest {
        ResolutionRequest::new(self.folder_name.clone(), self.origin.clone())
    }
}

/// Produces the replacement markup for one marker.
pub trait Renderer {
    fn render(&self, link: &FolderLink) -> Result<String>;
}

/// Document text with markers replaced, plus one link per replaced marker in text order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RenderedDocument {
    pub output: String,
    pub links: Vec<FolderLink>,
}

/// Replace every marker in `text` with the renderer's output.
pub fn render_document(
    text: &str,
    origin: &str,
    renderer: &dyn Renderer,
) -> Result<RenderedDocument> {
    let mut rendered = RenderedDocument {
        output: String::with_capacity(text.len()),
        links: Vec::new(),
    };

    for fragment in fragments(text) {
        match fragment {
            Fragment::Text(literal) => rendered.output.push_str(literal),
            Fragment::Marker(marker) => {
                let link = FolderLink {
                    folder_name: marker.folder_name,
                    origin: origin.to_owned(),
                };
                let markup = renderer
                    .render(&link)
                    .with_context(|| format!("failed to render marker {}", marker.raw))?;
                rendered.output.push_str(&markup);
                rendered.links.push(link);
            }
        }
    }

    Ok(rendered)
}

/// Renders markers as HTML anchors carrying the folder and origin as data attributes.
pub struct HtmlRenderer {
    env: Environment<'static>,
    label_prefix: String,
}

impl HtmlRenderer {
    pub fn new(label_prefix: impl Into<String>) -> Result<Self> {
        let mut env = Environment::new();
        env.add_template(HTML_TEMPLATE_NAME, HTML_TEMPLATE)
            .context("failed to register folder link template")?;
        Ok(Self {
            env,
            label_prefix: label_prefix.into(),
        })
    }
}

impl Renderer for HtmlRenderer {
    fn render(&self, link: &FolderLink) -> Result<String> {
        let template = self.env.get_template(HTML_TEMPLATE_NAME)?;
        let label = format!("{}{}", self.label_prefix, link.folder_name);
        template
            .render(context! {
                folder => &link.folder_name,
                origin => &link.origin,
                label => &label,
            })
            .context("failed to render folder link")
    }
}

/// Renders markers as inline code, for plain markdown output.
#[derive(Debug, Clone, Default)]
pub struct MarkdownRenderer {
    label_prefix: String,
}

impl MarkdownRenderer {
    pub fn new(label_prefix: impl Into<String>) -> Self {
        Self {
            label_prefix: label_prefix.into(),
        }
    }
}

impl Renderer for MarkdownRenderer {
    fn render(&self, link: &FolderLink) -> Result<String> {
        Ok(format!("`{}{}/`", self.label_prefix, link.folder_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    use crate::domain::model::OutcomeKind;
    use crate::infra::vault::LocalVault;

    #[test]
    fn html_renderer_replaces_markers() -> Result<()> {
        let renderer = HtmlRenderer::new("")?;
        let rendered = render_document("Start ||Projects/|| here.", "index.md", &renderer)?;

        assert_snapshot!(
            rendered.output,
            @r#"Start <a class="folder-link" data-folder="Projects" data-origin="index.md">Projects/</a> here."#
        );
        assert_eq!(
            rendered.links,
            vec![FolderLink {
                folder_name: "Projects".into(),
                origin: "index.md".into(),
            }]
        );
        Ok(())
    }

    #[test]
    fn html_renderer_escapes_names() -> Result<()> {
        let renderer = HtmlRenderer::new("")?;
        let rendered = render_document("||R&D/||", "index.md", &renderer)?;
        assert!(rendered.output.contains(r#"data-folder="R&amp;D""#));
        Ok(())
    }

    #[test]
    fn markdown_renderer_uses_prefix_label() -> Result<()> {
        let renderer = MarkdownRenderer::new("📁 ");
        let rendered = render_document("a ||X/|| b ||Y/Z/||", "n.md", &renderer)?;
        assert_snapshot!(rendered.output, @"a `📁 X/` b `📁 Y/Z/`");
        assert_eq!(rendered.links.len(), 2);
        Ok(())
    }

    #[test]
    fn text_without_markers_is_unchanged() -> Result<()> {
        let rendered = render_document("plain || text", "n.md", &MarkdownRenderer::default())?;
        assert_eq!(rendered.output, "plain || text");
        assert!(rendered.links.is_empty());
        Ok(())
    }

    #[test]
    fn activating_a_link_resolves_its_folder() -> Result<()> {
        let temp = tempfile::tempdir()?;
        std::fs::create_dir_all(temp.path().join("Notes"))?;
        std::fs::write(temp.path().join("Notes/index.md"), "||Projects/||")?;
        let resolver = FolderResolver::new(LocalVault::new(temp.path()));

        let renderer = MarkdownRenderer::default();
        let rendered = render_document("||Projects/||", "Notes/index.md", &renderer)?;
        let link = &rendered.links[0];

        let first = link.activate(&resolver, ResolveOptions::default())?;
        let second = link.activate(&resolver, ResolveOptions::default())?;
        assert_eq!(first.kind, OutcomeKind::Created);
        assert_eq!(second.kind, OutcomeKind::AlreadyExists);
        assert_eq!(second.path, "Notes/Projects");
        Ok(())
    }
}
