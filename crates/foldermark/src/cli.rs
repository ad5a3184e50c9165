//! Command-line host: maps subcommands onto the document triggers.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::{ArgAction, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::Serialize;

use crate::app::linker::{FolderLinker, is_markdown};
use crate::app::render::{FolderLink, HtmlRenderer, MarkdownRenderer, Renderer};
use crate::app::scan::scan;
use crate::app::sweep::{DocumentWalker, sweep};
use crate::domain::model::Notice;
use crate::infra::config::{Config, SettingsStore, find_vault_root};
use crate::infra::logging::LogStyle;
use crate::infra::vault::{LocalVault, Vault};
use crate::infra::watch::CreatedDocuments;

const WATCH_TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Parser)]
#[command(
    name = "foldermark",
    author,
    version,
    about = "Create folders from ||Folder/|| markers in markdown notes",
    long_about = None
)]
pub struct Cli {
    /// Vault root. Defaults to the nearest parent holding .foldermark/ or .obsidian/, else the
    /// working directory.
    #[arg(long, global = true)]
    vault: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Print logs as a tree following span nesting.
    #[arg(long, global = true)]
    tree: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the folder markers found in a document
    Scan {
        document: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Create the folders a document references, as when it is opened
    Open {
        document: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Like `open`, and delete the document if it only declares a folder
    Create {
        document: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Render a document with markers replaced by folder links
    Render {
        document: PathBuf,
        #[arg(long, value_enum, default_value_t = RenderFormat::Html)]
        format: RenderFormat,
        /// Emit the rendered text and its links as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resolve one folder name as if its link had been clicked in `--from`
    Resolve {
        folder: String,
        #[arg(long)]
        from: PathBuf,
    },
    /// Run `open` on every markdown document in the vault
    Sweep {
        #[arg(long)]
        json: bool,
    },
    /// Watch the vault and run `create` on new markdown documents
    Watch {
        /// Quiet period before a new document is processed, in milliseconds
        #[arg(long, default_value_t = 300)]
        settle_ms: u64,
    },
    /// Show or change settings
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },
    /// Generate shell completions
    Completions { shell: Shell },
}

#[derive(Debug, Subcommand)]
enum SettingsCommand {
    /// Print the merged settings
    Show,
    /// Store a setting in the vault's .foldermark/settings.toml
    Set { key: String, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RenderFormat {
    Html,
    Markdown,
}

struct Workspace {
    root: PathBuf,
    config: Config,
    vault: LocalVault,
}

impl Workspace {
    fn open(explicit: Option<&Path>) -> Result<Self> {
        let cwd = env::current_dir().context("unable to determine working directory")?;
        let root = match explicit {
            Some(path) => path.to_path_buf(),
            None => find_vault_root(&cwd).unwrap_or(cwd),
        };
        let root = fs::canonicalize(&root)
            .with_context(|| format!("vault root not found: {}", root.display()))?;
        let config = Config::load(&root)?;
        tracing::debug!(root = %root.display(), "opened vault");

        Ok(Self {
            vault: LocalVault::new(&root),
            root,
            config,
        })
    }

    fn linker(&self) -> FolderLinker<&LocalVault> {
        FolderLinker::new(&self.vault, self.config.plugin.clone())
    }

    /// Map a command-line path to a vault path.
    ///
    /// Paths are tried relative to the working directory first, then relative to the vault root.
    fn document(&self, path: &Path) -> Result<String> {
        let from_cwd = env::current_dir()
            .ok()
            .map(|cwd| cwd.join(path))
            .and_then(|full| self.vault.vault_path(&full));
        from_cwd
            .filter(|document| self.vault.is_document(document).unwrap_or(false))
            .or_else(|| self.vault.vault_path(path))
            .filter(|document| !document.is_empty())
            .ok_or_else(|| anyhow!("{} is not inside vault {}", path.display(), self.root.display()))
    }
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }

    pub fn log_style(&self) -> LogStyle {
        if self.tree {
            LogStyle::Tree
        } else {
            LogStyle::Compact
        }
    }

    pub fn run(self) -> Result<()> {
        let mut out = io::stdout().lock();

        let command = match self.command {
            Command::Completions { shell } => {
                clap_complete::generate(shell, &mut Cli::command(), "foldermark", &mut out);
                return Ok(());
            }
            other => other,
        };

        let workspace = Workspace::open(self.vault.as_deref())?;

        match command {
            Command::Scan { document, json } => {
                let document = workspace.document(&document)?;
                let body = workspace
                    .vault
                    .read_document(&document)
                    .with_context(|| format!("failed to read {document}"))?;
                let markers = scan(&body);
                if json {
                    write_json(&mut out, &markers)?;
                } else {
                    for marker in &markers {
                        writeln!(
                            out,
                            "{}..{}\t{}",
                            marker.span.start, marker.span.end, marker.folder_name
                        )?;
                    }
                }
            }
            Command::Open { document, json } => {
                let document = workspace.document(&document)?;
                let notices = workspace.linker().document_opened(&document);
                write_notices(&mut out, &notices, json)?;
            }
            Command::Create { document, json } => {
                let document = workspace.document(&document)?;
                let notices = workspace.linker().document_created(&document);
                write_notices(&mut out, &notices, json)?;
            }
            Command::Render {
                document,
                format,
                json,
            } => {
                let document = workspace.document(&document)?;
                let prefix = workspace.config.plugin.folder_prefix();
                let renderer: Box<dyn Renderer> = match format {
                    RenderFormat::Html => Box::new(HtmlRenderer::new(prefix)?),
                    RenderFormat::Markdown => Box::new(MarkdownRenderer::new(prefix)),
                };
                let rendered = workspace
                    .linker()
                    .document_rendered(&document, renderer.as_ref())?;
                if json {
                    write_json(&mut out, &rendered)?;
                } else {
                    write!(out, "{}", rendered.output)?;
                }
            }
            Command::Resolve { folder, from } => {
                let link = FolderLink {
                    folder_name: folder,
                    origin: workspace.document(&from)?,
                };
                let notice = workspace.linker().link_activated(&link);
                writeln!(out, "{notice}")?;
            }
            Command::Sweep { json } => {
                let walker = DocumentWalker::new(&workspace.root, &workspace.config)?;
                let documents = walker.documents(&workspace.vault);
                tracing::info!(documents = documents.len(), "sweeping vault");
                let entries = sweep(&workspace.linker(), &documents);
                if json {
                    write_json(&mut out, &entries)?;
                } else {
                    for entry in &entries {
                        for notice in &entry.notices {
                            writeln!(out, "{}: {notice}", entry.document)?;
                        }
                    }
                }
            }
            Command::Watch { settle_ms } => {
                let walker = DocumentWalker::new(&workspace.root, &workspace.config)?;
                let linker = workspace.linker();
                let mut created = CreatedDocuments::watch(
                    workspace.vault.clone(),
                    Duration::from_millis(settle_ms),
                )?;
                loop {
                    for document in created.poll(WATCH_TICK)? {
                        if !is_markdown(&document) || walker.is_ignored(&document) {
                            continue;
                        }
                        for notice in linker.document_created(&document) {
                            writeln!(out, "{document}: {notice}")?;
                        }
                        out.flush()?;
                    }
                }
            }
            Command::Settings { action } => match action {
                SettingsCommand::Show => {
                    let rendered = toml::to_string_pretty(&workspace.config)
                        .context("failed to serialize settings")?;
                    write!(out, "{rendered}")?;
                }
                SettingsCommand::Set { key, value } => {
                    let store = SettingsStore::new(&workspace.root);
                    let mut layer = store.load()?;
                    layer.set(&key, &value)?;
                    store.save(&layer)?;
                    writeln!(out, "Saved {key} to {}", store.path().display())?;
                }
            },
            Command::Completions { .. } => {}
        }

        Ok(())
    }
}

fn write_notices(out: &mut impl Write, notices: &[Notice], json: bool) -> Result<()> {
    if json {
        return write_json(out, notices);
    }
    for notice in notices {
        writeln!(out, "{notice}")?;
    }
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(out: &mut impl Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value).context("failed to serialize output")?;
    writeln!(out)?;
    Ok(())
}
