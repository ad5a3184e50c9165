//! Configuration management utilities.

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use dirs_next::config_dir;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

static DEFAULT_CONFIG: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-settings.toml"));
pub const SETTINGS_DIR: &str = ".foldermark";
const SETTINGS_FILE: &str = "settings.toml";
const VAULT_MARKERS: &[&str] = &[SETTINGS_DIR, ".obsidian"];

/// Layered configuration loaded from defaults, user, vault, and env.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub plugin: PluginSettings,
    #[serde(default)]
    pub scan: ScanSettings,
}

/// User preferences for folder creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PluginSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    folder_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    create_folder_note: Option<bool>,
}

impl PluginSettings {
    fn default_create_folder_note() -> bool {
        true
    }

    /// Prefix shown alongside folder names. Stored and editable, not used for path computation.
    pub fn folder_prefix(&self) -> &str {
        self.folder_prefix.as_deref().unwrap_or_default()
    }

    pub fn create_folder_note(&self) -> bool {
        self.create_folder_note
            .unwrap_or_else(Self::default_create_folder_note)
    }

    pub fn set_folder_prefix(&mut self, prefix: &str) {
        self.folder_prefix = Some(prefix.trim().to_owned());
    }

    pub fn set_create_folder_note(&mut self, enabled: bool) {
        self.create_folder_note = Some(enabled);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSettings {
    /// Vault paths excluded from sweeping and watching.
    ///
    /// Layers only add entries: a global or vault layer extends the defaults and cannot drop
    /// one.
    #[serde(default)]
    pub ignore: Vec<String>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            ignore: vec![
                ".obsidian/".into(),
                ".trash/".into(),
                ".git/".into(),
                format!("{SETTINGS_DIR}/"),
            ],
        }
    }
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    folder_prefix: Option<String>,
    create_folder_note: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            folder_prefix: env::var("FOLDERMARK_FOLDER_PREFIX").ok(),
            create_folder_note: env::var("FOLDERMARK_CREATE_FOLDER_NOTE").ok(),
        }
    }

    #[cfg(test)]
    fn for_tests(folder_prefix: &str, create_folder_note: &str) -> Self {
        Self {
            folder_prefix: Some(folder_prefix.to_owned()),
            create_folder_note: Some(create_folder_note.to_owned()),
        }
    }
}

impl Config {
    /// Load configuration from defaults, user/global config, vault config, and env overrides.
    pub fn load(vault_root: &Path) -> Result<Self> {
        let env = EnvOverrides::from_env();
        let global = global_config_path();
        let vault = Some(vault_config_path(vault_root));
        Self::load_with_layers(global, vault, env)
    }

    fn load_with_layers(
        global: Option<PathBuf>,
        vault: Option<PathBuf>,
        env_overrides: EnvOverrides,
    ) -> Result<Self> {
        let mut layers: Vec<Config> = Vec::new();

        layers.push(Self::from_str(&DEFAULT_CONFIG)?);

        if let Some(global_path) = global.filter(|path| path.exists()) {
            layers.push(Self::from_file(&global_path)?);
        }

        if let Some(vault_path) = vault.filter(|path| path.exists()) {
            layers.push(Self::from_file(&vault_path)?);
        }

        let merged = layers.into_iter().reduce(Config::merge).unwrap_or_default();
        apply_env_overrides(merged, env_overrides)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&data)
    }

    fn from_str(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).with_context(|| "failed to parse TOML config".to_string())?;
        Ok(config)
    }

    fn merge(self, other: Self) -> Self {
        Self {
            plugin: merge_plugin(self.plugin, other.plugin),
            scan: merge_scan(self.scan, other.scan),
        }
    }

    /// Update a single plugin setting by key, as entered on the command line.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key.trim().replace('-', "_").as_str() {
            "folder_prefix" => self.plugin.set_folder_prefix(value),
            "create_folder_note" => self.plugin.set_create_folder_note(parse_bool(value)?),
            other => bail!("unknown setting '{other}'"),
        }
        Ok(())
    }
}

/// Reads and writes the vault's own settings layer under `.foldermark/`.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    root: PathBuf,
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(vault_root: impl Into<PathBuf>) -> Self {
        let root = vault_root.into();
        let path = vault_config_path(&root);
        Self { root, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load only the vault layer, without defaults or other layers merged in.
    pub fn load(&self) -> Result<Config> {
        if !self.path.exists() {
            return Ok(Config {
                plugin: PluginSettings::default(),
                scan: ScanSettings { ignore: Vec::new() },
            });
        }
        Config::from_file(&self.path)
    }

    /// Persist the vault layer, creating the settings directory as needed.
    pub fn save(&self, config: &Config) -> Result<()> {
        let dir = self.path.parent().unwrap_or(&self.root);
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create settings directory {}", dir.display()))?;

        let data = toml::to_string_pretty(config).context("failed to serialize settings")?;
        fs::write(&self.path, data)
            .with_context(|| format!("failed to write settings to {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), "saved vault settings");
        Ok(())
    }
}

fn merge_plugin(mut base: PluginSettings, overlay: PluginSettings) -> PluginSettings {
    if let Some(value) = overlay.folder_prefix {
        base.folder_prefix = Some(value);
    }
    if let Some(value) = overlay.create_folder_note {
        base.create_folder_note = Some(value);
    }
    base
}

/// Union of both ignore lists, sorted.
fn merge_scan(base: ScanSettings, overlay: ScanSettings) -> ScanSettings {
    let mut ignore: BTreeSet<String> = base.ignore.into_iter().collect();
    ignore.extend(overlay.ignore);
    ScanSettings {
        ignore: ignore.into_iter().collect(),
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow!("expected a boolean, got '{other}'")),
    }
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("foldermark").join(SETTINGS_FILE))
}

fn vault_config_path(root: &Path) -> PathBuf {
    root.join(SETTINGS_DIR).join(SETTINGS_FILE)
}

/// Walk up from `start` looking for a directory that looks like a vault root.
pub fn find_vault_root(start: &Path) -> Option<PathBuf> {
    let mut current = start;
    loop {
        if VAULT_MARKERS
            .iter()
            .any(|marker| current.join(marker).is_dir())
        {
            return Some(current.to_path_buf());
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Result<Config> {
    if let Some(prefix) = env.folder_prefix {
        config.plugin.set_folder_prefix(&prefix);
    }
    if let Some(raw) = env.create_folder_note {
        let enabled =
            parse_bool(&raw).context("invalid FOLDERMARK_CREATE_FOLDER_NOTE override")?;
        config.plugin.set_create_folder_note(enabled);
    }
    Ok(config)
}
