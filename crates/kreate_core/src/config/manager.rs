//! Reading and writing `kreate.toml`.
//!
//! Writes go to `kreate.toml.tmp` first and are renamed over the real file,
//! so an interrupted save never leaves a half-written config. Section
//! updates go through `toml_edit`, which keeps hand edits and comments in
//! the other tables.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::{DocumentMut, Item};

use super::settings::{ConfigSection, Settings};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No config file at {0}")]
    NotFound(PathBuf),

    #[error("Cannot read or write config: {0}")]
    Io(#[from] io::Error),

    /// A key holds a value of the wrong type or an unknown variant.
    #[error("Bad config value: {0}")]
    Invalid(#[from] toml::de::Error),

    #[error("Cannot write config values: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The file is not TOML at all.
    #[error("Config is not valid TOML: {0}")]
    Syntax(#[from] toml_edit::TomlError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// A config file on disk and the settings loaded from it.
pub struct ConfigManager {
    path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    /// Defaults until [`load`](Self::load) or
    /// [`load_or_create`](Self::load_or_create) is called.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            settings: Settings::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// In-memory only until `save` or `update_section`.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn into_settings(self) -> Settings {
        self.settings
    }

    pub fn logs_folder(&self) -> PathBuf {
        PathBuf::from(&self.settings.paths.logs_folder)
    }

    /// Read the file; missing keys take their defaults.
    pub fn load(&mut self) -> ConfigResult<()> {
        let text = self.read_existing()?;
        self.settings = toml::from_str(&text)?;
        Ok(())
    }

    /// Read the file, or write a fully commented default one if there is
    /// none.
    ///
    /// A file lacking one of the sections, or carrying a table kreate does
    /// not know, is rewritten in full from the loaded values.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        if !self.path.exists() {
            self.settings = Settings::default();
            return self.save();
        }

        let text = self.read_existing()?;
        let doc: DocumentMut = text.parse()?;
        self.settings = toml::from_str(&text)?;

        if needs_rewrite(&doc) {
            tracing::debug!("Filling in sections of {}", self.path.display());
            self.save()?;
        }
        Ok(())
    }

    /// Write every section, with a comment above each.
    pub fn save(&self) -> ConfigResult<()> {
        let mut text = String::from(
            "# kreate configuration\n\
             # Command-line flags win over anything set here.\n\n",
        );
        for section in ConfigSection::ALL {
            text.push_str(&format!("{}\n[{}]\n", section.comment(), section.table_name()));
            text.push_str(&self.section_body(section)?);
            text.push('\n');
        }
        self.replace_file(&text)?;
        Ok(())
    }

    /// Rewrite one table from the in-memory settings, leaving the rest of
    /// the file as it is on disk.
    pub fn update_section(&mut self, section: ConfigSection) -> ConfigResult<()> {
        let mut doc = if self.path.exists() {
            fs::read_to_string(&self.path)?.parse::<DocumentMut>()?
        } else {
            DocumentMut::new()
        };

        let fresh: DocumentMut = self.section_body(section)?.parse()?;
        doc[section.table_name()] = Item::Table(fresh.as_table().clone());

        self.replace_file(&doc.to_string())?;
        Ok(())
    }

    fn read_existing(&self) -> ConfigResult<String> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(ConfigError::NotFound(self.path.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The keys of one section, without its `[table]` header.
    fn section_body(&self, section: ConfigSection) -> ConfigResult<String> {
        let s = &self.settings;
        let body = match section {
            ConfigSection::Paths => toml::to_string_pretty(&s.paths)?,
            ConfigSection::Logging => toml::to_string_pretty(&s.logging)?,
            ConfigSection::Trim => toml::to_string_pretty(&s.trim)?,
            ConfigSection::Planner => toml::to_string_pretty(&s.planner)?,
            ConfigSection::Tools => toml::to_string_pretty(&s.tools)?,
            ConfigSection::Run => toml::to_string_pretty(&s.run)?,
        };
        Ok(body)
    }

    fn replace_file(&self, text: &str) -> io::Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        // Same directory, so the rename cannot cross filesystems
        let staged = self.path.with_extension("toml.tmp");
        let mut file = File::create(&staged)?;
        file.write_all(text.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&staged, &self.path)
    }
}

/// Whether `doc` lacks a known section or has an unknown top-level key.
fn needs_rewrite(doc: &DocumentMut) -> bool {
    let known = |key: &str| ConfigSection::ALL.iter().any(|s| s.table_name() == key);
    let missing = ConfigSection::ALL
        .iter()
        .any(|s| !doc.contains_key(s.table_name()));
    missing || doc.iter().any(|(key, _)| !known(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planning::OverrunPolicy;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gets_commented_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".config").join("kreate.toml");

        ConfigManager::new(&path).load_or_create().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("# kreate configuration"));
        assert!(text.contains("# Default trim window (seconds)\n[trim]"));
        assert!(text.contains("[run]"));

        let mut again = ConfigManager::new(&path);
        again.load().unwrap();
        assert_eq!(again.settings().trim.duration, 60.0);
    }

    #[test]
    fn partial_file_keeps_values_and_gains_sections() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kreate.toml");
        fs::write(&path, "[trim]\nduration = 90.0\n").unwrap();

        let mut config = ConfigManager::new(&path);
        config.load_or_create().unwrap();
        assert_eq!(config.settings().trim.duration, 90.0);

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("[planner]"));
        assert!(text.contains("duration = 90.0"));
    }

    #[test]
    fn complete_file_is_left_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kreate.toml");
        ConfigManager::new(&path).load_or_create().unwrap();

        let edited = format!("# mine\n{}", fs::read_to_string(&path).unwrap());
        fs::write(&path, &edited).unwrap();
        ConfigManager::new(&path).load_or_create().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), edited);
    }

    #[test]
    fn load_needs_an_existing_file() {
        let dir = tempdir().unwrap();
        let mut config = ConfigManager::new(dir.path().join("absent.toml"));
        assert!(matches!(config.load(), Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn unknown_policy_is_a_bad_value() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kreate.toml");
        fs::write(&path, "[planner]\noverrun_policy = \"stretch\"\n").unwrap();

        let mut config = ConfigManager::new(&path);
        assert!(matches!(config.load(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn broken_toml_is_a_syntax_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kreate.toml");
        fs::write(&path, "[trim\n").unwrap();

        let mut config = ConfigManager::new(&path);
        assert!(matches!(config.load_or_create(), Err(ConfigError::Syntax(_))));
    }

    #[test]
    fn section_update_keeps_hand_edits_elsewhere() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kreate.toml");

        let mut config = ConfigManager::new(&path);
        config.load_or_create().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        fs::write(
            &path,
            text.replace("ffmpeg = \"ffmpeg\"", "ffmpeg = \"/opt/ffmpeg\""),
        )
        .unwrap();

        config.settings_mut().planner.overrun_policy = OverrunPolicy::Drop;
        config.update_section(ConfigSection::Planner).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("overrun_policy = \"drop\""));
        assert!(text.contains("ffmpeg = \"/opt/ffmpeg\""));
        assert!(!path.with_extension("toml.tmp").exists());
    }
}
