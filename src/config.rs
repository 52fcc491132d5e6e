use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::{log::logger::expand_path, rtc::types::VideoEncoderConfigurationType};

/// Error raised while reading the client configuration file.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: String, source: std::io::Error },
    Write { path: String, source: std::io::Error },
    Parse { line: usize, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => write!(f, "Error reading file {path}: {source}"),
            ConfigError::Write { path, source } => write!(f, "Error writing file {path}: {source}"),
            ConfigError::Parse { line, message } => {
                write!(f, "Config parse error at line {line}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } | ConfigError::Write { source, .. } => Some(source),
            ConfigError::Parse { .. } => None,
        }
    }
}

/// INI-style key/value configuration.
///
/// Keys before the first `[Section]` header are globals. Lines starting with
/// `#` are comments and surrounding double quotes on values are stripped.
#[derive(Debug, Default)]
pub struct Config {
    pub globals: HashMap<String, String>,
    pub sections: HashMap<String, HashMap<String, String>>,
}

impl Config {
    /// Reads and parses the file at `path`.
    ///
    /// # Errors
    /// [`ConfigError::Io`] if the file cannot be read, [`ConfigError::Parse`]
    /// on a malformed line.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parses configuration text.
    ///
    /// # Errors
    /// [`ConfigError::Parse`] for an unterminated section header, an empty
    /// section name, a line without `=`, or an empty key.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut globals = HashMap::new();
        let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
        let mut current_section: Option<String> = None;

        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(header) = line.strip_prefix('[') {
                let name = header.strip_suffix(']').ok_or_else(|| ConfigError::Parse {
                    line: idx + 1,
                    message: format!("unterminated section header '{line}'"),
                })?;
                let name = name.trim();
                if name.is_empty() {
                    return Err(ConfigError::Parse {
                        line: idx + 1,
                        message: "empty section name".into(),
                    });
                }
                current_section = Some(name.to_owned());
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::Parse {
                    line: idx + 1,
                    message: format!("expected 'key = value', got '{line}'"),
                });
            };
            let key = key.trim();
            if key.is_empty() {
                return Err(ConfigError::Parse {
                    line: idx + 1,
                    message: "empty key".into(),
                });
            }
            let value = value.trim().trim_matches('"').to_owned();

            match &current_section {
                None => {
                    globals.insert(key.to_owned(), value);
                }
                Some(sec) => {
                    sections
                        .entry(sec.clone())
                        .or_default()
                        .insert(key.to_owned(), value);
                }
            }
        }
        Ok(Config { globals, sections })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Sets `key` in `section`, creating the section if needed.
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.sections
            .entry(section.to_owned())
            .or_default()
            .insert(key.to_owned(), value.to_owned());
    }

    /// Renders the configuration in the format [`Config::parse`] reads:
    /// globals first, then sections, each sorted by name.
    #[must_use]
    pub fn to_ini_string(&self) -> String {
        let mut out = String::new();
        for (key, value) in sorted(&self.globals) {
            out.push_str(&format!("{key} = {value}\n"));
        }
        let sections: BTreeMap<&String, &HashMap<String, String>> = self.sections.iter().collect();
        for (name, entries) in sections {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&format!("[{name}]\n"));
            for (key, value) in sorted(entries) {
                out.push_str(&format!("{key} = {value}\n"));
            }
        }
        out
    }

    /// Writes the configuration to `path`, creating parent directories.
    ///
    /// # Errors
    /// [`ConfigError::Write`] if the directory or file cannot be written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let write_err = |source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(write_err)?;
        }
        fs::write(path, self.to_ini_string()).map_err(write_err)
    }

    #[must_use]
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|sec| sec.get(key))
            .map(String::as_str)
    }

    #[must_use]
    pub fn get_non_empty(&self, section: &str, key: &str) -> Option<&str> {
        self.get(section, key).filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn get_global(&self, key: &str) -> Option<&str> {
        self.globals.get(key).map(String::as_str)
    }

    /// Section value, then global value, then `default`.
    #[must_use]
    pub fn get_or_default<'a>(&'a self, section: &str, key: &str, default: &'a str) -> &'a str {
        self.get(section, key)
            .or_else(|| self.get_global(key))
            .unwrap_or(default)
    }

    /// Interprets `true/yes/on/1` and `false/no/off/0`; anything else yields `default`.
    #[must_use]
    pub fn get_bool_or(&self, section: &str, key: &str, default: bool) -> bool {
        match self
            .get(section, key)
            .map(|v| v.to_ascii_lowercase())
            .as_deref()
        {
            Some("true" | "yes" | "on" | "1") => true,
            Some("false" | "no" | "off" | "0") => false,
            _ => default,
        }
    }
}

fn sorted(entries: &HashMap<String, String>) -> BTreeMap<&String, &String> {
    entries.iter().collect()
}

/// Typed view of the settings the meeting client reads at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub app_id: String,
    pub rtc_log_path: String,
    pub channel_name: String,
    pub nickname: String,
    pub camera_on: bool,
    pub audio_on: bool,
    pub encoder_configuration: VideoEncoderConfigurationType,
    pub preferences_path: String,
    pub speaker_test_file: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            rtc_log_path: "./log/".into(),
            channel_name: String::new(),
            nickname: String::new(),
            camera_on: true,
            audio_on: true,
            encoder_configuration: VideoEncoderConfigurationType::Medium,
            preferences_path: "~/.rustymeet/preferences.conf".into(),
            speaker_test_file: "sounds/speaker_test.wav".into(),
        }
    }
}

impl ClientSettings {
    /// Builds settings from the `[Rtc]`, `[Meeting]`, `[Video]`, `[Audio]`
    /// and `[Preferences]` sections.
    /// Missing or unparsable values keep their defaults.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let defaults = Self::default();
        Self {
            app_id: config.get_or_default("Rtc", "app_id", "").to_owned(),
            rtc_log_path: config
                .get_non_empty("Rtc", "log_path")
                .unwrap_or(&defaults.rtc_log_path)
                .to_owned(),
            channel_name: config.get_or_default("Meeting", "channel_name", "").to_owned(),
            nickname: config.get_or_default("Meeting", "nickname", "").to_owned(),
            camera_on: config.get_bool_or("Meeting", "camera_on", defaults.camera_on),
            audio_on: config.get_bool_or("Meeting", "audio_on", defaults.audio_on),
            encoder_configuration: config
                .get_non_empty("Video", "encoder_configuration")
                .and_then(VideoEncoderConfigurationType::from_name)
                .unwrap_or(defaults.encoder_configuration),
            preferences_path: config
                .get_non_empty("Preferences", "path")
                .unwrap_or(&defaults.preferences_path)
                .to_owned(),
            speaker_test_file: config
                .get_non_empty("Audio", "speaker_test_file")
                .unwrap_or(&defaults.speaker_test_file)
                .to_owned(),
        }
    }
}

/// Choices the user makes in the client that outlive the process.
///
/// Stored as a small INI file of its own, so the hand-edited client
/// configuration is never rewritten.
#[derive(Debug)]
pub struct Preferences {
    path: PathBuf,
    config: Config,
}

impl Preferences {
    /// Opens the preferences at `path` (a leading `~` is expanded). A missing
    /// file yields empty preferences.
    ///
    /// # Errors
    /// [`ConfigError::Io`] for any read failure other than a missing file,
    /// [`ConfigError::Parse`] for a malformed file.
    pub fn open(path: &str) -> Result<Self, ConfigError> {
        let path = expand_path(path);
        let config = match fs::read_to_string(&path) {
            Ok(content) => Config::parse(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::empty(),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        Ok(Self { path, config })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn encoder_configuration(&self) -> Option<VideoEncoderConfigurationType> {
        self.config
            .get_non_empty("Video", "encoder_configuration")
            .and_then(VideoEncoderConfigurationType::from_name)
    }

    /// Remembers `configuration` and writes the file immediately.
    ///
    /// # Errors
    /// [`ConfigError::Write`] if the file cannot be written.
    pub fn set_encoder_configuration(
        &mut self,
        configuration: VideoEncoderConfigurationType,
    ) -> Result<(), ConfigError> {
        self.config
            .set("Video", "encoder_configuration", &configuration.to_string());
        self.config.save(&self.path)
    }

    /// Overrides the settings read at startup with the remembered choices.
    pub fn apply_to(&self, settings: &mut ClientSettings) {
        if let Some(configuration) = self.encoder_configuration() {
            settings.encoder_configuration = configuration;
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    const SAMPLE: &str = r#"
# client configuration
app_id = "global-id"

[Rtc]
log_path = ./log/

[Meeting]
channel_name = "standup"
nickname = ana
camera_on = off

[Video]
encoder_configuration = HIGH

[Logging]
client_log_filename = client
"#;

    #[test]
    fn parses_sections_globals_and_quotes() {
        let cfg = Config::parse(SAMPLE).expect("valid config");
        assert_eq!(cfg.get_global("app_id"), Some("global-id"));
        assert_eq!(cfg.get("Meeting", "channel_name"), Some("standup"));
        assert_eq!(cfg.get("Logging", "client_log_filename"), Some("client"));
        assert_eq!(cfg.get("Meeting", "missing"), None);
    }

    #[test]
    fn section_value_falls_back_to_global() {
        let cfg = Config::parse(SAMPLE).expect("valid config");
        assert_eq!(cfg.get_or_default("Rtc", "app_id", "x"), "global-id");
        assert_eq!(cfg.get_or_default("Rtc", "nope", "x"), "x");
    }

    #[test]
    fn client_settings_reads_typed_values() {
        let cfg = Config::parse(SAMPLE).expect("valid config");
        let s = ClientSettings::from_config(&cfg);
        assert_eq!(s.app_id, "global-id");
        assert_eq!(s.channel_name, "standup");
        assert_eq!(s.nickname, "ana");
        assert!(!s.camera_on);
        assert!(s.audio_on);
        assert_eq!(s.encoder_configuration, VideoEncoderConfigurationType::High);
    }

    #[test]
    fn empty_config_yields_defaults() {
        assert_eq!(ClientSettings::from_config(&Config::empty()), ClientSettings::default());
    }

    #[test]
    fn malformed_lines_are_rejected_with_line_number() {
        match Config::parse("[Rtc]\njust a line") {
            Err(ConfigError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {other:?}"),
        }
        assert!(matches!(
            Config::parse("[Rtc"),
            Err(ConfigError::Parse { line: 1, .. })
        ));
        assert!(matches!(
            Config::parse(" = value"),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn client_settings_reads_audio_and_preferences_paths() {
        let cfg = Config::parse(
            "[Audio]\nspeaker_test_file = ring.wav\n[Preferences]\npath = ./prefs.conf\n",
        )
        .expect("valid config");
        let s = ClientSettings::from_config(&cfg);
        assert_eq!(s.speaker_test_file, "ring.wav");
        assert_eq!(s.preferences_path, "./prefs.conf");
    }

    #[test]
    fn rendered_config_parses_back() {
        let mut cfg = Config::parse(SAMPLE).expect("valid config");
        cfg.set("Video", "encoder_configuration", "low");
        cfg.set("Extra", "key", "v");
        let text = cfg.to_ini_string();
        assert!(text.starts_with("app_id = global-id\n"));

        let back = Config::parse(&text).expect("rendered config parses");
        assert_eq!(back.get("Video", "encoder_configuration"), Some("low"));
        assert_eq!(back.get("Extra", "key"), Some("v"));
        assert_eq!(back.get("Meeting", "nickname"), Some("ana"));
    }

    #[test]
    fn encoder_preference_survives_reopen() {
        let dir = std::env::temp_dir().join(format!("rustymeet_prefs_test_{}", std::process::id()));
        let path = dir.join("nested").join("preferences.conf");
        let path_str = path.to_str().expect("utf-8 temp path");

        let mut prefs = Preferences::open(path_str).expect("missing file is empty");
        assert_eq!(prefs.encoder_configuration(), None);
        prefs
            .set_encoder_configuration(VideoEncoderConfigurationType::High)
            .expect("save");

        let reopened = Preferences::open(path_str).expect("reopen");
        assert_eq!(reopened.path(), path.as_path());
        assert_eq!(
            reopened.encoder_configuration(),
            Some(VideoEncoderConfigurationType::High)
        );
        let mut settings = ClientSettings::default();
        reopened.apply_to(&mut settings);
        assert_eq!(settings.encoder_configuration, VideoEncoderConfigurationType::High);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Config::load("/definitely/not/here.conf").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.conf"));
    }
}
