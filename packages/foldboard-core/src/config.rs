/// User options for the board extension.
/// Stored in the key-value store under `settings`, or read from a JSON file.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Width of an expanded panel outside compact mode.
pub const DEFAULT_LIST_WIDTH: u32 = 272;

/// Width of a collapsed panel or SuperPanel.
pub const COLLAPSED_LIST_WIDTH: u32 = 40;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_section_char")]
    pub section_char: char,
    #[serde(default = "default_section_repeat")]
    pub section_repeat: usize,
    #[serde(default = "default_true")]
    pub enable_top_bars: bool,
    #[serde(default = "default_true")]
    pub remember_view_states: bool,
    #[serde(default)]
    pub always_count: bool,
    #[serde(default)]
    pub enable_combining_lists: bool,
    #[serde(default = "default_compact_list_width")]
    pub compact_list_width: u32,
}

fn default_section_char() -> char {
    '#'
}

fn default_section_repeat() -> usize {
    2
}

fn default_true() -> bool {
    true
}

fn default_compact_list_width() -> u32 {
    200
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            section_char: default_section_char(),
            section_repeat: default_section_repeat(),
            enable_top_bars: true,
            remember_view_states: true,
            always_count: false,
            enable_combining_lists: false,
            compact_list_width: default_compact_list_width(),
        }
    }
}

impl Settings {
    /// Section marker string, e.g. `##`.
    pub fn section_identifier(&self) -> String {
        self.section_char.to_string().repeat(self.section_repeat)
    }

    /// A zero repeat count would turn every title into a section header.
    pub fn validated(mut self) -> Self {
        if self.section_repeat == 0 {
            log::warn!("[foldboard.config.section] sectionRepeat 0 is invalid, using 1");
            self.section_repeat = 1;
        }
        self
    }

    /// Parse settings from a stored JSON value, filling missing fields with defaults.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value::<Settings>(value).map(Settings::validated)
    }
}

/// Load settings from a JSON file. Returns defaults if the file is missing or invalid.
pub fn load_settings(path: &Path) -> Settings {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str::<Settings>(&content)
            .map(Settings::validated)
            .unwrap_or_else(|e| {
                log::warn!(
                    "[foldboard.config.load] Failed to parse settings {}: {}",
                    path.display(),
                    e
                );
                Settings::default()
            }),
        Err(_) => {
            log::info!(
                "[foldboard.config.load] No settings at {}, using defaults",
                path.display()
            );
            Settings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.section_identifier(), "##");
        assert!(settings.remember_view_states);
        assert!(!settings.enable_combining_lists);
        assert_eq!(settings.compact_list_width, 200);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings =
            Settings::from_value(serde_json::json!({ "sectionChar": "*", "alwaysCount": true }))
                .unwrap();
        assert_eq!(settings.section_identifier(), "**");
        assert!(settings.always_count);
        assert!(settings.enable_top_bars);
    }

    #[test]
    fn test_zero_repeat_is_clamped() {
        let settings = Settings::from_value(serde_json::json!({ "sectionRepeat": 0 })).unwrap();
        assert_eq!(settings.section_repeat, 1);
    }

    #[test]
    fn test_load_settings_from_file() {
        let mut tmp = NamedTempFile::new().unwrap();
        write!(tmp, r#"{{"enableCombiningLists": true, "compactListWidth": 180}}"#).unwrap();
        let settings = load_settings(tmp.path());
        assert!(settings.enable_combining_lists);
        assert_eq!(settings.compact_list_width, 180);
    }

    #[test]
    fn test_load_settings_invalid_falls_back() {
        let mut tmp = NamedTempFile::new().unwrap();
        write!(tmp, "not json").unwrap();
        assert_eq!(load_settings(tmp.path()), Settings::default());
        assert_eq!(
            load_settings(Path::new("/nonexistent/foldboard.json")),
            Settings::default()
        );
    }
}
