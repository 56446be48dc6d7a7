use anyhow::{Context, Result, bail};
use ratatui::style::Color;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::internal::state::{KeyPathStore, paths};

/// Colours offered by the settings view, in cycling order.
pub const PRIMARY_PALETTE: [&str; 6] = [
    "#007bff", "#28a745", "#dc3545", "#fd7e14", "#6f42c1", "#17a2b8",
];

const THEME_KEYS: [&str; 3] = ["primary_color", "background_color", "text_color"];

/// On-disk theme: `{"name": "...", "colors": {"primary_color": "#..", ...}}`.
#[derive(Debug, Deserialize, Clone)]
pub struct ThemeFile {
    #[serde(default)]
    pub name: String,
    pub colors: BTreeMap<String, String>,
}

/// Terminal colours derived from the `theme` state.
#[derive(Debug, Clone, PartialEq)]
pub struct TuiTheme {
    pub primary: Color,
    pub background: Color,
    pub foreground: Color,
    pub border: Color,
    pub muted: Color,
    pub passed: Color,
    pub failed: Color,
}

impl Default for TuiTheme {
    fn default() -> Self {
        Self {
            primary: Color::Blue,
            background: Color::Reset,
            foreground: Color::Reset,
            border: Color::Gray,
            muted: Color::DarkGray,
            passed: Color::Rgb(0x28, 0xa7, 0x45),
            failed: Color::Rgb(0xdc, 0x35, 0x45),
        }
    }
}

impl TuiTheme {
    /// Read `theme.*` from the store; missing or unparseable entries keep
    /// their defaults.
    pub fn from_store(store: &KeyPathStore) -> Self {
        let defaults = Self::default();
        let color = |path: &str, fallback: Color| {
            store
                .get_str(path)
                .and_then(|hex| parse_color(&hex))
                .unwrap_or(fallback)
        };

        Self {
            primary: color(paths::PRIMARY_COLOR, defaults.primary),
            background: color(paths::BACKGROUND_COLOR, defaults.background),
            foreground: color(paths::TEXT_COLOR, defaults.foreground),
            ..defaults
        }
    }
}

/// Load a theme file and return the `theme` entry for `KeyPathStore::set_many`.
#[tracing::instrument(skip(path), fields(path = ?path))]
pub fn load_theme_file(path: &Path) -> Result<Map<String, Value>> {
    let content = fs::read_to_string(path).context("Failed to read theme file")?;
    let theme_file: ThemeFile =
        serde_json::from_str(&content).context("Failed to parse theme JSON")?;

    let colors: Map<String, Value> = theme_file
        .colors
        .into_iter()
        .filter(|(key, value)| {
            let known = THEME_KEYS.contains(&key.as_str()) && parse_color(value).is_some();
            if !known {
                tracing::warn!(key = %key, value = %value, "Ignoring theme entry");
            }
            known
        })
        .map(|(key, value)| (key, Value::String(value)))
        .collect();

    if colors.is_empty() {
        bail!("Theme file defines no usable colors");
    }
    tracing::info!(theme = %theme_file.name, colors = colors.len(), "Loaded theme file");

    let mut entries = Map::new();
    entries.insert(paths::THEME.to_string(), Value::Object(colors));
    Ok(entries)
}

/// The palette entry after `current`, wrapping around.
pub fn next_primary_color(current: Option<&str>) -> &'static str {
    let position = current.and_then(|c| {
        PRIMARY_PALETTE
            .iter()
            .position(|p| p.eq_ignore_ascii_case(c))
    });
    match position {
        Some(i) => PRIMARY_PALETTE[(i + 1) % PRIMARY_PALETTE.len()],
        None => PRIMARY_PALETTE[0],
    }
}

pub fn parse_color(hex: &str) -> Option<Color> {
    let digits = hex.strip_prefix('#')?;
    match digits.len() {
        6 | 8 => {
            // For 8-char hex (with alpha), ignore the alpha and use the RGB components.
            let r = u8::from_str_radix(digits.get(0..2)?, 16).ok()?;
            let g = u8::from_str_radix(digits.get(2..4)?, 16).ok()?;
            let b = u8::from_str_radix(digits.get(4..6)?, 16).ok()?;
            Some(Color::Rgb(r, g, b))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("#007bff"), Some(Color::Rgb(0, 0x7b, 0xff)));
        assert_eq!(parse_color("#007bff80"), Some(Color::Rgb(0, 0x7b, 0xff)));
        assert_eq!(parse_color("007bff"), None);
        assert_eq!(parse_color("#zzzzzz"), None);
        assert_eq!(parse_color("#fff"), None);
    }

    #[test]
    fn test_theme_follows_store() {
        let store = KeyPathStore::new();
        store.set(paths::TEXT_COLOR, "#112233");
        store.set(paths::BACKGROUND_COLOR, "not a color");
        let theme = TuiTheme::from_store(&store);
        assert_eq!(theme.primary, Color::Rgb(0, 0x7b, 0xff));
        assert_eq!(theme.foreground, Color::Rgb(0x11, 0x22, 0x33));
        assert_eq!(theme.background, TuiTheme::default().background);
    }

    #[test]
    fn test_next_primary_color_wraps() {
        assert_eq!(next_primary_color(Some("#007BFF")), "#28a745");
        assert_eq!(next_primary_color(Some("#17a2b8")), "#007bff");
        assert_eq!(next_primary_color(Some("#123456")), "#007bff");
        assert_eq!(next_primary_color(None), "#007bff");
    }

    #[test]
    fn test_theme_file_notifies_nested_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("night.json");
        fs::write(
            &path,
            r##"{"name": "Night", "colors": {"background_color": "#000000", "text_color": "#eeeeee", "accent": "#ff0000"}}"##,
        )
        .unwrap();

        let store = KeyPathStore::new();
        let text_hits = Rc::new(Cell::new(0));
        let sink = Rc::clone(&text_hits);
        store.subscribe(paths::TEXT_COLOR, move |_| sink.set(sink.get() + 1));

        store.set_many(load_theme_file(&path).unwrap());

        assert_eq!(text_hits.get(), 1);
        assert_eq!(store.get_str(paths::BACKGROUND_COLOR).as_deref(), Some("#000000"));
        assert_eq!(store.get(paths::PRIMARY_COLOR), None);
        assert_eq!(TuiTheme::from_store(&store).primary, TuiTheme::default().primary);
    }

    #[test]
    fn test_theme_file_without_colors_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json");
        fs::write(&path, r#"{"colors": {"accent": "red"}}"#).unwrap();
        assert!(load_theme_file(&path).is_err());
        assert!(load_theme_file(&dir.path().join("missing.json")).is_err());
    }
}
