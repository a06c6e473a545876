use std::{fs, path::Path};

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub log_filter: String,
    pub expand_categories: bool,
    pub switcher_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_filter: "info".into(),
            expand_categories: true,
            switcher_limit: 10,
        }
    }
}

/// File values first, then `APP__*` environment overrides.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config '{}'", path.display()))?;
            parse_settings(&raw)
                .with_context(|| format!("invalid config '{}'", path.display()))?
        }
        None => Settings::default(),
    };
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn parse_settings(raw: &str) -> anyhow::Result<Settings> {
    Ok(toml::from_str::<Settings>(raw)?)
}

fn apply_env_overrides(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("APP__LOG_FILTER").filter(|v| !v.trim().is_empty()) {
        settings.log_filter = v;
    }
    if let Some(v) = var("APP__EXPAND_CATEGORIES") {
        if let Ok(parsed) = v.trim().parse::<bool>() {
            settings.expand_categories = parsed;
        }
    }
    if let Some(v) = var("APP__SWITCHER_LIMIT") {
        if let Ok(parsed) = v.trim().parse::<usize>() {
            settings.switcher_limit = parsed;
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
