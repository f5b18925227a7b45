use std::{collections::HashMap, fs};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_bind: String,
    /// Origins allowed by CORS. Empty means any origin.
    pub allowed_origins: Vec<String>,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:3001".into(),
            allowed_origins: Vec::new(),
            log_filter: "info".into(),
        }
    }
}

pub fn load_settings() -> Settings {
    let raw = fs::read_to_string("server.toml").ok();
    resolve_settings(raw.as_deref(), |key| std::env::var(key).ok())
}

/// Layers `server.toml` contents and then environment variables over the
/// defaults. Values that fail to parse leave the previous value in place.
pub fn resolve_settings(
    file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = file {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(raw) {
            let get = |key: &str| file_cfg.get(key).and_then(value_as_string);
            if let Some(v) = get("bind_addr") {
                settings.server_bind = v;
            }
            if let Some(v) = get("allowed_origins") {
                settings.allowed_origins = parse_origins(&v);
            }
            if let Some(v) = get("log_filter") {
                settings.log_filter = v;
            }
        }
    }

    if let Some(port) = env("PORT") {
        if port.trim().parse::<u16>().is_ok() {
            settings.server_bind = format!("0.0.0.0:{}", port.trim());
        }
    }
    if let Some(v) = env("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = env("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = env("FRONTEND_URL") {
        settings.allowed_origins = parse_origins(&v);
    }
    if let Some(v) = env("APP__ALLOWED_ORIGINS") {
        settings.allowed_origins = parse_origins(&v);
    }

    if let Some(v) = env("APP__LOG_FILTER") {
        settings.log_filter = v;
    }

    settings
}

fn value_as_string(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|item| item.as_str())
                .collect::<Vec<_>>()
                .join(","),
        ),
        _ => None,
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(|origin| origin.trim_end_matches('/').to_string())
        .collect()
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
