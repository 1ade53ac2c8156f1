use std::{fs, path::Path};

use tracing::warn;

pub const DEFAULT_CONFIG_FILE: &str = "citizen_desk.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_url: String,
    pub serial_path: String,
    pub serial_baud_rate: u32,
    pub serial_enabled: bool,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./data/citizens.db".into(),
            serial_path: "/dev/ttyUSB0".into(),
            serial_baud_rate: 9600,
            serial_enabled: true,
            log_filter: "info".into(),
        }
    }
}

/// Defaults, then the TOML file (if readable), then environment overrides.
pub fn load_settings(config_path: Option<&Path>) -> Settings {
    let mut settings = Settings::default();

    let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    if let Ok(raw) = fs::read_to_string(path) {
        match raw.parse::<toml::Table>() {
            Ok(table) => apply_file_table(&mut settings, &table),
            Err(err) => warn!(path = %path.display(), "ignoring unreadable config file: {err}"),
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file_table(settings: &mut Settings, table: &toml::Table) {
    if let Some(v) = table_string(table, "database_url") {
        settings.database_url = v;
    }
    if let Some(v) = table_string(table, "serial_path") {
        settings.serial_path = v;
    }
    if let Some(v) = table_string(table, "serial_baud_rate").and_then(|v| v.parse().ok()) {
        settings.serial_baud_rate = v;
    }
    if let Some(v) = table_string(table, "serial_enabled").and_then(|v| parse_bool(&v)) {
        settings.serial_enabled = v;
    }
    if let Some(v) = table_string(table, "log_filter") {
        settings.log_filter = v;
    }
}

fn table_string(table: &toml::Table, key: &str) -> Option<String> {
    match table.get(key)? {
        toml::Value::String(v) => Some(v.clone()),
        toml::Value::Integer(v) => Some(v.to_string()),
        toml::Value::Boolean(v) => Some(v.to_string()),
        _ => None,
    }
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = var("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    if let Some(v) = var("SERIAL_PORT") {
        settings.serial_path = v;
    }
    if let Some(v) = var("APP__SERIAL_PATH") {
        settings.serial_path = v;
    }

    if let Some(v) = var("APP__SERIAL_BAUD_RATE").and_then(|v| v.parse().ok()) {
        settings.serial_baud_rate = v;
    }
    if let Some(v) = var("APP__SERIAL_ENABLED").and_then(|v| parse_bool(&v)) {
        settings.serial_enabled = v;
    }

    if let Some(v) = var("APP__LOG_FILTER") {
        settings.log_filter = v;
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
