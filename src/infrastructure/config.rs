use crate::infrastructure::error::InfraError;
use chrono::Duration;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";
const SUPPORTED_SCHEMA: u64 = 1;
const DEFAULT_TIMEZONE: &str = "UTC";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub schema: u8,
    pub app_name: String,
    pub timezone: String,
    #[serde(default)]
    pub reminder_lead_minutes: u32,
}

impl AppConfig {
    pub fn zone(&self) -> Result<Tz, InfraError> {
        parse_timezone(&self.timezone)
    }

    pub fn reminder_lead(&self) -> Duration {
        Duration::minutes(i64::from(self.reminder_lead_minutes))
    }
}

fn default_app_config() -> serde_json::Value {
    serde_json::json!({
        "schema": SUPPORTED_SCHEMA,
        "appName": "Blockflow",
        "timezone": DEFAULT_TIMEZONE,
        "reminderLeadMinutes": 0
    })
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&default_app_config())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != SUPPORTED_SCHEMA {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_app_config(config_dir: &Path) -> Result<AppConfig, InfraError> {
    let path = config_dir.join(APP_JSON);
    let raw = read_config(&path)?;
    let config: AppConfig = serde_json::from_value(raw)?;
    config.zone()?;
    Ok(config)
}

pub fn save_timezone(config_dir: &Path, timezone: &str) -> Result<(), InfraError> {
    let timezone = timezone.trim();
    parse_timezone(timezone)?;

    let path = config_dir.join(APP_JSON);
    let mut app = read_config(&path)?;
    let object = app.as_object_mut().ok_or_else(|| {
        InfraError::InvalidConfig(format!("invalid object structure in {}", path.display()))
    })?;
    object.insert(
        "timezone".to_string(),
        serde_json::Value::String(timezone.to_string()),
    );

    let formatted = serde_json::to_string_pretty(&app)?;
    fs::write(path, format!("{formatted}\n"))?;
    Ok(())
}

pub fn parse_timezone(value: &str) -> Result<Tz, InfraError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(Tz::UTC);
    }
    value
        .parse::<Tz>()
        .map_err(|error| InfraError::InvalidConfig(format!("unknown timezone '{value}': {error}")))
}
