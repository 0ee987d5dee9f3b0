use crate::infrastructure::error::InfraError;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";
const USER_JSON: &str = "user.json";
const GOALS_JSON: &str = "goals.json";
const SETTINGS_JSON: &str = "settings.json";

const DEFAULT_MESSAGE_INTERVAL_SECONDS: u64 = 20;

/// Daily study-time targets in hours, compared against the logical-day total.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Goals {
    pub min_hours: u32,
    pub target_hours: u32,
}

impl Default for Goals {
    fn default() -> Self {
        Self {
            min_hours: 2,
            target_hours: 5,
        }
    }
}

/// Entry fields from the most recent commit, restored as form defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct LastSettings {
    pub target_time: String,
    pub condition: String,
    pub comment: String,
    pub location: String,
}

impl Default for LastSettings {
    fn default() -> Self {
        Self {
            target_time: "60".to_string(),
            condition: "good".to_string(),
            comment: String::new(),
            location: String::new(),
        }
    }
}

fn default_files() -> HashMap<&'static str, serde_json::Value> {
    HashMap::from([
        (
            APP_JSON,
            serde_json::json!({
                "schema": 1,
                "appName": "StudyRecorder",
                "recorderUrl": null,
                "timezone": "UTC",
                "messageIntervalSeconds": DEFAULT_MESSAGE_INTERVAL_SECONDS
            }),
        ),
        (
            USER_JSON,
            serde_json::json!({
                "schema": 1,
                "userName": null
            }),
        ),
        (
            GOALS_JSON,
            serde_json::json!({
                "schema": 1,
                "minHours": 2,
                "targetHours": 5
            }),
        ),
        (
            SETTINGS_JSON,
            serde_json::json!({
                "schema": 1,
                "targetTime": "60",
                "condition": "good",
                "comment": "",
                "location": ""
            }),
        ),
    ])
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    for (name, value) in default_files() {
        let path = config_dir.join(name);
        if !path.exists() {
            let formatted = serde_json::to_string_pretty(&value)?;
            fs::write(path, format!("{formatted}\n"))?;
        }
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
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

fn write_config(path: &Path, value: &serde_json::Value) -> Result<(), InfraError> {
    let formatted = serde_json::to_string_pretty(value)?;
    fs::write(path, format!("{formatted}\n"))?;
    Ok(())
}

fn update_config<F>(path: &Path, apply: F) -> Result<(), InfraError>
where
    F: FnOnce(&mut serde_json::Map<String, serde_json::Value>),
{
    let mut config = read_config(path)?;
    let object = config.as_object_mut().ok_or_else(|| {
        InfraError::InvalidConfig(format!("invalid object structure in {}", path.display()))
    })?;
    apply(object);
    write_config(path, &config)
}

pub fn read_recorder_url(config_dir: &Path) -> Result<String, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    app.get("recorderUrl")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            InfraError::InvalidConfig("recorderUrl is not configured in app.json".to_string())
        })
}

pub fn save_recorder_url(config_dir: &Path, recorder_url: &str) -> Result<(), InfraError> {
    let recorder_url = recorder_url.trim();
    if recorder_url.is_empty() {
        return Err(InfraError::InvalidConfig(
            "recorderUrl must not be empty".to_string(),
        ));
    }
    update_config(&config_dir.join(APP_JSON), |object| {
        object.insert(
            "recorderUrl".to_string(),
            serde_json::Value::String(recorder_url.to_string()),
        );
    })
}

pub fn read_timezone(config_dir: &Path) -> Result<Tz, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    let Some(name) = app
        .get("timezone")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
    else {
        return Ok(Tz::UTC);
    };
    name.parse::<Tz>()
        .map_err(|error| InfraError::InvalidConfig(format!("invalid timezone '{name}': {error}")))
}

pub fn read_message_interval_seconds(config_dir: &Path) -> Result<u64, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    Ok(app
        .get("messageIntervalSeconds")
        .and_then(serde_json::Value::as_u64)
        .filter(|seconds| *seconds > 0)
        .unwrap_or(DEFAULT_MESSAGE_INTERVAL_SECONDS))
}

pub fn save_message_interval_seconds(config_dir: &Path, seconds: u64) -> Result<(), InfraError> {
    if seconds == 0 {
        return Err(InfraError::InvalidConfig(
            "messageIntervalSeconds must be > 0".to_string(),
        ));
    }
    update_config(&config_dir.join(APP_JSON), |object| {
        object.insert(
            "messageIntervalSeconds".to_string(),
            serde_json::Value::Number(seconds.into()),
        );
    })
}

pub fn read_user_name(config_dir: &Path) -> Result<Option<String>, InfraError> {
    let user = read_config(&config_dir.join(USER_JSON))?;
    Ok(user
        .get("userName")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned))
}

pub fn save_user_name(config_dir: &Path, user_name: &str) -> Result<(), InfraError> {
    let user_name = user_name.trim();
    if user_name.is_empty() {
        return Err(InfraError::InvalidConfig(
            "userName must not be empty".to_string(),
        ));
    }
    update_config(&config_dir.join(USER_JSON), |object| {
        object.insert(
            "userName".to_string(),
            serde_json::Value::String(user_name.to_string()),
        );
    })
}

pub fn load_goals(config_dir: &Path) -> Result<Goals, InfraError> {
    let goals = read_config(&config_dir.join(GOALS_JSON))?;
    serde_json::from_value(goals).map_err(InfraError::from)
}

pub fn save_goals(config_dir: &Path, goals: &Goals) -> Result<(), InfraError> {
    update_config(&config_dir.join(GOALS_JSON), |object| {
        object.insert("minHours".to_string(), goals.min_hours.into());
        object.insert("targetHours".to_string(), goals.target_hours.into());
    })
}

pub fn load_last_settings(config_dir: &Path) -> Result<LastSettings, InfraError> {
    let settings = read_config(&config_dir.join(SETTINGS_JSON))?;
    serde_json::from_value(settings).map_err(InfraError::from)
}

pub fn save_last_settings(config_dir: &Path, settings: &LastSettings) -> Result<(), InfraError> {
    update_config(&config_dir.join(SETTINGS_JSON), |object| {
        object.insert(
            "targetTime".to_string(),
            serde_json::Value::String(settings.target_time.clone()),
        );
        object.insert(
            "condition".to_string(),
            serde_json::Value::String(settings.condition.clone()),
        );
        object.insert(
            "comment".to_string(),
            serde_json::Value::String(settings.comment.clone()),
        );
        object.insert(
            "location".to_string(),
            serde_json::Value::String(settings.location.clone()),
        );
    })
}
