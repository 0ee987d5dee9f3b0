use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Marker set on view-time halves of a record split at the 4 AM boundary.
/// Never serialized; the stored record is always the unsplit original.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SplitPart {
    Before,
    After,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct StudyRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub date: String,
    pub user_name: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(deserialize_with = "minutes_from_value")]
    pub duration: i64,
    pub category: String,
    pub content: String,
    pub enthusiasm: String,
    pub condition: String,
    pub comment: String,
    pub location: String,
    #[serde(skip)]
    pub split: Option<SplitPart>,
}

impl StudyRecord {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.category, "record.category")?;
        validate_non_empty(&self.content, "record.content")?;
        validate_date(&self.date, "record.date")?;
        validate_hhmm(&self.start_time, "record.startTime")?;
        validate_hhmm(&self.end_time, "record.endTime")?;
        if self.duration < 0 {
            return Err("record.duration must be >= 0".to_string());
        }
        Ok(())
    }
}

/// Remote-owned suggestion vocabularies and message pools, refreshed
/// alongside every record refetch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct MasterData {
    pub categories: Vec<String>,
    pub contents: Vec<String>,
    pub enthusiasms: Vec<String>,
    pub comments: Vec<String>,
    pub locations: Vec<String>,
    pub support_messages: Vec<String>,
    pub finish_messages: Vec<String>,
}

// Sheet-backed stores hand duration back as a number, a numeric string, or
// an empty cell; anything unreadable counts as zero minutes.
fn minutes_from_value<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float.round() as i64))
            .unwrap_or(0),
        serde_json::Value::String(raw) => raw
            .trim()
            .parse::<f64>()
            .map(|float| float.round() as i64)
            .unwrap_or(0),
        _ => 0,
    })
}

pub fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

pub fn validate_hhmm(value: &str, field_name: &str) -> Result<(), String> {
    if parse_hhmm(value).is_none() {
        return Err(format!("{field_name} must be HH:MM"));
    }
    Ok(())
}

pub fn validate_date(value: &str, field_name: &str) -> Result<(), String> {
    NaiveDate::parse_from_str(value, "%Y/%m/%d")
        .map_err(|_| format!("{field_name} must be YYYY/MM/DD"))?;
    Ok(())
}

pub fn parse_hhmm(value: &str) -> Option<(u32, u32)> {
    let mut split = value.split(':');
    let hour = split.next()?.trim().parse::<u32>().ok()?;
    let minute = split.next()?.trim().parse::<u32>().ok()?;
    if split.next().is_some() || hour > 23 || minute > 59 {
        return None;
    }
    Some((hour, minute))
}

/// Minutes into the day for an `HH:MM` clock string.
pub fn minutes_of_day(value: &str) -> Option<i64> {
    let (hour, minute) = parse_hhmm(value)?;
    Some(i64::from(hour) * 60 + i64::from(minute))
}

/// `end - start` in minutes, wrapping past midnight when the end clock
/// time is earlier than the start.
pub fn span_minutes(start_time: &str, end_time: &str) -> Option<i64> {
    let start = minutes_of_day(start_time)?;
    let end = minutes_of_day(end_time)?;
    let mut span = end - start;
    if span < 0 {
        span += 24 * 60;
    }
    Some(span)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> StudyRecord {
        StudyRecord {
            id: Some("rec-1".to_string()),
            date: "2026/03/09".to_string(),
            user_name: "mika".to_string(),
            start_time: "21:10".to_string(),
            end_time: "22:40".to_string(),
            duration: 90,
            category: "Programming".to_string(),
            content: "Rust".to_string(),
            enthusiasm: "deep focus".to_string(),
            condition: "good".to_string(),
            comment: "steady".to_string(),
            location: "home".to_string(),
            split: None,
        }
    }

    #[test]
    fn validate_accepts_complete_record() {
        assert!(sample_record().validate().is_ok());
    }

    #[test]
    fn validate_rejects_blank_category() {
        let mut record = sample_record();
        record.category = "   ".to_string();
        assert!(record.validate().is_err());
    }

    #[test]
    fn validate_rejects_malformed_time() {
        let mut record = sample_record();
        record.start_time = "25:00".to_string();
        assert!(record.validate().is_err());
    }

    #[test]
    fn validate_rejects_negative_duration() {
        let mut record = sample_record();
        record.duration = -5;
        assert!(record.validate().is_err());
    }

    #[test]
    fn record_serde_roundtrip_uses_wire_names() {
        let record = sample_record();
        let json = serde_json::to_string(&record).expect("serialize record");
        assert!(json.contains("\"userName\""));
        assert!(json.contains("\"startTime\""));
        let roundtrip: StudyRecord = serde_json::from_str(&json).expect("deserialize record");
        assert_eq!(roundtrip, record);
    }

    #[test]
    fn missing_id_is_not_serialized() {
        let mut record = sample_record();
        record.id = None;
        let json = serde_json::to_string(&record).expect("serialize record");
        assert!(!json.contains("\"id\""));
    }

    #[test]
    fn duration_deserializes_from_string_and_empty_cell() {
        let from_string: StudyRecord =
            serde_json::from_str(r#"{"duration":"45"}"#).expect("numeric string");
        assert_eq!(from_string.duration, 45);
        let from_empty: StudyRecord =
            serde_json::from_str(r#"{"duration":""}"#).expect("empty cell");
        assert_eq!(from_empty.duration, 0);
        let from_number: StudyRecord =
            serde_json::from_str(r#"{"duration":30}"#).expect("plain number");
        assert_eq!(from_number.duration, 30);
    }

    #[test]
    fn span_minutes_wraps_past_midnight() {
        assert_eq!(span_minutes("09:00", "10:30"), Some(90));
        assert_eq!(span_minutes("23:30", "00:30"), Some(60));
        assert_eq!(span_minutes("10:00", "10:00"), Some(0));
        assert_eq!(span_minutes("", "10:00"), None);
    }
}
