use crate::domain::models::{MasterData, StudyRecord};
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordAction {
    Create,
    Update,
    Delete,
}

impl RecordAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FetchRecordsResponse {
    pub records: Vec<StudyRecord>,
    pub master_data: MasterData,
}

#[async_trait]
pub trait RecordApi: Send + Sync {
    async fn fetch_records(&self, user_name: &str) -> Result<FetchRecordsResponse, InfraError>;

    /// Best-effort write. The remote store runs in cross-origin write mode,
    /// so the response is opaque; only transport success is reported and
    /// true success is inferred from a later refetch.
    async fn submit_record(
        &self,
        action: RecordAction,
        record: &StudyRecord,
    ) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestRecordApi {
    client: Client,
    endpoint: Url,
}

impl ReqwestRecordApi {
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: Client::new(),
            endpoint,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FetchPayload {
    records: Option<Vec<StudyRecord>>,
    #[serde(rename = "masterData")]
    master_data: Option<MasterData>,
}

#[async_trait]
impl RecordApi for ReqwestRecordApi {
    async fn fetch_records(&self, user_name: &str) -> Result<FetchRecordsResponse, InfraError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[("userName", user_name)])
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .send()
            .await
            .map_err(|error| {
                InfraError::Network(format!("network error while fetching records: {error}"))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            InfraError::Network(format!("failed reading records response: {error}"))
        })?;

        if !status.is_success() {
            return Err(InfraError::Network(format!(
                "record api error: http {}",
                status.as_u16()
            )));
        }

        let parsed: FetchPayload = serde_json::from_str(&body).map_err(|error| {
            InfraError::Parse(format!("invalid records payload: {error}; body={body}"))
        })?;

        let records = parsed
            .records
            .unwrap_or_default()
            .into_iter()
            .map(normalize_record)
            .collect();

        Ok(FetchRecordsResponse {
            records,
            master_data: parsed.master_data.unwrap_or_default(),
        })
    }

    async fn submit_record(
        &self,
        action: RecordAction,
        record: &StudyRecord,
    ) -> Result<(), InfraError> {
        let form = record_form_params(action, record);
        self.client
            .post(self.endpoint.clone())
            .form(&form)
            .send()
            .await
            .map_err(|error| {
                InfraError::Network(format!("network error while submitting record: {error}"))
            })?;
        // the write response cannot be observed; a delivered request is all
        // there is to confirm
        Ok(())
    }
}

/// Form fields for a mutation request. Empty strings are sent as-is; only a
/// missing id is skipped (the remote assigns one on create).
fn record_form_params(action: RecordAction, record: &StudyRecord) -> Vec<(&'static str, String)> {
    let mut params = vec![("action", action.as_str().to_string())];
    if let Some(id) = record.id.as_deref() {
        params.push(("id", id.to_string()));
    }
    params.push(("userName", record.user_name.clone()));
    params.push(("date", record.date.clone()));
    params.push(("startTime", record.start_time.clone()));
    params.push(("endTime", record.end_time.clone()));
    params.push(("duration", record.duration.to_string()));
    params.push(("category", record.category.clone()));
    params.push(("content", record.content.clone()));
    params.push(("enthusiasm", record.enthusiasm.clone()));
    params.push(("condition", record.condition.clone()));
    params.push(("comment", record.comment.clone()));
    params.push(("location", record.location.clone()));
    params
}

/// The sheet backend hands dates and clock times back as ISO datetimes;
/// bring them back to the stored `YYYY/MM/DD` and `HH:MM` forms.
fn normalize_record(mut record: StudyRecord) -> StudyRecord {
    record.date = normalize_date(&record.date);
    record.start_time = normalize_time(&record.start_time);
    record.end_time = normalize_time(&record.end_time);
    record
}

fn normalize_date(raw: &str) -> String {
    if raw.contains('T') {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return parsed.format("%Y/%m/%d").to_string();
        }
    }
    raw.trim()
        .split([' ', 'T'])
        .next()
        .unwrap_or("")
        .replace('-', "/")
}

fn normalize_time(raw: &str) -> String {
    if raw.contains('T') {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return parsed.format("%H:%M").to_string();
        }
    }
    raw.to_string()
}
