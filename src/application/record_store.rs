//! Optimistic local mirror over the remote record store.
//!
//! The remote is the system of record but its write responses are opaque,
//! so every mutation follows the same shape: mutate the remote
//! best-effort, then reconcile by refetching the whole partition after a
//! short delay. Creates additionally append to the local mirror up front;
//! a failed transport does not roll that back, which leaves a known
//! divergence window until the next successful refetch.

use crate::domain::day_boundary::{belonging_date, expand_records, logical_date_now, parse_day_label};
use crate::domain::models::{MasterData, StudyRecord, minutes_of_day};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::mirror_repository::MirrorRepository;
use crate::infrastructure::record_api::{RecordAction, RecordApi};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio::time::{Duration as TokioDuration, sleep};

const REFETCH_DELAY_MS: u64 = 1_500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationPeriod {
    Day,
    Week,
    Month,
}

/// Minutes per category within one day/week/month bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodAggregate {
    pub label: String,
    pub minutes_by_category: BTreeMap<String, i64>,
    pub total_minutes: i64,
}

pub struct RecordStore<A: RecordApi, M: MirrorRepository> {
    api: Arc<A>,
    mirror: Arc<M>,
    records: Mutex<Vec<StudyRecord>>,
    master_data: Mutex<MasterData>,
    refetch_task: Mutex<Option<JoinHandle<()>>>,
    refetch_delay: TokioDuration,
}

impl<A, M> RecordStore<A, M>
where
    A: RecordApi + 'static,
    M: MirrorRepository + 'static,
{
    pub fn new(api: Arc<A>, mirror: Arc<M>) -> Self {
        Self {
            api,
            mirror,
            records: Mutex::new(Vec::new()),
            master_data: Mutex::new(MasterData::default()),
            refetch_task: Mutex::new(None),
            refetch_delay: TokioDuration::from_millis(REFETCH_DELAY_MS),
        }
    }

    pub fn with_refetch_delay(mut self, delay: TokioDuration) -> Self {
        self.refetch_delay = delay;
        self
    }

    /// Seed the in-memory mirror from the durable copy. Returns the number
    /// of records restored.
    pub fn load_cached(&self) -> Result<usize, InfraError> {
        let Some(cached) = self.mirror.load()? else {
            return Ok(0);
        };
        let count = cached.len();
        *self.lock_records()? = cached;
        Ok(count)
    }

    /// Optimistic create: the mirror grows immediately, the remote write is
    /// best-effort, and a scheduled refetch picks up the server-assigned id.
    pub async fn create(self: &Arc<Self>, record: StudyRecord) -> Result<(), InfraError> {
        record.validate().map_err(InfraError::Validation)?;

        {
            let mut records = self.lock_records()?;
            records.push(record.clone());
            self.mirror.save(&records)?;
        }

        self.api.submit_record(RecordAction::Create, &record).await?;
        self.schedule_refetch(record.user_name);
        Ok(())
    }

    /// No optimistic patch: the mirror only reflects the change once the
    /// scheduled refetch lands.
    pub async fn update(self: &Arc<Self>, record: StudyRecord) -> Result<(), InfraError> {
        let id = record.id.as_deref().map(str::trim).unwrap_or_default();
        if id.is_empty() {
            return Err(InfraError::Validation(
                "record id is required for update".to_string(),
            ));
        }
        self.require_known_id(id)?;

        self.api.submit_record(RecordAction::Update, &record).await?;
        self.schedule_refetch(record.user_name);
        Ok(())
    }

    pub async fn delete(self: &Arc<Self>, id: &str, user_name: &str) -> Result<(), InfraError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(InfraError::Validation(
                "record id is required for delete".to_string(),
            ));
        }
        self.require_known_id(id)?;

        // a delete only carries the id, the rest of the row stays remote
        let tombstone = StudyRecord {
            id: Some(id.to_string()),
            user_name: user_name.to_string(),
            ..StudyRecord::default()
        };
        self.api
            .submit_record(RecordAction::Delete, &tombstone)
            .await?;
        self.schedule_refetch(user_name.to_string());
        Ok(())
    }

    /// Authoritative wholesale replacement of the mirror and master data.
    pub async fn refetch_all(&self, user_name: &str) -> Result<Vec<StudyRecord>, InfraError> {
        let response = self.api.fetch_records(user_name).await?;
        {
            let mut records = self.lock_records()?;
            *records = response.records.clone();
            self.mirror.save(&records)?;
        }
        *self.lock_master_data()? = response.master_data;
        Ok(response.records)
    }

    /// Queue the delayed reconciliation refetch. A newer schedule replaces
    /// the stored handle; a superseded task may still run, and the last
    /// refetch wins by wholesale replacement.
    pub fn schedule_refetch(self: &Arc<Self>, user_name: String) {
        let store = Arc::clone(self);
        let delay = self.refetch_delay;
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            // reconciliation is best-effort; on failure the optimistic
            // state stays put until the next refetch
            let _ = store.refetch_all(&user_name).await;
        });
        if let Ok(mut slot) = self.refetch_task.lock() {
            *slot = Some(handle);
        }
    }

    pub fn cancel_scheduled_refetch(&self) {
        if let Ok(mut slot) = self.refetch_task.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }

    pub fn records(&self) -> Result<Vec<StudyRecord>, InfraError> {
        Ok(self.lock_records()?.clone())
    }

    /// Mirror contents sorted newest-first by start moment, for history
    /// listings.
    pub fn sorted_records(&self) -> Result<Vec<StudyRecord>, InfraError> {
        let mut records = self.records()?;
        records.sort_by_key(|record| std::cmp::Reverse(start_sort_key(record)));
        Ok(records)
    }

    pub fn expanded_records(&self) -> Result<Vec<StudyRecord>, InfraError> {
        Ok(expand_records(&self.lock_records()?))
    }

    pub fn master_data(&self) -> Result<MasterData, InfraError> {
        Ok(self.lock_master_data()?.clone())
    }

    /// Total minutes attributed to the current logical day, with
    /// boundary-crossing sessions split first.
    pub fn today_total_minutes(&self, now: DateTime<Utc>, time_zone: Tz) -> Result<i64, InfraError> {
        let today = logical_date_now(now, time_zone);
        Ok(expand_records(&self.lock_records()?)
            .iter()
            .filter(|record| belonging_date(&record.date, Some(&record.start_time)) == today)
            .map(|record| record.duration)
            .sum())
    }

    /// Expanded records whose belonging date falls inside the day, the
    /// Sunday-started week, or the month containing `view_date`.
    pub fn records_for_period(
        &self,
        period: AggregationPeriod,
        view_date: NaiveDate,
    ) -> Result<Vec<StudyRecord>, InfraError> {
        let expanded = expand_records(&self.lock_records()?);
        Ok(expanded
            .into_iter()
            .filter(|record| {
                let label = belonging_date(&record.date, Some(&record.start_time));
                let Some(belongs) = parse_day_label(&label) else {
                    return false;
                };
                match period {
                    AggregationPeriod::Day => belongs == view_date,
                    AggregationPeriod::Week => {
                        let week_start = sunday_of(view_date);
                        belongs >= week_start && belongs < week_start + Duration::days(7)
                    }
                    AggregationPeriod::Month => {
                        belongs.year() == view_date.year() && belongs.month() == view_date.month()
                    }
                }
            })
            .collect())
    }

    /// Stacked per-category minutes, grouped into period buckets by
    /// belonging date and sorted by label. Records whose stored date never
    /// parses are left out rather than invented.
    pub fn aggregate(&self, period: AggregationPeriod) -> Result<Vec<PeriodAggregate>, InfraError> {
        let expanded = expand_records(&self.lock_records()?);
        let mut buckets: BTreeMap<String, BTreeMap<String, i64>> = BTreeMap::new();

        for record in &expanded {
            let label = belonging_date(&record.date, Some(&record.start_time));
            let Some(belongs) = parse_day_label(&label) else {
                continue;
            };
            let bucket_label = period_label(period, belongs);
            let bucket = buckets.entry(bucket_label).or_default();
            *bucket.entry(record.category.clone()).or_insert(0) += record.duration;
        }

        Ok(buckets
            .into_iter()
            .map(|(label, minutes_by_category)| {
                let total_minutes = minutes_by_category.values().sum();
                PeriodAggregate {
                    label,
                    minutes_by_category,
                    total_minutes,
                }
            })
            .collect())
    }

    fn require_known_id(&self, id: &str) -> Result<(), InfraError> {
        let records = self.lock_records()?;
        if !records
            .iter()
            .any(|record| record.id.as_deref() == Some(id))
        {
            return Err(InfraError::NotFound(format!("record not found: {id}")));
        }
        Ok(())
    }

    fn lock_records(&self) -> Result<MutexGuard<'_, Vec<StudyRecord>>, InfraError> {
        self.records
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("record lock poisoned: {error}")))
    }

    fn lock_master_data(&self) -> Result<MutexGuard<'_, MasterData>, InfraError> {
        self.master_data
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("master data lock poisoned: {error}")))
    }
}

fn period_label(period: AggregationPeriod, date: NaiveDate) -> String {
    match period {
        AggregationPeriod::Day => date.format("%Y/%m/%d").to_string(),
        AggregationPeriod::Week => {
            let week = date.iso_week();
            format!("{}-W{:02}", week.year(), week.week())
        }
        AggregationPeriod::Month => date.format("%Y/%m").to_string(),
    }
}

fn sunday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_sunday()))
}

fn start_sort_key(record: &StudyRecord) -> (NaiveDate, i64) {
    let date = parse_day_label(&record.date).unwrap_or(NaiveDate::MIN);
    let minutes = minutes_of_day(&record.start_time).unwrap_or(0);
    (date, minutes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mirror_repository::InMemoryMirrorRepository;
    use crate::infrastructure::record_api::FetchRecordsResponse;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone)]
    enum FakeFetchResponse {
        Success(FetchRecordsResponse),
        NetworkError,
    }

    #[derive(Default)]
    struct FakeRecordApi {
        fetch_responses: Mutex<VecDeque<FakeFetchResponse>>,
        fetch_calls: AtomicUsize,
        submits: Mutex<Vec<(RecordAction, StudyRecord)>>,
        fail_submits: bool,
    }

    impl FakeRecordApi {
        fn with_fetch_responses(responses: Vec<FakeFetchResponse>) -> Self {
            Self {
                fetch_responses: Mutex::new(responses.into()),
                ..Self::default()
            }
        }

        fn failing_submits() -> Self {
            Self {
                fail_submits: true,
                ..Self::default()
            }
        }

        fn submitted(&self) -> Vec<(RecordAction, StudyRecord)> {
            self.submits.lock().expect("submit lock").clone()
        }
    }

    #[async_trait]
    impl RecordApi for FakeRecordApi {
        async fn fetch_records(
            &self,
            _user_name: &str,
        ) -> Result<FetchRecordsResponse, InfraError> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            let response = self
                .fetch_responses
                .lock()
                .expect("fetch response lock")
                .pop_front()
                .unwrap_or(FakeFetchResponse::Success(FetchRecordsResponse::default()));
            match response {
                FakeFetchResponse::Success(value) => Ok(value),
                FakeFetchResponse::NetworkError => Err(InfraError::Network(
                    "network error while fetching records".to_string(),
                )),
            }
        }

        async fn submit_record(
            &self,
            action: RecordAction,
            record: &StudyRecord,
        ) -> Result<(), InfraError> {
            if self.fail_submits {
                return Err(InfraError::Network(
                    "network error while submitting record".to_string(),
                ));
            }
            self.submits
                .lock()
                .expect("submit lock")
                .push((action, record.clone()));
            Ok(())
        }
    }

    fn sample_record(id: Option<&str>, date: &str, start: &str, end: &str, duration: i64) -> StudyRecord {
        StudyRecord {
            id: id.map(ToOwned::to_owned),
            date: date.to_string(),
            user_name: "mika".to_string(),
            start_time: start.to_string(),
            end_time: end.to_string(),
            duration,
            category: "Programming".to_string(),
            content: "Rust".to_string(),
            ..StudyRecord::default()
        }
    }

    fn store_with(api: FakeRecordApi) -> Arc<RecordStore<FakeRecordApi, InMemoryMirrorRepository>> {
        Arc::new(
            RecordStore::new(Arc::new(api), Arc::new(InMemoryMirrorRepository::default()))
                .with_refetch_delay(TokioDuration::from_millis(5)),
        )
    }

    #[tokio::test]
    async fn create_appends_optimistically_and_submits() {
        let remote = sample_record(Some("rec-1"), "2026/03/09", "21:00", "22:00", 60);
        let store = store_with(FakeRecordApi::with_fetch_responses(vec![
            FakeFetchResponse::Success(FetchRecordsResponse {
                records: vec![remote.clone()],
                master_data: MasterData::default(),
            }),
        ]));

        let pending = sample_record(None, "2026/03/09", "21:00", "22:00", 60);
        store.create(pending.clone()).await.expect("create");

        // optimistic append lands before any refetch
        let records = store.records().expect("records");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, None);

        let submits = store.api.submitted();
        assert_eq!(submits.len(), 1);
        assert_eq!(submits[0].0, RecordAction::Create);

        // the scheduled refetch replaces the mirror and carries the id back
        sleep(TokioDuration::from_millis(50)).await;
        let records = store.records().expect("records");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id.as_deref(), Some("rec-1"));
        assert_eq!(store.api.fetch_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn create_with_blank_category_leaves_mirror_untouched() {
        let store = store_with(FakeRecordApi::default());
        let mut record = sample_record(None, "2026/03/09", "21:00", "22:00", 60);
        record.category = " ".to_string();

        let result = store.create(record).await;
        assert!(matches!(result, Err(InfraError::Validation(_))));
        assert_eq!(store.records().expect("records").len(), 0);
        assert!(store.api.submitted().is_empty());
        assert_eq!(store.mirror.load().expect("mirror"), None);
    }

    #[tokio::test]
    async fn create_network_failure_keeps_the_optimistic_append() {
        let store = store_with(FakeRecordApi::failing_submits());
        let record = sample_record(None, "2026/03/09", "21:00", "22:00", 60);

        let result = store.create(record).await;
        assert!(matches!(result, Err(InfraError::Network(_))));

        // the local mirror is deliberately NOT rolled back
        assert_eq!(store.records().expect("records").len(), 1);
        assert_eq!(
            store.mirror.load().expect("mirror").map(|cached| cached.len()),
            Some(1)
        );
        // no reconciliation is scheduled after a failed transport
        sleep(TokioDuration::from_millis(30)).await;
        assert_eq!(store.api.fetch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn update_requires_a_known_id() {
        let store = store_with(FakeRecordApi::default());
        let mut record = sample_record(Some("missing"), "2026/03/09", "21:00", "22:00", 60);

        let result = store.update(record.clone()).await;
        assert!(matches!(result, Err(InfraError::NotFound(_))));
        assert!(store.api.submitted().is_empty());

        record.id = None;
        assert!(matches!(
            store.update(record).await,
            Err(InfraError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn update_submits_without_patching_locally() {
        let known = sample_record(Some("rec-1"), "2026/03/09", "21:00", "22:00", 60);
        let store = store_with(FakeRecordApi::with_fetch_responses(vec![
            FakeFetchResponse::Success(FetchRecordsResponse {
                records: vec![known.clone()],
                master_data: MasterData::default(),
            }),
        ]));
        store.refetch_all("mika").await.expect("seed mirror");

        let mut edited = known.clone();
        edited.comment = "revised".to_string();
        store.update(edited).await.expect("update");

        // local mirror is untouched until the refetch lands
        assert_eq!(store.records().expect("records")[0].comment, "");
        let submits = store.api.submitted();
        assert_eq!(submits.len(), 1);
        assert_eq!(submits[0].0, RecordAction::Update);
    }

    #[tokio::test]
    async fn delete_sends_a_tombstone_with_only_the_id() {
        let known = sample_record(Some("rec-1"), "2026/03/09", "21:00", "22:00", 60);
        let store = store_with(FakeRecordApi::with_fetch_responses(vec![
            FakeFetchResponse::Success(FetchRecordsResponse {
                records: vec![known],
                master_data: MasterData::default(),
            }),
        ]));
        store.refetch_all("mika").await.expect("seed mirror");

        store.delete("rec-1", "mika").await.expect("delete");
        let submits = store.api.submitted();
        assert_eq!(submits[0].0, RecordAction::Delete);
        assert_eq!(submits[0].1.id.as_deref(), Some("rec-1"));
        assert_eq!(submits[0].1.category, "");

        assert!(matches!(
            store.delete("ghost", "mika").await,
            Err(InfraError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn refetch_replaces_the_mirror_wholesale() {
        let first = FetchRecordsResponse {
            records: vec![
                sample_record(Some("rec-1"), "2026/03/09", "21:00", "22:00", 60),
                sample_record(Some("rec-2"), "2026/03/10", "09:00", "09:30", 30),
            ],
            master_data: MasterData {
                support_messages: vec!["keep going".to_string()],
                ..MasterData::default()
            },
        };
        let second = FetchRecordsResponse {
            records: vec![sample_record(Some("rec-2"), "2026/03/10", "09:00", "09:30", 30)],
            master_data: MasterData::default(),
        };
        let store = store_with(FakeRecordApi::with_fetch_responses(vec![
            FakeFetchResponse::Success(first),
            FakeFetchResponse::Success(second),
        ]));

        store.refetch_all("mika").await.expect("first refetch");
        assert_eq!(store.records().expect("records").len(), 2);
        assert_eq!(
            store.master_data().expect("master data").support_messages,
            vec!["keep going".to_string()]
        );

        store.refetch_all("mika").await.expect("second refetch");
        assert_eq!(store.records().expect("records").len(), 1);
        assert_eq!(
            store.mirror.load().expect("mirror").map(|cached| cached.len()),
            Some(1)
        );
    }

    #[tokio::test]
    async fn refetch_failure_leaves_the_mirror_alone() {
        let seeded = FetchRecordsResponse {
            records: vec![sample_record(Some("rec-1"), "2026/03/09", "21:00", "22:00", 60)],
            master_data: MasterData::default(),
        };
        let store = store_with(FakeRecordApi::with_fetch_responses(vec![
            FakeFetchResponse::Success(seeded),
            FakeFetchResponse::NetworkError,
        ]));
        store.refetch_all("mika").await.expect("seed mirror");

        let result = store.refetch_all("mika").await;
        assert!(matches!(result, Err(InfraError::Network(_))));
        assert_eq!(store.records().expect("records").len(), 1);
    }

    #[tokio::test]
    async fn load_cached_restores_the_durable_mirror() {
        let mirror = Arc::new(InMemoryMirrorRepository::default());
        mirror
            .save(&[sample_record(Some("rec-1"), "2026/03/09", "21:00", "22:00", 60)])
            .expect("seed durable mirror");
        let store = Arc::new(RecordStore::new(
            Arc::new(FakeRecordApi::default()),
            mirror,
        ));

        assert_eq!(store.load_cached().expect("load cached"), 1);
        assert_eq!(store.records().expect("records").len(), 1);
    }

    #[tokio::test]
    async fn today_total_splits_boundary_sessions() {
        let store = store_with(FakeRecordApi::default());
        {
            let mut records = store.records.lock().expect("records lock");
            // 10:00-11:00 on the 10th: fully today
            records.push(sample_record(Some("rec-1"), "2026/03/10", "10:00", "11:00", 60));
            // 02:00-05:00 on the 10th: 120 min belong to the 9th, 60 to the 10th
            records.push(sample_record(Some("rec-2"), "2026/03/10", "02:00", "05:00", 180));
        }

        let now = DateTime::parse_from_rfc3339("2026-03-10T22:00:00Z")
            .expect("valid datetime")
            .with_timezone(&Utc);
        assert_eq!(
            store.today_total_minutes(now, chrono_tz::UTC).expect("total"),
            120
        );

        let yesterday = DateTime::parse_from_rfc3339("2026-03-10T02:30:00Z")
            .expect("valid datetime")
            .with_timezone(&Utc);
        // 02:30 still belongs to the 9th, which holds the before-half
        assert_eq!(
            store
                .today_total_minutes(yesterday, chrono_tz::UTC)
                .expect("total"),
            120
        );
    }

    #[tokio::test]
    async fn aggregate_groups_by_belonging_date() {
        let store = store_with(FakeRecordApi::default());
        {
            let mut records = store.records.lock().expect("records lock");
            records.push(sample_record(Some("rec-1"), "2026/03/09", "21:00", "22:00", 60));
            let mut language = sample_record(Some("rec-2"), "2026/03/09", "22:00", "22:30", 30);
            language.category = "Language".to_string();
            records.push(language);
            // crosses the boundary: 90 min on the 9th, 30 on the 10th
            records.push(sample_record(Some("rec-3"), "2026/03/10", "02:30", "04:30", 120));
        }

        let days = store.aggregate(AggregationPeriod::Day).expect("aggregate");
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].label, "2026/03/09");
        assert_eq!(days[0].total_minutes, 180);
        assert_eq!(days[0].minutes_by_category["Programming"], 150);
        assert_eq!(days[0].minutes_by_category["Language"], 30);
        assert_eq!(days[1].label, "2026/03/10");
        assert_eq!(days[1].total_minutes, 30);

        let months = store.aggregate(AggregationPeriod::Month).expect("aggregate");
        assert_eq!(months.len(), 1);
        assert_eq!(months[0].label, "2026/03");
        assert_eq!(months[0].total_minutes, 210);
    }

    #[tokio::test]
    async fn records_for_period_filters_by_window() {
        let store = store_with(FakeRecordApi::default());
        {
            let mut records = store.records.lock().expect("records lock");
            records.push(sample_record(Some("rec-1"), "2026/03/09", "21:00", "22:00", 60));
            records.push(sample_record(Some("rec-2"), "2026/03/02", "09:00", "10:00", 60));
            records.push(sample_record(Some("rec-3"), "2026/02/20", "09:00", "10:00", 60));
        }

        let view_date = NaiveDate::from_ymd_opt(2026, 3, 9).expect("valid date");
        let day = store
            .records_for_period(AggregationPeriod::Day, view_date)
            .expect("day");
        assert_eq!(day.len(), 1);

        // week of Sunday 2026-03-08 .. Saturday 2026-03-14
        let week = store
            .records_for_period(AggregationPeriod::Week, view_date)
            .expect("week");
        assert_eq!(week.len(), 1);

        let month = store
            .records_for_period(AggregationPeriod::Month, view_date)
            .expect("month");
        assert_eq!(month.len(), 2);
    }

    #[tokio::test]
    async fn sorted_records_run_newest_first() {
        let store = store_with(FakeRecordApi::default());
        {
            let mut records = store.records.lock().expect("records lock");
            records.push(sample_record(Some("rec-1"), "2026/03/09", "21:00", "22:00", 60));
            records.push(sample_record(Some("rec-2"), "2026/03/10", "08:00", "09:00", 60));
            records.push(sample_record(Some("rec-3"), "2026/03/09", "23:00", "23:30", 30));
        }

        let sorted = store.sorted_records().expect("sorted");
        let ids: Vec<_> = sorted
            .iter()
            .map(|record| record.id.as_deref().unwrap_or(""))
            .collect();
        assert_eq!(ids, vec!["rec-2", "rec-3", "rec-1"]);
    }

    #[tokio::test]
    async fn cancel_prevents_a_scheduled_refetch() {
        let store = store_with(FakeRecordApi::default());
        store.schedule_refetch("mika".to_string());
        store.cancel_scheduled_refetch();
        sleep(TokioDuration::from_millis(30)).await;
        assert_eq!(store.api.fetch_calls.load(Ordering::SeqCst), 0);
    }
}
