//! Collaborator-facing command layer. The UI calls the `*_impl` functions
//! and reads their response structs; all wiring between the timer, the
//! record store, and the config files happens here.

use crate::application::bootstrap::bootstrap_workspace;
use crate::application::record_store::{AggregationPeriod, PeriodAggregate, RecordStore};
use crate::application::session_timer::{CommitFields, SessionTimer, TimerPhase};
use crate::domain::day_boundary::{logical_date_now, parse_day_label};
use crate::domain::messages::{
    DEFAULT_FINISH_MESSAGES, pick_support_message, select_finish_message,
};
use crate::domain::models::{StudyRecord, span_minutes};
use crate::infrastructure::config::{
    Goals, LastSettings, load_goals, load_last_settings, read_message_interval_seconds,
    read_recorder_url, read_timezone, read_user_name, save_goals, save_last_settings,
    save_message_interval_seconds, save_user_name,
};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::mirror_repository::SqliteMirrorRepository;
use crate::infrastructure::record_api::ReqwestRecordApi;
use crate::infrastructure::snapshot_repository::SqliteSnapshotRepository;
use chrono::Utc;
use chrono_tz::Tz;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio::time::{Duration as TokioDuration, sleep};
use url::Url;

const HEARTBEAT_INTERVAL_SECONDS: u64 = 60;

pub struct AppState {
    config_dir: PathBuf,
    database_path: PathBuf,
    logs_dir: PathBuf,
    time_zone: Tz,
    timer: SessionTimer<SqliteSnapshotRepository>,
    store: Arc<RecordStore<ReqwestRecordApi, SqliteMirrorRepository>>,
    message_interval_seconds: Mutex<u64>,
    session_messages: Mutex<Vec<String>>,
    current_support_message: Mutex<String>,
    ticks: Mutex<TickTasks>,
    log_guard: Mutex<()>,
}

#[derive(Debug, Default)]
struct TickTasks {
    heartbeat: Option<JoinHandle<()>>,
    rotation: Option<JoinHandle<()>>,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let config_dir = workspace_root.join("config");
        let logs_dir = workspace_root.join("logs");

        let recorder_url = read_recorder_url(&config_dir)?;
        let endpoint = Url::parse(&recorder_url).map_err(|error| {
            InfraError::InvalidConfig(format!("invalid recorderUrl '{recorder_url}': {error}"))
        })?;
        let time_zone = read_timezone(&config_dir)?;
        let message_interval_seconds = read_message_interval_seconds(&config_dir)?;

        let snapshots = Arc::new(SqliteSnapshotRepository::new(&bootstrap.database_path));
        let timer = SessionTimer::new(snapshots, time_zone);
        let store = Arc::new(RecordStore::new(
            Arc::new(ReqwestRecordApi::new(endpoint)),
            Arc::new(SqliteMirrorRepository::new(&bootstrap.database_path)),
        ));

        let state = Self {
            config_dir,
            database_path: bootstrap.database_path,
            logs_dir,
            time_zone,
            timer,
            store,
            message_interval_seconds: Mutex::new(message_interval_seconds),
            session_messages: Mutex::new(Vec::new()),
            current_support_message: Mutex::new(String::new()),
            ticks: Mutex::new(TickTasks::default()),
            log_guard: Mutex::new(()),
        };

        let restored = state.store.load_cached()?;
        if restored > 0 {
            state.log_info("bootstrap", &format!("restored {restored} cached records"));
        }
        if state.timer.recover()? {
            state.log_info("bootstrap", "recovered a running study session");
        }
        Ok(state)
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        self.log_error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        self.append_log("info", command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
        self.append_log("error", command, message);
    }

    fn append_log(&self, level: &str, command: &str, message: &str) {
        let Ok(_guard) = self.log_guard.lock() else {
            return;
        };
        let path = self.logs_dir.join("commands.log");
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", payload);
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InitResponse {
    pub resumed_session: bool,
    pub records_loaded: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TimerStateResponse {
    pub phase: String,
    pub elapsed_seconds: i64,
    pub start_time: Option<String>,
    pub category: String,
    pub content: String,
    pub location: String,
    pub support_message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinishStudyResponse {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub duration_minutes: i64,
    pub category: String,
    pub content: String,
    pub location: String,
    pub today_total_minutes: i64,
    pub finish_message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ManualRecordInput {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub category: String,
    pub content: String,
    pub enthusiasm: String,
    pub condition: String,
    pub comment: String,
    pub location: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GoalProgressResponse {
    pub today_minutes: i64,
    pub min_hours: u32,
    pub target_hours: u32,
    pub min_reached: bool,
    pub target_reached: bool,
}

/// Resume ticking for a recovered session and run the initial refetch.
/// Offline start is tolerated: the cached mirror keeps serving reads.
pub async fn init_impl(state: &Arc<AppState>) -> Result<InitResponse, InfraError> {
    let view = state.timer.state_view(Utc::now())?;
    if view.phase == TimerPhase::Running {
        start_ticks(state);
    }

    let mut records_loaded = 0;
    if let Some(user_name) = read_user_name(&state.config_dir)? {
        match state.store.refetch_all(&user_name).await {
            Ok(records) => records_loaded = records.len(),
            Err(error) => state.log_error("init", &format!("initial refetch failed: {error}")),
        }
    }

    Ok(InitResponse {
        resumed_session: view.phase != TimerPhase::Idle,
        records_loaded,
    })
}

pub async fn start_study_impl(
    state: &Arc<AppState>,
    category: String,
    content: String,
    location: String,
) -> Result<TimerStateResponse, InfraError> {
    if category.trim().is_empty() || content.trim().is_empty() {
        return Err(InfraError::Validation(
            "category and content are required to start a session".to_string(),
        ));
    }

    // refresh master data first so the session's support messages are
    // pinned for its whole length; offline start falls back to defaults
    if let Some(user_name) = read_user_name(&state.config_dir)? {
        if let Err(error) = state.store.refetch_all(&user_name).await {
            state.log_error("start_study", &format!("master data refresh failed: {error}"));
        }
    }

    state.timer.start(&category, &content, &location)?;

    let support_messages = state.store.master_data()?.support_messages;
    *lock_poisoned(&state.session_messages, "session messages")? = support_messages;
    rotate_support_message(state)?;
    start_ticks(state);

    state.log_info(
        "start_study",
        &format!("started category={category} content={content}"),
    );
    timer_state_impl(state)
}

pub fn pause_study_impl(state: &AppState) -> Result<TimerStateResponse, InfraError> {
    state.timer.pause()?;
    if let Ok(mut ticks) = state.ticks.lock() {
        if let Some(handle) = ticks.heartbeat.take() {
            handle.abort();
        }
    }
    state.log_info("pause_study", "paused active study session");
    timer_state_impl(state)
}

pub fn resume_study_impl(state: &Arc<AppState>) -> Result<TimerStateResponse, InfraError> {
    state.timer.resume()?;
    start_heartbeat_tick(state);
    state.log_info("resume_study", "resumed paused study session");
    timer_state_impl(state)
}

pub fn update_session_details_impl(
    state: &AppState,
    category: Option<String>,
    content: Option<String>,
    location: Option<String>,
) -> Result<TimerStateResponse, InfraError> {
    state
        .timer
        .update_details(category.as_deref(), content.as_deref(), location.as_deref())?;
    timer_state_impl(state)
}

/// Close the session and build the summary: duration, today's total with
/// this session included, and the threshold-matched finish message.
pub fn finish_study_impl(state: &AppState) -> Result<FinishStudyResponse, InfraError> {
    let draft = state.timer.finish()?;
    stop_ticks(state);

    let today_total_minutes =
        state.store.today_total_minutes(Utc::now(), state.time_zone)? + draft.duration;

    let remote_pool = state.store.master_data()?.finish_messages;
    let finish_pool = if remote_pool.iter().any(|message| !message.trim().is_empty()) {
        remote_pool
    } else {
        DEFAULT_FINISH_MESSAGES
            .iter()
            .map(|message| message.to_string())
            .collect()
    };
    let finish_message = select_finish_message(
        &finish_pool,
        draft.duration,
        today_total_minutes,
        &mut rand::thread_rng(),
    );

    state.log_info(
        "finish_study",
        &format!("finished after {} minutes", draft.duration),
    );
    Ok(FinishStudyResponse {
        date: draft.date,
        start_time: draft.start_time,
        end_time: draft.end_time,
        duration_minutes: draft.duration,
        category: draft.category,
        content: draft.content,
        location: draft.location,
        today_total_minutes,
        finish_message,
    })
}

/// Commit the finished session and push it to the record store. The
/// optimistic append happens before the remote write, so a network error
/// here means "saved locally, delivery unconfirmed" - the record is not
/// lost, and the caller sees the error exactly once.
pub async fn commit_study_impl(
    state: &AppState,
    condition: String,
    comment: String,
    location: Option<String>,
    enthusiasm: String,
) -> Result<StudyRecord, InfraError> {
    let user_name = require_user_name(state)?;

    let mut record = state.timer.commit(CommitFields {
        enthusiasm,
        condition: condition.clone(),
        comment: comment.clone(),
        location: location.clone(),
    })?;
    record.user_name = user_name;

    let mut settings = load_last_settings(&state.config_dir).unwrap_or_default();
    settings.condition = condition;
    settings.comment = comment;
    if let Some(location) = location {
        settings.location = location;
    }
    save_last_settings(&state.config_dir, &settings)?;

    state.store.create(record.clone()).await?;
    state.log_info(
        "commit_study",
        &format!("recorded {} minutes of {}", record.duration, record.category),
    );
    Ok(record)
}

/// Direct entry of a past session; duration comes from the entered clock
/// times, wrapping past midnight, and the entered date is stored verbatim.
pub async fn manual_record_impl(
    state: &AppState,
    input: ManualRecordInput,
) -> Result<StudyRecord, InfraError> {
    let user_name = require_user_name(state)?;
    let duration = span_minutes(&input.start_time, &input.end_time).ok_or_else(|| {
        InfraError::Validation("startTime and endTime must be HH:MM".to_string())
    })?;

    let date = if input.date.trim().is_empty() {
        logical_date_now(Utc::now(), state.time_zone)
    } else {
        input.date.trim().replace('-', "/")
    };

    let record = StudyRecord {
        id: None,
        date,
        user_name,
        start_time: input.start_time,
        end_time: input.end_time,
        duration,
        category: input.category,
        content: input.content,
        enthusiasm: input.enthusiasm,
        condition: input.condition.clone(),
        comment: input.comment.clone(),
        location: input.location.clone(),
        split: None,
    };

    let mut settings = load_last_settings(&state.config_dir).unwrap_or_default();
    settings.condition = input.condition;
    settings.comment = input.comment;
    settings.location = input.location;
    save_last_settings(&state.config_dir, &settings)?;

    state.store.create(record.clone()).await?;
    state.log_info("manual_record", &format!("recorded {} minutes", record.duration));
    Ok(record)
}

/// Edit an existing record. The duration is recomputed from the submitted
/// clock times before the row is resubmitted.
pub async fn update_record_impl(
    state: &AppState,
    mut record: StudyRecord,
) -> Result<(), InfraError> {
    record.user_name = require_user_name(state)?;
    if let Some(duration) = span_minutes(&record.start_time, &record.end_time) {
        record.duration = duration;
    }
    let id = record.id.clone().unwrap_or_default();
    state.store.update(record).await?;
    state.log_info("update_record", &format!("updated record id={id}"));
    Ok(())
}

pub async fn delete_record_impl(state: &AppState, id: String) -> Result<(), InfraError> {
    let user_name = require_user_name(state)?;
    state.store.delete(&id, &user_name).await?;
    state.log_info("delete_record", &format!("deleted record id={id}"));
    Ok(())
}

pub async fn refresh_records_impl(state: &AppState) -> Result<Vec<StudyRecord>, InfraError> {
    let user_name = require_user_name(state)?;
    let records = state.store.refetch_all(&user_name).await?;
    state.log_info("refresh_records", &format!("loaded {} records", records.len()));
    Ok(records)
}

pub fn list_records_impl(state: &AppState) -> Result<Vec<StudyRecord>, InfraError> {
    state.store.sorted_records()
}

pub fn list_expanded_records_impl(state: &AppState) -> Result<Vec<StudyRecord>, InfraError> {
    state.store.expanded_records()
}

pub fn aggregate_records_impl(
    state: &AppState,
    period: AggregationPeriod,
) -> Result<Vec<PeriodAggregate>, InfraError> {
    state.store.aggregate(period)
}

pub fn records_for_period_impl(
    state: &AppState,
    period: AggregationPeriod,
    view_date: Option<String>,
) -> Result<Vec<StudyRecord>, InfraError> {
    let view_date = match view_date {
        Some(raw) => parse_day_label(&raw.trim().replace('-', "/")).ok_or_else(|| {
            InfraError::Validation("view date must be YYYY/MM/DD".to_string())
        })?,
        None => {
            let today = logical_date_now(Utc::now(), state.time_zone);
            parse_day_label(&today).ok_or_else(|| {
                InfraError::Validation("failed to resolve the current logical day".to_string())
            })?
        }
    };
    state.store.records_for_period(period, view_date)
}

pub fn today_total_impl(state: &AppState) -> Result<i64, InfraError> {
    state.store.today_total_minutes(Utc::now(), state.time_zone)
}

pub fn goal_progress_impl(state: &AppState) -> Result<GoalProgressResponse, InfraError> {
    let goals = load_goals(&state.config_dir)?;
    let today_minutes = today_total_impl(state)?;
    Ok(GoalProgressResponse {
        today_minutes,
        min_hours: goals.min_hours,
        target_hours: goals.target_hours,
        min_reached: today_minutes >= i64::from(goals.min_hours) * 60,
        target_reached: today_minutes >= i64::from(goals.target_hours) * 60,
    })
}

pub fn set_goals_impl(state: &AppState, goals: Goals) -> Result<(), InfraError> {
    save_goals(&state.config_dir, &goals)?;
    state.log_info(
        "set_goals",
        &format!("min={}h target={}h", goals.min_hours, goals.target_hours),
    );
    Ok(())
}

pub fn user_impl(state: &AppState) -> Result<Option<String>, InfraError> {
    read_user_name(&state.config_dir)
}

pub fn set_user_impl(state: &AppState, user_name: String) -> Result<(), InfraError> {
    if user_name.trim().is_empty() {
        return Err(InfraError::Validation(
            "userName must not be empty".to_string(),
        ));
    }
    save_user_name(&state.config_dir, &user_name)?;
    state.log_info("set_user", "updated user name");
    Ok(())
}

pub fn last_settings_impl(state: &AppState) -> Result<LastSettings, InfraError> {
    load_last_settings(&state.config_dir)
}

pub fn set_message_interval_impl(state: &AppState, seconds: u64) -> Result<(), InfraError> {
    save_message_interval_seconds(&state.config_dir, seconds)?;
    *lock_poisoned(&state.message_interval_seconds, "message interval")? = seconds;
    state.log_info("set_message_interval", &format!("interval={seconds}s"));
    Ok(())
}

pub fn timer_state_impl(state: &AppState) -> Result<TimerStateResponse, InfraError> {
    let view = state.timer.state_view(Utc::now())?;
    let support_message =
        lock_poisoned(&state.current_support_message, "support message")?.clone();
    Ok(TimerStateResponse {
        phase: view.phase.as_str().to_string(),
        elapsed_seconds: view.elapsed_ms / 1000,
        start_time: view.start_time.map(|value| value.to_rfc3339()),
        category: view.category,
        content: view.content,
        location: view.location,
        support_message,
    })
}

/// Abort both periodic tasks. Safe to call with none running.
pub fn stop_ticks(state: &AppState) {
    if let Ok(mut ticks) = state.ticks.lock() {
        if let Some(handle) = ticks.heartbeat.take() {
            handle.abort();
        }
        if let Some(handle) = ticks.rotation.take() {
            handle.abort();
        }
    }
}

fn start_ticks(state: &Arc<AppState>) {
    start_heartbeat_tick(state);
    start_rotation_tick(state);
}

// Persists the snapshot once a minute while running, covering abrupt
// termination between explicit state changes.
fn start_heartbeat_tick(state: &Arc<AppState>) {
    let task_state = Arc::clone(state);
    let handle = tokio::spawn(async move {
        loop {
            sleep(TokioDuration::from_secs(HEARTBEAT_INTERVAL_SECONDS)).await;
            if task_state.timer.heartbeat().is_err() {
                break;
            }
        }
    });
    if let Ok(mut ticks) = state.ticks.lock() {
        if let Some(previous) = ticks.heartbeat.replace(handle) {
            previous.abort();
        }
    }
}

fn start_rotation_tick(state: &Arc<AppState>) {
    let task_state = Arc::clone(state);
    let handle = tokio::spawn(async move {
        loop {
            let seconds = task_state
                .message_interval_seconds
                .lock()
                .map(|interval| *interval)
                .unwrap_or(20);
            sleep(TokioDuration::from_secs(seconds)).await;
            if rotate_support_message(&task_state).is_err() {
                break;
            }
        }
    });
    if let Ok(mut ticks) = state.ticks.lock() {
        if let Some(previous) = ticks.rotation.replace(handle) {
            previous.abort();
        }
    }
}

fn rotate_support_message(state: &AppState) -> Result<(), InfraError> {
    let messages = lock_poisoned(&state.session_messages, "session messages")?.clone();
    let picked = pick_support_message(&messages, &mut rand::thread_rng());
    *lock_poisoned(&state.current_support_message, "support message")? = picked;
    Ok(())
}

fn require_user_name(state: &AppState) -> Result<String, InfraError> {
    read_user_name(&state.config_dir)?.ok_or_else(|| {
        InfraError::InvalidConfig("userName is not configured; call set_user first".to_string())
    })
}

fn lock_poisoned<'a, T>(
    mutex: &'a Mutex<T>,
    what: &str,
) -> Result<MutexGuard<'a, T>, InfraError> {
    mutex
        .lock()
        .map_err(|error| InfraError::InvalidConfig(format!("{what} lock poisoned: {error}")))
}
