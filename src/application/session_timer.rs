//! Wall-clock session timer: `Idle → Running → {Paused ⇄ Running} →
//! Finishing → Idle`, durably snapshotted so a restart recovers the
//! session in progress.
//!
//! Elapsed time is always recomputed from the recorded timestamps, never
//! accumulated from tick callbacks, so a suspended host that missed its
//! intervals still reports the right duration.

use crate::domain::models::StudyRecord;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::snapshot_repository::{SessionSnapshot, SnapshotRepository};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::{Arc, Mutex, MutexGuard};

pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

const MS_PER_MINUTE: i64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerPhase {
    #[default]
    Idle,
    Running,
    Paused,
    Finishing,
}

impl TimerPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Finishing => "finishing",
        }
    }
}

/// Record produced by `finish`, awaiting the commit-time fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftRecord {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub duration: i64,
    pub category: String,
    pub content: String,
    pub location: String,
}

/// Fields collected on the summary screen and merged at commit time.
#[derive(Debug, Clone, Default)]
pub struct CommitFields {
    pub enthusiasm: String,
    pub condition: String,
    pub comment: String,
    /// Overrides the session location when set.
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct TimerState {
    phase: TimerPhase,
    start_time: Option<DateTime<Utc>>,
    accumulated_paused_ms: i64,
    last_pause_time: Option<DateTime<Utc>>,
    category: String,
    content: String,
    location: String,
    draft: Option<DraftRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerStateView {
    pub phase: TimerPhase,
    pub elapsed_ms: i64,
    pub start_time: Option<DateTime<Utc>>,
    pub category: String,
    pub content: String,
    pub location: String,
}

pub struct SessionTimer<S: SnapshotRepository> {
    snapshots: Arc<S>,
    time_zone: Tz,
    now_provider: NowProvider,
    state: Mutex<TimerState>,
}

impl<S: SnapshotRepository> SessionTimer<S> {
    pub fn new(snapshots: Arc<S>, time_zone: Tz) -> Self {
        Self {
            snapshots,
            time_zone,
            now_provider: Arc::new(Utc::now),
            state: Mutex::new(TimerState::default()),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    /// Rebuild state from the durable snapshot after a restart. Returns
    /// true when a session was restored and is actively running, so the
    /// caller knows to resume ticking.
    pub fn recover(&self) -> Result<bool, InfraError> {
        let Some(snapshot) = self.snapshots.load()? else {
            return Ok(false);
        };
        if !snapshot.is_studying {
            return Ok(false);
        }

        let mut state = self.lock_state()?;
        *state = TimerState {
            phase: if snapshot.is_paused {
                TimerPhase::Paused
            } else {
                TimerPhase::Running
            },
            start_time: Some(snapshot.start_time),
            accumulated_paused_ms: snapshot.accumulated_paused_ms,
            last_pause_time: snapshot.last_pause_time,
            category: snapshot.category,
            content: snapshot.content,
            location: snapshot.location,
            draft: None,
        };
        Ok(state.phase == TimerPhase::Running)
    }

    pub fn start(&self, category: &str, content: &str, location: &str) -> Result<(), InfraError> {
        let category = category.trim();
        let content = content.trim();
        if category.is_empty() || content.is_empty() {
            return Err(InfraError::Validation(
                "category and content are required to start a session".to_string(),
            ));
        }

        let mut state = self.lock_state()?;
        if state.phase != TimerPhase::Idle {
            return Err(InfraError::Validation(
                "a session is already in progress".to_string(),
            ));
        }

        let now = (self.now_provider)();
        *state = TimerState {
            phase: TimerPhase::Running,
            start_time: Some(now),
            accumulated_paused_ms: 0,
            last_pause_time: None,
            category: category.to_string(),
            content: content.to_string(),
            location: location.trim().to_string(),
            draft: None,
        };
        self.persist_snapshot(&state)
    }

    pub fn pause(&self) -> Result<(), InfraError> {
        let mut state = self.lock_state()?;
        if state.phase != TimerPhase::Running {
            return Err(InfraError::Validation("timer is not running".to_string()));
        }

        state.last_pause_time = Some((self.now_provider)());
        state.phase = TimerPhase::Paused;
        self.persist_snapshot(&state)
    }

    pub fn resume(&self) -> Result<(), InfraError> {
        let mut state = self.lock_state()?;
        if state.phase != TimerPhase::Paused {
            return Err(InfraError::Validation("timer is not paused".to_string()));
        }

        let now = (self.now_provider)();
        if let Some(last_pause) = state.last_pause_time.take() {
            state.accumulated_paused_ms += (now - last_pause).num_milliseconds().max(0);
        }
        state.phase = TimerPhase::Running;
        self.persist_snapshot(&state)
    }

    /// Metadata stays editable while a session is underway; the next
    /// snapshot write carries the change.
    pub fn update_details(
        &self,
        category: Option<&str>,
        content: Option<&str>,
        location: Option<&str>,
    ) -> Result<(), InfraError> {
        let mut state = self.lock_state()?;
        if state.phase != TimerPhase::Running && state.phase != TimerPhase::Paused {
            return Err(InfraError::Validation("no session in progress".to_string()));
        }

        if let Some(category) = category.map(str::trim) {
            if category.is_empty() {
                return Err(InfraError::Validation(
                    "record.category must not be empty".to_string(),
                ));
            }
            state.category = category.to_string();
        }
        if let Some(content) = content.map(str::trim) {
            if content.is_empty() {
                return Err(InfraError::Validation(
                    "record.content must not be empty".to_string(),
                ));
            }
            state.content = content.to_string();
        }
        if let Some(location) = location.map(str::trim) {
            state.location = location.to_string();
        }
        self.persist_snapshot(&state)
    }

    /// Wall-clock milliseconds spent studying as of `now`, net of pauses.
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> Result<i64, InfraError> {
        let state = self.lock_state()?;
        Ok(Self::elapsed_of(&state, now))
    }

    pub fn state_view(&self, now: DateTime<Utc>) -> Result<TimerStateView, InfraError> {
        let state = self.lock_state()?;
        Ok(TimerStateView {
            phase: state.phase,
            elapsed_ms: Self::elapsed_of(&state, now),
            start_time: state.start_time,
            category: state.category.clone(),
            content: state.content.clone(),
            location: state.location.clone(),
        })
    }

    /// Re-persist the snapshot while running; covers abrupt termination
    /// between explicit state changes.
    pub fn heartbeat(&self) -> Result<(), InfraError> {
        let state = self.lock_state()?;
        if state.phase == TimerPhase::Running {
            self.persist_snapshot(&state)?;
        }
        Ok(())
    }

    /// Close the measuring window and produce the draft record. The
    /// snapshot is intentionally left in place: until commit runs, a
    /// reload must still be able to recover the session.
    pub fn finish(&self) -> Result<DraftRecord, InfraError> {
        let mut state = self.lock_state()?;
        if state.phase != TimerPhase::Running && state.phase != TimerPhase::Paused {
            return Err(InfraError::Validation("no session to finish".to_string()));
        }
        let start_time = state.start_time.ok_or_else(|| {
            InfraError::Validation("session start time is missing".to_string())
        })?;

        let now = (self.now_provider)();
        let elapsed = Self::elapsed_of(&state, now);
        let duration = (elapsed + MS_PER_MINUTE / 2) / MS_PER_MINUTE;

        let start_local = start_time.with_timezone(&self.time_zone);
        let end_local = now.with_timezone(&self.time_zone);
        let draft = DraftRecord {
            date: start_local.format("%Y/%m/%d").to_string(),
            start_time: start_local.format("%H:%M").to_string(),
            end_time: end_local.format("%H:%M").to_string(),
            duration,
            category: state.category.clone(),
            content: state.content.clone(),
            location: state.location.clone(),
        };

        state.phase = TimerPhase::Finishing;
        state.draft = Some(draft.clone());
        Ok(draft)
    }

    /// Merge the summary fields into the draft, clear the snapshot, and
    /// hand the finished record over for storage.
    pub fn commit(&self, extra: CommitFields) -> Result<StudyRecord, InfraError> {
        let mut state = self.lock_state()?;
        if state.phase != TimerPhase::Finishing {
            return Err(InfraError::Validation(
                "no finished session to commit".to_string(),
            ));
        }
        let draft = state
            .draft
            .clone()
            .ok_or_else(|| InfraError::Validation("draft record is missing".to_string()))?;

        self.snapshots.clear()?;

        let record = StudyRecord {
            id: None,
            date: draft.date,
            user_name: String::new(),
            start_time: draft.start_time,
            end_time: draft.end_time,
            duration: draft.duration,
            category: draft.category,
            content: draft.content,
            enthusiasm: extra.enthusiasm,
            condition: extra.condition,
            comment: extra.comment,
            location: extra.location.unwrap_or(draft.location),
            split: None,
        };

        *state = TimerState::default();
        Ok(record)
    }

    fn elapsed_of(state: &TimerState, now: DateTime<Utc>) -> i64 {
        let Some(start_time) = state.start_time else {
            return 0;
        };
        let mut paused_ms = state.accumulated_paused_ms;
        if let Some(last_pause) = state.last_pause_time {
            paused_ms += (now - last_pause).num_milliseconds();
        }
        ((now - start_time).num_milliseconds() - paused_ms).max(0)
    }

    fn persist_snapshot(&self, state: &TimerState) -> Result<(), InfraError> {
        let Some(start_time) = state.start_time else {
            return Ok(());
        };
        self.snapshots.save(&SessionSnapshot {
            is_studying: true,
            is_paused: state.phase == TimerPhase::Paused,
            start_time,
            accumulated_paused_ms: state.accumulated_paused_ms,
            last_pause_time: state.last_pause_time,
            category: state.category.clone(),
            content: state.content.clone(),
            location: state.location.clone(),
        })
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, TimerState>, InfraError> {
        self.state
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("timer lock poisoned: {error}")))
    }
}
