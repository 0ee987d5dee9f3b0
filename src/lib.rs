//! StudyRecorder core: a wall-clock study-session timer with 4 AM
//! logical-day accounting and an optimistic, eventually-consistent mirror
//! of a remote record store. UI layers drive it through the command
//! functions in [`application::commands`].

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::bootstrap::bootstrap_workspace;
pub use application::commands::{
    AppState, FinishStudyResponse, GoalProgressResponse, InitResponse, ManualRecordInput,
    TimerStateResponse, aggregate_records_impl, commit_study_impl, delete_record_impl,
    finish_study_impl, goal_progress_impl, init_impl, last_settings_impl,
    list_expanded_records_impl, list_records_impl, manual_record_impl, pause_study_impl,
    records_for_period_impl, refresh_records_impl, resume_study_impl, set_goals_impl,
    set_message_interval_impl, set_user_impl, start_study_impl, stop_ticks, timer_state_impl,
    today_total_impl, update_record_impl, update_session_details_impl, user_impl,
};
pub use application::record_store::{AggregationPeriod, PeriodAggregate, RecordStore};
pub use application::session_timer::{
    CommitFields, DraftRecord, NowProvider, SessionTimer, TimerPhase, TimerStateView,
};
pub use domain::day_boundary::{
    belonging_date, expand_records, logical_date, logical_date_now, split_at_boundary,
};
pub use domain::messages::{pick_support_message, select_finish_message, strip_tags};
pub use domain::models::{MasterData, SplitPart, StudyRecord};
pub use infrastructure::config::{Goals, LastSettings};
pub use infrastructure::error::InfraError;
pub use infrastructure::mirror_repository::{
    InMemoryMirrorRepository, MirrorRepository, SqliteMirrorRepository,
};
pub use infrastructure::record_api::{
    FetchRecordsResponse, RecordAction, RecordApi, ReqwestRecordApi,
};
pub use infrastructure::snapshot_repository::{
    InMemorySnapshotRepository, SessionSnapshot, SnapshotRepository, SqliteSnapshotRepository,
};
