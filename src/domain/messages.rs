//! Completion-message selection over a tagged candidate pool.
//!
//! Candidates carry optional `[A<n>]` (session minutes) and `[B<n>]`
//! (today's total minutes) thresholds. A legacy leading `[<n>]` tag counts
//! as the A threshold. Untagged candidates double as the fallback pool.

use rand::Rng;
use rand::seq::SliceRandom;
use regex::Regex;
use std::sync::LazyLock;

pub const DEFAULT_FINISH_MESSAGE: &str = "Well done today!";

pub const DEFAULT_FINISH_MESSAGES: &[&str] =
    &["Well done today!", "Another step forward."];

pub const DEFAULT_SUPPORT_MESSAGES: &[&str] = &[
    "Great focus!",
    "One step at a time.",
    "Breaks matter too. Pace yourself.",
    "Keep going. Future you says thanks.",
    "Hard now, stronger later.",
];

// Untagged legacy candidates were written assuming an hour-long session.
const UNTAGGED_SESSION_THRESHOLD: i64 = 60;

static TAG_A: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[A(\d+)\]").expect("valid regex"));
static TAG_B: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[B(\d+)\]").expect("valid regex"));
static TAG_LEGACY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[(\d+)\]").expect("valid regex"));
static TAG_STRIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[AB]?\d+\]").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
struct FinishCandidate {
    text: String,
    threshold_a: i64,
    threshold_b: i64,
    has_any_tag: bool,
}

fn parse_candidate(raw: &str) -> FinishCandidate {
    let tag_a = captured_number(&TAG_A, raw);
    let tag_b = captured_number(&TAG_B, raw);
    let tag_legacy = captured_number(&TAG_LEGACY, raw);

    let mut threshold_a = tag_a.unwrap_or(0);
    let threshold_b = tag_b.unwrap_or(0);
    if tag_a.is_none() && tag_b.is_none() {
        if let Some(legacy) = tag_legacy {
            threshold_a = legacy;
        }
    }

    let has_any_tag = tag_a.is_some() || tag_b.is_some() || tag_legacy.is_some();
    if !has_any_tag {
        threshold_a = UNTAGGED_SESSION_THRESHOLD;
    }

    FinishCandidate {
        text: raw.to_string(),
        threshold_a,
        threshold_b,
        has_any_tag,
    }
}

fn captured_number(pattern: &Regex, raw: &str) -> Option<i64> {
    pattern
        .captures(raw)
        .and_then(|captures| captures.get(1))
        .and_then(|group| group.as_str().parse::<i64>().ok())
}

pub fn strip_tags(raw: &str) -> String {
    TAG_STRIP.replace_all(raw, "").trim().to_string()
}

/// Pick the finish message for a completed session.
///
/// Filters to candidates whose A/B thresholds are both met, falling back
/// to the untagged pool, then prefers the most demanding candidate
/// (highest `A + B`) and breaks ties uniformly at random.
pub fn select_finish_message<R: Rng>(
    candidates: &[String],
    session_minutes: i64,
    today_total_minutes: i64,
    rng: &mut R,
) -> String {
    let parsed: Vec<FinishCandidate> = candidates
        .iter()
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| parse_candidate(raw))
        .collect();

    let mut matching: Vec<&FinishCandidate> = parsed
        .iter()
        .filter(|candidate| {
            session_minutes >= candidate.threshold_a
                && today_total_minutes >= candidate.threshold_b
        })
        .collect();
    if matching.is_empty() {
        matching = parsed
            .iter()
            .filter(|candidate| !candidate.has_any_tag)
            .collect();
    }

    let Some(top_score) = matching
        .iter()
        .map(|candidate| candidate.threshold_a + candidate.threshold_b)
        .max()
    else {
        return DEFAULT_FINISH_MESSAGE.to_string();
    };

    let best: Vec<&&FinishCandidate> = matching
        .iter()
        .filter(|candidate| candidate.threshold_a + candidate.threshold_b == top_score)
        .collect();

    match best.choose(rng) {
        Some(chosen) => strip_tags(&chosen.text),
        None => DEFAULT_FINISH_MESSAGE.to_string(),
    }
}

/// Uniform rotation pick for the in-session support message, with a
/// built-in pool when the remote list is empty.
pub fn pick_support_message<R: Rng>(messages: &[String], rng: &mut R) -> String {
    if messages.is_empty() {
        return DEFAULT_SUPPORT_MESSAGES
            .choose(rng)
            .copied()
            .unwrap_or(DEFAULT_SUPPORT_MESSAGES[0])
            .to_string();
    }
    messages
        .choose(rng)
        .cloned()
        .unwrap_or_else(|| DEFAULT_SUPPORT_MESSAGES[0].to_string())
}
