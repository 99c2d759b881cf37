//! Process-wide orchestration counters
//!
//! The registry is created once by [`init`] at startup. Every `record_*`
//! function is a side-effect-only increment and does nothing before `init`,
//! so library code can call them unconditionally.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

static COUNTERS: OnceLock<Counters> = OnceLock::new();

#[derive(Default)]
struct Counters {
    phases_started: AtomicU64,
    pauses: AtomicU64,
    resumes: AtomicU64,
    skill_activations: AtomicU64,
    authorizations: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub phases_started: u64,
    pub pauses: u64,
    pub resumes: u64,
    pub skill_activations: u64,
    pub authorizations: u64,
}

/// Create the counter registry; returns false if it already existed
pub fn init() -> bool {
    let mut created = false;
    COUNTERS.get_or_init(|| {
        created = true;
        Counters::default()
    });
    created
}

pub fn is_initialized() -> bool {
    COUNTERS.get().is_some()
}

fn bump(select: impl FnOnce(&Counters) -> &AtomicU64) {
    if let Some(counters) = COUNTERS.get() {
        select(counters).fetch_add(1, Ordering::Relaxed);
    }
}

pub fn record_phase_started() {
    bump(|c| &c.phases_started);
}

pub fn record_pause() {
    bump(|c| &c.pauses);
}

pub fn record_resume() {
    bump(|c| &c.resumes);
}

pub fn record_skill_activation() {
    bump(|c| &c.skill_activations);
}

pub fn record_authorization() {
    bump(|c| &c.authorizations);
}

/// Current values; all zero before [`init`]
pub fn snapshot() -> CounterSnapshot {
    COUNTERS
        .get()
        .map(|c| CounterSnapshot {
            phases_started: c.phases_started.load(Ordering::Relaxed),
            pauses: c.pauses.load(Ordering::Relaxed),
            resumes: c.resumes.load(Ordering::Relaxed),
            skill_activations: c.skill_activations.load(Ordering::Relaxed),
            authorizations: c.authorizations.load(Ordering::Relaxed),
        })
        .unwrap_or_default()
}
