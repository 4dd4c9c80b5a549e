//! Per (user, geofence) membership tracking and transition detection
//!
//! Ephemeral derived state: recomputed on every location update, never
//! persisted. On restart it rebuilds silently from the first sample per
//! user (the Unknown state suppresses the event a cold start would
//! otherwise fire).

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::warn;
use uuid::Uuid;

use crate::model::{Geofence, GeofenceEvent, LocationSample, TransitionKind};

/// Last-known membership for one (user, geofence) pair
#[derive(Debug, Clone, Copy)]
struct MembershipState {
    /// `None` until the first schedule-active sample is seen
    inside: Option<bool>,
    since: DateTime<Utc>,
}

/// A row of the membership status read API
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MembershipStatus {
    pub geofence_id: Uuid,
    pub inside: bool,
    pub since: DateTime<Utc>,
}

/// Tracks membership per (user, geofence) and emits transition events.
///
/// State for different users is never contended; callers serialize
/// per-user evaluation (the ingestor holds a per-user lock), so a single
/// sample causes at most one transition per geofence.
#[derive(Default)]
pub struct MembershipTracker {
    states: DashMap<(Uuid, Uuid), MembershipState>,
}

impl MembershipTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate one sample against the user's geofences.
    ///
    /// Geofences are visited in ascending id order so the emitted events
    /// (and downstream dispatch) are deterministic. A fence that is
    /// inactive, schedule-inactive, or not applicable to the user is
    /// skipped entirely: its stored state freezes at the last value, so
    /// re-entering an active window compares against the current position
    /// only and never replays missed transitions. A geometry fault in one
    /// fence is logged and never aborts the others.
    pub fn evaluate(&self, sample: &LocationSample, geofences: &[Geofence]) -> Vec<GeofenceEvent> {
        let mut applicable: Vec<&Geofence> = geofences
            .iter()
            .filter(|f| f.is_active && f.applies_to(sample.user_id))
            .collect();
        applicable.sort_by_key(|f| f.id);

        let local = sample.local_time();
        let mut events = Vec::new();

        for fence in applicable {
            if !fence.schedule.is_active_at(local) {
                continue;
            }

            let now_inside = match fence.geometry.contains(sample.coordinates) {
                Ok(v) => v,
                Err(e) => {
                    warn!(geofence_id = %fence.id, "skipping geofence with bad geometry: {e}");
                    continue;
                }
            };

            match self.states.entry((sample.user_id, fence.id)) {
                Entry::Vacant(slot) => {
                    // First observation: record silently, no event
                    slot.insert(MembershipState {
                        inside: Some(now_inside),
                        since: sample.captured_at,
                    });
                }
                Entry::Occupied(mut slot) => {
                    let state = slot.get_mut();
                    match state.inside {
                        None => {
                            state.inside = Some(now_inside);
                            state.since = sample.captured_at;
                        }
                        Some(prev) if prev != now_inside => {
                            state.inside = Some(now_inside);
                            state.since = sample.captured_at;
                            events.push(GeofenceEvent {
                                kind: if now_inside {
                                    TransitionKind::Enter
                                } else {
                                    TransitionKind::Exit
                                },
                                user_id: sample.user_id,
                                geofence_id: fence.id,
                                sample: sample.clone(),
                            });
                        }
                        Some(_) => {}
                    }
                }
            }
        }

        events
    }

    /// Rebuild state from a sample without emitting events (restart path).
    pub fn prime(&self, sample: &LocationSample, geofences: &[Geofence]) {
        let _ = self.evaluate(sample, geofences);
    }

    /// Known membership rows for a user, ascending by geofence id.
    pub fn status_for(&self, user_id: Uuid) -> Vec<MembershipStatus> {
        let mut rows: Vec<MembershipStatus> = self
            .states
            .iter()
            .filter(|entry| entry.key().0 == user_id)
            .filter_map(|entry| {
                entry.value().inside.map(|inside| MembershipStatus {
                    geofence_id: entry.key().1,
                    inside,
                    since: entry.value().since,
                })
            })
            .collect();
        rows.sort_by_key(|r| r.geofence_id);
        rows
    }

    /// Drop all state for a deactivated geofence.
    pub fn forget_geofence(&self, geofence_id: Uuid) {
        self.states.retain(|key, _| key.1 != geofence_id);
    }

    /// Drop all state for a user (account removal, sharing revoked).
    pub fn forget_user(&self, user_id: Uuid) {
        self.states.retain(|key, _| key.0 != user_id);
    }
}
