//! Finished parking sessions, newest first.
//!
//! The whole list lives under one key and every operation is a full
//! read-modify-write. Only the parking state machine appends and only the
//! host deletes, both from the same control path.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Local, Utc};
use log::{info, warn};
use serde::Serialize;
use uuid::Uuid;

use crate::db::{keys, KvStore};
use crate::models::ParkingSession;

pub const FREE_TIER_HISTORY_LIMIT: usize = 10;
pub const DEFAULT_BATCH_SIZE: usize = 20;

const AVERAGE_HOURLY_COST: f64 = 2.0;
const AVERAGE_TICKET_COST: f64 = 50.0;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStats {
    pub total_sessions: usize,
    pub total_hours: f64,
    pub total_spent: f64,
    pub has_spending_data: bool,
    pub estimated_tickets_avoided: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    pub sessions: Vec<ParkingSession>,
    pub has_more: bool,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SectionKind {
    Today,
    ThisWeek,
    Older,
}

impl SectionKind {
    pub fn title(self) -> &'static str {
        match self {
            SectionKind::Today => "Today",
            SectionKind::ThisWeek => "This Week",
            SectionKind::Older => "Older",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySection {
    pub kind: SectionKind,
    pub sessions: Vec<ParkingSession>,
}

#[derive(Clone)]
pub struct HistoryStore {
    kv: Arc<dyn KvStore>,
}

impl HistoryStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Every stored session, newest start first. Malformed data reads as empty.
    pub fn load_all(&self) -> Vec<ParkingSession> {
        let raw = match self.kv.get(keys::PARKING_SESSIONS) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!("Failed to read parking history: {err:#}");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<ParkingSession>>(&raw) {
            Ok(mut sessions) => {
                sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
                sessions
            }
            Err(err) => {
                warn!("Stored parking history is malformed, treating as empty: {err}");
                Vec::new()
            }
        }
    }

    pub fn save_all(&self, sessions: &[ParkingSession]) -> Result<()> {
        let serialized =
            serde_json::to_string(sessions).context("failed to encode parking history")?;
        self.kv
            .set(keys::PARKING_SESSIONS, &serialized)
            .context("failed to persist parking history")
    }

    pub fn append(&self, session: ParkingSession) -> Result<()> {
        let mut sessions = self.load_all();
        info!(
            "Recording parking session {} ({} ms)",
            session.id, session.duration_ms
        );
        sessions.insert(0, session);
        self.save_all(&sessions)
    }

    /// Returns whether a session with `id` was present.
    pub fn delete(&self, id: Uuid) -> Result<bool> {
        let mut sessions = self.load_all();
        let before = sessions.len();
        sessions.retain(|session| session.id != id);
        if sessions.len() == before {
            return Ok(false);
        }
        self.save_all(&sessions)?;
        Ok(true)
    }

    pub fn page(&self, offset: usize, limit: usize) -> HistoryPage {
        let all = self.load_all();
        let sessions: Vec<ParkingSession> =
            all.iter().skip(offset).take(limit).cloned().collect();
        let has_more = offset.saturating_add(sessions.len()) < all.len();
        HistoryPage { sessions, has_more }
    }

    pub fn visible_sessions(&self, entitled: bool) -> Vec<ParkingSession> {
        let mut sessions = self.load_all();
        if !entitled {
            sessions.truncate(FREE_TIER_HISTORY_LIMIT);
        }
        sessions
    }

    pub fn stats(&self) -> HistoryStats {
        stats_for(&self.load_all())
    }

    pub fn sections(&self, now: DateTime<Utc>) -> Vec<HistorySection> {
        group_sections(self.load_all(), now)
    }
}

pub fn stats_for(sessions: &[ParkingSession]) -> HistoryStats {
    let total_hours: f64 = sessions.iter().map(ParkingSession::duration_hours).sum();
    let total_spent = sessions.iter().filter_map(ParkingSession::total_cost).sum();
    let estimated_tickets_avoided =
        (total_hours * AVERAGE_HOURLY_COST / AVERAGE_TICKET_COST).floor().max(0.0) as u64;

    HistoryStats {
        total_sessions: sessions.len(),
        total_hours,
        total_spent,
        has_spending_data: sessions.iter().any(|session| session.hourly_rate.is_some()),
        estimated_tickets_avoided,
    }
}

/// Groups by the session's local start day. Empty groups are omitted.
pub fn group_sections(sessions: Vec<ParkingSession>, now: DateTime<Utc>) -> Vec<HistorySection> {
    let today = now.with_timezone(&Local).date_naive();
    let this_week = today.iso_week();

    let mut today_sessions = Vec::new();
    let mut week_sessions = Vec::new();
    let mut older_sessions = Vec::new();

    for session in sessions {
        let day = session.started_at.with_timezone(&Local).date_naive();
        if day == today {
            today_sessions.push(session);
        } else if day.iso_week() == this_week {
            week_sessions.push(session);
        } else {
            older_sessions.push(session);
        }
    }

    [
        (SectionKind::Today, today_sessions),
        (SectionKind::ThisWeek, week_sessions),
        (SectionKind::Older, older_sessions),
    ]
    .into_iter()
    .filter(|(_, sessions)| !sessions.is_empty())
    .map(|(kind, sessions)| HistorySection { kind, sessions })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use chrono::{Duration, TimeZone};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_767_441_600 + secs, 0).unwrap()
    }

    fn history() -> (Arc<MemoryStore>, HistoryStore) {
        let kv = Arc::new(MemoryStore::new());
        (kv.clone(), HistoryStore::new(kv))
    }

    #[test]
    fn append_keeps_newest_first() {
        let (_, store) = history();
        store.append(ParkingSession::new(at(0), at(60))).unwrap();
        store.append(ParkingSession::new(at(100), at(160))).unwrap();

        let all = store.load_all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].started_at, at(100));
        assert_eq!(all[1].started_at, at(0));
    }

    #[test]
    fn load_sorts_out_of_order_records() {
        let (_, store) = history();
        store
            .save_all(&[
                ParkingSession::new(at(0), at(10)),
                ParkingSession::new(at(500), at(510)),
                ParkingSession::new(at(200), at(210)),
            ])
            .unwrap();

        let starts: Vec<_> = store.load_all().iter().map(|s| s.started_at).collect();
        assert_eq!(starts, vec![at(500), at(200), at(0)]);
    }

    #[test]
    fn delete_removes_only_matching_id() {
        let (_, store) = history();
        let keep = ParkingSession::new(at(0), at(60));
        let drop = ParkingSession::new(at(100), at(160));
        store.append(keep.clone()).unwrap();
        store.append(drop.clone()).unwrap();

        assert!(store.delete(drop.id).unwrap());
        assert!(!store.delete(drop.id).unwrap());
        assert_eq!(store.load_all(), vec![keep]);
    }

    #[test]
    fn malformed_history_reads_as_empty() {
        let (kv, store) = history();
        kv.set(keys::PARKING_SESSIONS, "[{\"id\":").unwrap();
        assert!(store.load_all().is_empty());

        store.append(ParkingSession::new(at(0), at(1))).unwrap();
        assert_eq!(store.load_all().len(), 1);
    }

    #[test]
    fn paging_reports_has_more() {
        let (_, store) = history();
        for i in 0..5 {
            store
                .append(ParkingSession::new(at(i * 100), at(i * 100 + 10)))
                .unwrap();
        }

        let first = store.page(0, 2);
        assert_eq!(first.sessions.len(), 2);
        assert!(first.has_more);

        let last = store.page(4, 2);
        assert_eq!(last.sessions.len(), 1);
        assert!(!last.has_more);

        let beyond = store.page(usize::MAX, 2);
        assert!(beyond.sessions.is_empty());
        assert!(!beyond.has_more);
    }

    #[test]
    fn free_tier_sees_limited_history() {
        let (_, store) = history();
        for i in 0..12 {
            store.append(ParkingSession::new(at(i), at(i + 1))).unwrap();
        }
        assert_eq!(store.visible_sessions(false).len(), FREE_TIER_HISTORY_LIMIT);
        assert_eq!(store.visible_sessions(true).len(), 12);
    }

    #[test]
    fn stats_sum_hours_and_costs() {
        let sessions = vec![
            ParkingSession::new(at(0), at(3600 * 20)).with_hourly_rate(1.5),
            ParkingSession::new(at(0), at(3600 * 5)),
        ];
        let stats = stats_for(&sessions);
        assert_eq!(stats.total_sessions, 2);
        assert!((stats.total_hours - 25.0).abs() < 1e-9);
        assert!((stats.total_spent - 30.0).abs() < 1e-9);
        assert!(stats.has_spending_data);
        assert_eq!(stats.estimated_tickets_avoided, 1);

        let empty = stats_for(&[]);
        assert_eq!(empty.total_sessions, 0);
        assert!(!empty.has_spending_data);
    }

    #[test]
    fn sections_split_today_from_older() {
        let now = Utc::now();
        let sessions = vec![
            ParkingSession::new(now, now),
            ParkingSession::new(now - Duration::days(30), now - Duration::days(30)),
        ];
        let sections = group_sections(sessions, now);
        assert_eq!(sections.first().map(|s| s.kind), Some(SectionKind::Today));
        assert_eq!(sections.last().map(|s| s.kind), Some(SectionKind::Older));
        assert_eq!(sections.iter().map(|s| s.sessions.len()).sum::<usize>(), 2);
    }
}
