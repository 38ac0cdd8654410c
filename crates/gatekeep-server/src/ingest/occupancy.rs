//! Per-card presence tracking.
//!
//! A card is either outside or inside. An allowed entry moves it inside and
//! starts the clock unless it is already inside. An exit, triggered by an
//! operator, stops the clock and adds the elapsed seconds to the running
//! total. A reset forgets the current visit but keeps the total.

use gatekeep_core::CredentialId;
use gatekeep_core::db::unix_timestamp;
use gatekeep_core::wire::OccupancyView;
use sqlx::SqliteConnection;
use tracing::info;

use crate::error::GateError;
use crate::storage::{DatabaseError, GateDatabase, Occupancy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupancyState {
    pub card_id: u32,
    pub user_id: u32,
    pub inside: bool,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    pub cumulative_secs: i64,
}

impl OccupancyState {
    /// A card never seen before: outside, no time accumulated.
    pub const fn new(card_id: u32, user_id: u32) -> Self {
        Self {
            card_id,
            user_id,
            inside: false,
            start_time: None,
            end_time: None,
            cumulative_secs: 0,
        }
    }

    pub const fn enter(&mut self, user_id: u32, now: i64) {
        self.user_id = user_id;
        if !self.inside {
            self.inside = true;
            self.start_time = Some(now);
        }
    }

    /// Returns `false` when the card was already outside.
    pub fn exit(&mut self, now: i64) -> bool {
        if !self.inside {
            return false;
        }
        let start = self.start_time.unwrap_or(now);
        self.cumulative_secs += (now - start).max(0);
        self.end_time = Some(now);
        self.inside = false;
        true
    }

    pub const fn reset(&mut self) {
        self.inside = false;
        self.start_time = None;
        self.end_time = None;
    }

    pub const fn view(&self) -> OccupancyView {
        OccupancyView {
            card_id: CredentialId(self.card_id),
            user_id: CredentialId(self.user_id),
            is_inside_workplace: self.inside,
            start_time: self.start_time,
            end_time: self.end_time,
            cumulative_time_in_office: self.cumulative_secs,
        }
    }

    fn from_row(row: &Occupancy) -> Result<Self, DatabaseError> {
        let id = |v: i64| {
            u32::try_from(v)
                .map_err(|e| DatabaseError::Query(format!("corrupt occupancy row {}: {e}", row.card_id)))
        };
        Ok(Self {
            card_id: id(row.card_id)?,
            user_id: id(row.user_id)?,
            inside: row.is_inside,
            start_time: row.start_time,
            end_time: row.end_time,
            cumulative_secs: row.cumulative_secs,
        })
    }

    fn to_row(&self, now: i64) -> Occupancy {
        Occupancy {
            card_id: i64::from(self.card_id),
            user_id: i64::from(self.user_id),
            is_inside: self.inside,
            start_time: self.start_time,
            end_time: self.end_time,
            cumulative_secs: self.cumulative_secs,
            updated_at: now,
        }
    }
}

/// Apply an allowed entry inside the caller's transaction. The caller must
/// already hold the write lock.
pub(crate) async fn record_entry(
    conn: &mut SqliteConnection,
    card_id: u32,
    user_id: u32,
    now: i64,
) -> Result<(), DatabaseError> {
    let mut state = match GateDatabase::load_occupancy(conn, card_id).await? {
        Some(row) => OccupancyState::from_row(&row)?,
        None => OccupancyState::new(card_id, user_id),
    };
    state.enter(user_id, now);
    GateDatabase::store_occupancy(conn, &state.to_row(now)).await
}

/// Operator-facing reads and transitions.
#[derive(Clone)]
pub struct OccupancyEngine {
    db: GateDatabase,
}

impl OccupancyEngine {
    pub const fn new(db: GateDatabase) -> Self {
        Self { db }
    }

    pub async fn get(&self, card_id: u32) -> Result<OccupancyView, GateError> {
        let row = self
            .db
            .get_occupancy(card_id)
            .await?
            .ok_or_else(|| GateError::NotFound(format!("No occupancy for card {card_id}")))?;
        Ok(OccupancyState::from_row(&row)?.view())
    }

    /// Move the card outside. Exiting a card that is already outside
    /// changes nothing and returns its current state.
    pub async fn exit(&self, card_id: u32) -> Result<OccupancyView, GateError> {
        self.transition(card_id, |state, now| {
            if state.exit(now) {
                info!(card_id, total = state.cumulative_secs, "Card exited");
            }
        })
        .await
    }

    pub async fn reset(&self, card_id: u32) -> Result<OccupancyView, GateError> {
        self.transition(card_id, |state, _| {
            state.reset();
            info!(card_id, "Occupancy reset");
        })
        .await
    }

    async fn transition(
        &self,
        card_id: u32,
        apply: impl FnOnce(&mut OccupancyState, i64),
    ) -> Result<OccupancyView, GateError> {
        let now = unix_timestamp();
        let mut tx = self.db.pool().begin().await?;

        if !GateDatabase::lock_occupancy(&mut tx, card_id).await? {
            return Err(GateError::NotFound(format!(
                "No occupancy for card {card_id}"
            )));
        }
        let row = GateDatabase::load_occupancy(&mut tx, card_id)
            .await?
            .ok_or_else(|| GateError::NotFound(format!("No occupancy for card {card_id}")))?;

        let mut state = OccupancyState::from_row(&row)?;
        apply(&mut state, now);
        GateDatabase::store_occupancy(&mut tx, &state.to_row(now)).await?;
        tx.commit().await?;

        Ok(state.view())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn entry_starts_clock_once() {
        let mut state = OccupancyState::new(1, 2);
        state.enter(2, 100);
        assert!(state.inside);
        assert_eq!(state.start_time, Some(100));

        state.enter(2, 150);
        assert_eq!(state.start_time, Some(100));
    }

    #[test]
    fn exit_accumulates_and_is_idempotent() {
        let mut state = OccupancyState::new(1, 2);
        state.enter(2, 100);
        assert!(state.exit(160));
        assert!(!state.inside);
        assert_eq!(state.end_time, Some(160));
        assert_eq!(state.cumulative_secs, 60);

        assert!(!state.exit(500));
        assert_eq!(state.cumulative_secs, 60);

        state.enter(2, 1_000);
        assert_eq!(state.start_time, Some(1_000));
        state.exit(1_040);
        assert_eq!(state.cumulative_secs, 100);
    }

    #[test]
    fn reset_keeps_total() {
        let mut state = OccupancyState::new(1, 2);
        state.enter(2, 100);
        state.exit(130);
        state.enter(2, 200);
        state.reset();
        assert!(!state.inside);
        assert_eq!(state.start_time, None);
        assert_eq!(state.end_time, None);
        assert_eq!(state.cumulative_secs, 30);
    }

    #[tokio::test]
    async fn engine_exit_and_reset_persist() {
        let db = GateDatabase::open_in_memory().await.unwrap();
        let engine = OccupancyEngine::new(db.clone());
        assert!(matches!(engine.get(9).await, Err(GateError::NotFound(_))));
        assert!(matches!(engine.exit(9).await, Err(GateError::NotFound(_))));

        let mut conn = db.pool().acquire().await.unwrap();
        let now = unix_timestamp();
        record_entry(&mut conn, 9, 90, now - 30).await.unwrap();
        drop(conn);

        let inside = engine.get(9).await.unwrap();
        assert!(inside.is_inside_workplace);
        assert_eq!(inside.user_id, CredentialId(90));

        let outside = engine.exit(9).await.unwrap();
        assert!(!outside.is_inside_workplace);
        assert!(outside.cumulative_time_in_office >= 30);

        let again = engine.exit(9).await.unwrap();
        assert_eq!(again, outside);

        let reset = engine.reset(9).await.unwrap();
        assert_eq!(reset.start_time, None);
        assert_eq!(
            reset.cumulative_time_in_office,
            outside.cumulative_time_in_office
        );
    }
}
