//! Storage layer tests for Gatekeep.

use gatekeep_core::db::{DatabaseError, unix_timestamp};
use gatekeep_core::{CommandName, EntryType};
use serde_json::json;

use super::{GateDatabase, LogFilter, NewAccessLog, NewCommand, Occupancy};

const MAC: &str = "AA:BB:CC:DD:EE:01";

async fn test_db() -> GateDatabase {
    let db = GateDatabase::open_in_memory().await.unwrap();
    db.create_device(MAC).await.unwrap();
    db
}

fn beep(repeat: u32) -> NewCommand {
    NewCommand {
        name: CommandName::SetSuccessBeep,
        payload: json!({"duration": 100, "repeat": repeat}),
    }
}

fn scan(card_id: u32, timestamp: i64) -> NewAccessLog {
    NewAccessLog {
        card_id,
        user_id: card_id + 1000,
        entry_type: EntryType::EntryAllowed,
        timestamp,
    }
}

async fn insert_logs(db: &GateDatabase, logs: &[NewAccessLog]) {
    let mut tx = db.pool().begin().await.unwrap();
    for log in logs {
        GateDatabase::insert_access_log(&mut tx, MAC, log, unix_timestamp())
            .await
            .unwrap();
    }
    tx.commit().await.unwrap();
}

// === Device tests ===

#[tokio::test]
async fn create_and_get_device() {
    let db = test_db().await;
    let device = db.get_device(MAC).await.unwrap();
    assert_eq!(device.mac_address, MAC);
    assert!(device.last_acknowledged_command_id.is_none());
    assert!(matches!(
        db.get_device("AA:BB:CC:DD:EE:02").await,
        Err(DatabaseError::NotFound(_))
    ));
}

#[tokio::test]
async fn duplicate_device_is_a_conflict() {
    let db = test_db().await;
    assert!(matches!(
        db.create_device(MAC).await,
        Err(DatabaseError::Conflict(_))
    ));
}

#[tokio::test]
async fn acknowledged_command_never_moves_backwards() {
    let db = test_db().await;
    assert!(db.advance_acknowledged_command(MAC, 5).await.unwrap());
    assert!(!db.advance_acknowledged_command(MAC, 3).await.unwrap());
    assert!(!db.advance_acknowledged_command(MAC, 5).await.unwrap());
    assert!(db.advance_acknowledged_command(MAC, 9).await.unwrap());
    let device = db.get_device(MAC).await.unwrap();
    assert_eq!(device.last_acknowledged_command_id, Some(9));
}

// === Command tests ===

#[tokio::test]
async fn pending_commands_are_fifo() {
    let db = test_db().await;
    let ids = db
        .insert_commands(MAC, &[beep(1), beep(2), beep(3)])
        .await
        .unwrap();
    assert!(ids.windows(2).all(|w| w[0] < w[1]));

    let pending = db.pending_commands(MAC).await.unwrap();
    let pending_ids: Vec<i64> = pending.iter().map(|c| c.id).collect();
    assert_eq!(pending_ids, ids);
    assert_eq!(
        pending[1].to_dto().unwrap().payload,
        json!({"duration": 100, "repeat": 2})
    );
}

#[tokio::test]
async fn mark_sent_is_guarded() {
    let db = test_db().await;
    let ids = db.insert_commands(MAC, &[beep(1), beep(2)]).await.unwrap();

    assert_eq!(db.mark_commands_sent(&ids).await.unwrap(), ids);
    assert!(db.mark_commands_sent(&ids).await.unwrap().is_empty());
    assert!(db.pending_commands(MAC).await.unwrap().is_empty());
    assert_eq!(db.last_sent_command_id(MAC).await.unwrap(), Some(ids[1]));

    let command = db.get_command(ids[0]).await.unwrap();
    assert!(command.sent);
    assert!(command.sent_at.is_some());
}

#[tokio::test]
async fn sent_flag_cannot_be_cleared() {
    let db = test_db().await;
    let ids = db.insert_commands(MAC, &[beep(1)]).await.unwrap();
    db.mark_commands_sent(&ids).await.unwrap();
    let result = sqlx::query("UPDATE commands SET sent = 0 WHERE id = ?")
        .bind(ids[0])
        .execute(db.pool())
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn commands_for_unknown_device_are_rejected() {
    let db = test_db().await;
    assert!(
        db.insert_commands("AA:BB:CC:DD:EE:99", &[beep(1)])
            .await
            .is_err()
    );
    assert_eq!(db.count_pending_commands(MAC).await.unwrap(), 0);
}

// === Access log tests ===

#[tokio::test]
async fn list_access_logs_newest_first_with_filters() {
    let db = test_db().await;
    insert_logs(&db, &[scan(1, 100), scan(2, 300), scan(1, 200)]).await;

    let (all, total) = db.list_access_logs(LogFilter::All, 10, 0).await.unwrap();
    assert_eq!(total, 3);
    let stamps: Vec<i64> = all.iter().map(|l| l.timestamp).collect();
    assert_eq!(stamps, vec![300, 200, 100]);

    let (card, total) = db
        .list_access_logs(LogFilter::Card(1), 10, 0)
        .await
        .unwrap();
    assert_eq!(total, 2);
    assert!(card.iter().all(|l| l.card_id == 1));

    let (user, total) = db
        .list_access_logs(LogFilter::User(1002), 1, 0)
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(user[0].to_record().unwrap().card_id.get(), 2);
}

#[tokio::test]
async fn access_logs_are_append_only() {
    let db = test_db().await;
    insert_logs(&db, &[scan(1, 100)]).await;
    assert!(
        sqlx::query("UPDATE access_logs SET card_id = 7")
            .execute(db.pool())
            .await
            .is_err()
    );
    assert!(
        sqlx::query("DELETE FROM access_logs")
            .execute(db.pool())
            .await
            .is_err()
    );
}

// === Occupancy tests ===

#[tokio::test]
async fn occupancy_upsert_round_trip() {
    let db = test_db().await;
    assert!(db.get_occupancy(42).await.unwrap().is_none());

    let mut row = Occupancy {
        card_id: 42,
        user_id: 7,
        is_inside: true,
        start_time: Some(1_000),
        end_time: None,
        cumulative_secs: 0,
        updated_at: 1_000,
    };
    let mut conn = db.pool().acquire().await.unwrap();
    GateDatabase::store_occupancy(&mut conn, &row).await.unwrap();
    assert!(GateDatabase::lock_occupancy(&mut conn, 42).await.unwrap());
    assert!(!GateDatabase::lock_occupancy(&mut conn, 43).await.unwrap());

    row.is_inside = false;
    row.end_time = Some(1_600);
    row.cumulative_secs = 600;
    GateDatabase::store_occupancy(&mut conn, &row).await.unwrap();
    drop(conn);

    let stored = db.get_occupancy(42).await.unwrap().unwrap();
    assert!(!stored.is_inside);
    assert_eq!(stored.cumulative_secs, 600);
    assert_eq!(stored.start_time, Some(1_000));
}
