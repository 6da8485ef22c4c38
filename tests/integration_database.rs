use plannercal::{Database, ExternalEvent};
use tempfile::NamedTempFile;

async fn create_test_database() -> Database {
    let temp_file = NamedTempFile::new().unwrap();
    let (_, path) = temp_file.keep().unwrap();
    let db_path = format!("sqlite:{}", path.to_str().unwrap());

    Database::open(&db_path).await.unwrap()
}

fn event(uid: &str, start: i64) -> ExternalEvent {
    ExternalEvent {
        uid: uid.to_string(),
        name: format!("Event {}", uid),
        start,
        end: start + 1800,
        calendar_id: 0,
    }
}

#[tokio::test]
async fn test_full_external_calendar_workflow() {
    let db = create_test_database().await;

    // 1. Add a calendar
    let calendar_id = db
        .add_external_calendar("Robotics", "https://example.com/robotics.ics")
        .await
        .unwrap();
    assert!(calendar_id > 0);

    // 2. Verify it was saved, enabled and never synced
    let calendars = db.get_external_calendars().await.unwrap();
    assert_eq!(calendars.len(), 1);
    assert_eq!(calendars[0].provider_id(), format!("calendar-external-{}", calendar_id));
    assert!(calendars[0].enabled);
    assert!(calendars[0].last_synced_at.is_none());

    // 3. Import events
    db.replace_external_events(calendar_id, &[event("a", 1_000), event("b", 2_000)])
        .await
        .unwrap();
    let stored = db.get_external_events(calendar_id).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|e| e.calendar_id == calendar_id));

    // 4. Sync time was stamped
    let calendars = db.get_external_calendars().await.unwrap();
    assert!(calendars[0].last_synced_at.is_some());

    // 5. Disabling hides it from the enabled list but keeps its events
    db.set_external_calendar_enabled(calendar_id, false).await.unwrap();
    assert!(db.get_enabled_external_calendars().await.unwrap().is_empty());
    assert_eq!(db.get_external_events(calendar_id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_replacing_one_calendar_leaves_others_alone() {
    let db = create_test_database().await;

    let school = db.add_external_calendar("School", "https://example.com/school.ics").await.unwrap();
    let club = db.add_external_calendar("Club", "https://example.com/club.ics").await.unwrap();

    db.replace_external_events(school, &[event("s1", 10), event("s2", 20)]).await.unwrap();
    db.replace_external_events(club, &[event("c1", 30)]).await.unwrap();
    db.replace_external_events(school, &[]).await.unwrap();

    assert!(db.get_external_events(school).await.unwrap().is_empty());
    let club_events = db.get_external_events(club).await.unwrap();
    assert_eq!(club_events.len(), 1);
    assert_eq!(club_events[0].uid, "c1");
}

#[tokio::test]
async fn test_task_completion_marker() {
    let db = create_test_database().await;

    assert!(db.get_last_completion("calendar_sync").await.unwrap().is_none());
    db.update_last_completion("calendar_sync").await.unwrap();
    assert_eq!(
        db.get_last_completion("calendar_sync").await.unwrap(),
        Some(chrono::Utc::now().date_naive())
    );
}
