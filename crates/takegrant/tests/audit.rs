//! The audit contract: one record per command, attributed to the claimed
//! actor, and never able to undo a mutation.

use std::sync::Arc;

use async_trait::async_trait;

use takegrant::core::{AuditEntry, AuditId};
use takegrant::{
    Access, AuditAction, AuditRecord, Decision, Outcome, RightKind, System, SystemConfig,
    SystemError,
};
use takegrant_store::{AuditSink, MemoryStore, SqliteStore, Store, StoreError};
use takegrant_testkit::{login, register, test_config, Scenario, FILE1_CONTENT};

/// An audit sink that rejects every write.
struct OfflineSink;

#[async_trait]
impl AuditSink for OfflineSink {
    async fn record(&self, _entry: &AuditEntry) -> takegrant_store::Result<AuditId> {
        Err(StoreError::Busy("audit store offline".into()))
    }

    async fn recent(&self, _limit: usize) -> takegrant_store::Result<Vec<AuditRecord>> {
        Ok(Vec::new())
    }

    async fn all_records(&self) -> takegrant_store::Result<Vec<AuditRecord>> {
        Ok(Vec::new())
    }
}

async fn last_record<S: Store>(system: &System<S>) -> AuditRecord {
    system.show_audit(Some(1)).await.unwrap().remove(0)
}

#[tokio::test]
async fn test_every_command_is_recorded() {
    let s = Scenario::memory().await;
    let sys = &s.system;
    // register x3, login x3, create_object
    assert_eq!(sys.audit_sink().all_records().await.unwrap().len(), 7);

    sys.list_objects(Some(&s.user2_session)).await.unwrap();
    sys.check(Some(&s.user2_session), s.file1.id, RightKind::Read)
        .await
        .unwrap();
    sys.read_object(Some(&s.user1_session), s.file1.id)
        .await
        .unwrap();
    let _ = sys.logout(s.attacker_session.clone()).await;

    let records = sys.audit_sink().all_records().await.unwrap();
    assert_eq!(records.len(), 11);
    let ids: Vec<_> = records.iter().map(|r| r.id).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);

    let tail: Vec<_> = records[7..]
        .iter()
        .map(|r| (r.actor.as_str(), r.outcome))
        .collect();
    assert_eq!(
        tail,
        vec![
            ("user2", Outcome::Success),
            ("user2", Outcome::Denied),
            ("user1", Outcome::Success),
            ("attacker", Outcome::Success),
        ]
    );
}

#[tokio::test]
async fn test_show_audit_newest_first() {
    let s = Scenario::sqlite().await;

    let page = s.system.show_audit(None).await.unwrap();
    assert_eq!(page.len(), 7);
    assert_eq!(
        page[0].action,
        AuditAction::CreateObject {
            name: "file1".into()
        }
    );
    assert_eq!(page[0].object_name.as_deref(), Some("file1"));
    assert_eq!(page[6].action, AuditAction::Register);
    assert_eq!(page[6].actor, "user1");

    assert_eq!(s.system.show_audit(Some(2)).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_anonymous_attempts_are_recorded() {
    let s = Scenario::memory().await;

    let err = s
        .system
        .create_object(None, "file2", "x")
        .await
        .unwrap_err();
    assert!(matches!(err, SystemError::NotAuthenticated));
    let rec = last_record(&s.system).await;
    assert_eq!(rec.actor, "anonymous");
    assert_eq!(rec.outcome, Outcome::Fail);
    assert!(matches!(rec.action, AuditAction::Rejected { ref command, .. } if command == "create_object"));

    let read = s.system.read_object(None, s.file1.id).await.unwrap();
    assert_eq!(read.value, Access::Denied);
    let rec = last_record(&s.system).await;
    assert_eq!(rec.actor, "anonymous");
    assert_eq!(rec.outcome, Outcome::Denied);
    assert_eq!(rec.action, AuditAction::ReadObject { object: s.file1.id });

    let err = s
        .system
        .grant(None, s.user2.id, s.file1.id, RightKind::Read)
        .await
        .unwrap_err();
    assert!(matches!(err, SystemError::NotAuthenticated));
    assert!(s.system.store().rights_for_subject(s.user2.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_login_records_claimed_name() {
    let s = Scenario::memory().await;

    let err = s.system.login("user1", "wrong").await.unwrap_err();
    assert!(matches!(err, SystemError::InvalidCredentials));
    let err = s.system.login("nobody", "pass").await.unwrap_err();
    assert!(matches!(err, SystemError::InvalidCredentials));

    let rec = last_record(&s.system).await;
    assert_eq!(rec.actor, "nobody");
    assert_eq!(rec.action, AuditAction::Login);
    assert_eq!(rec.outcome, Outcome::Fail);
}

#[tokio::test]
async fn test_register_rules() {
    let s = Scenario::memory().await;

    let err = s.system.register("user1", "other").await.unwrap_err();
    assert!(matches!(err, SystemError::UsernameTaken(ref name) if name == "user1"));

    let err = s.system.register("   ", "x").await.unwrap_err();
    assert!(matches!(err, SystemError::Core(_)));

    let rec = last_record(&s.system).await;
    assert_eq!(rec.action, AuditAction::Register);
    assert_eq!(rec.outcome, Outcome::Fail);
}

#[tokio::test]
async fn test_unknown_kind_is_rejected_and_recorded() {
    let s = Scenario::sqlite().await;

    let d = s
        .system
        .grant_named(Some(&s.user1_session), s.user2.id, s.file1.id, "execute")
        .await
        .unwrap();
    assert!(!d.value.is_success());

    let rec = last_record(&s.system).await;
    assert_eq!(rec.outcome, Outcome::Fail);
    assert_eq!(rec.target_principal, Some(s.user2.id));
    assert!(matches!(rec.action, AuditAction::Rejected { ref command, .. } if command == "grant"));
}

#[tokio::test]
async fn test_admin_commands() {
    let s = Scenario::sqlite().await;
    let sys = &s.system;

    let err = sys.list_users(Some(&s.user2_session)).await.unwrap_err();
    assert!(matches!(err, SystemError::AdminRequired));
    let rec = last_record(sys).await;
    assert_eq!(rec.actor, "user2");
    assert_eq!(rec.outcome, Outcome::Denied);

    let err = sys.make_admin(None, s.user2.id).await.unwrap_err();
    assert!(matches!(err, SystemError::AdminRequired));
    assert_eq!(last_record(sys).await.actor, "anonymous");

    let users = sys.list_users(Some(&s.user1_session)).await.unwrap().value;
    assert_eq!(users.len(), 3);

    // Promotion takes effect on the existing session.
    sys.make_admin(Some(&s.user1_session), s.user2.id)
        .await
        .unwrap();
    assert!(sys.list_users(Some(&s.user2_session)).await.is_ok());

    sys.grant(Some(&s.user1_session), s.attacker.id, s.file1.id, RightKind::Read)
        .await
        .unwrap();
    sys.delete_user(Some(&s.user2_session), s.attacker.id)
        .await
        .unwrap();
    let rec = last_record(sys).await;
    assert_eq!(rec.target_principal, Some(s.attacker.id));
    assert!(sys.store().rights_for_subject(s.attacker.id).await.unwrap().is_empty());

    let err = sys
        .delete_user(Some(&s.user1_session), s.attacker.id)
        .await
        .unwrap_err();
    assert!(matches!(err, SystemError::NotFound(_)));
}

#[tokio::test]
async fn test_deleted_owner_leaves_object() {
    let s = Scenario::memory().await;

    s.system
        .make_admin(Some(&s.user1_session), s.user2.id)
        .await
        .unwrap();
    s.system
        .delete_user(Some(&s.user2_session), s.user1.id)
        .await
        .unwrap();

    let object = s.system.store().get_object(s.file1.id).await.unwrap().unwrap();
    assert_eq!(object.owner, s.user1.id);
    assert!(s.system.store().rights_for_object(s.file1.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_content_operations_follow_rights() {
    let s = Scenario::sqlite().await;
    let sys = &s.system;
    let file1 = s.file1.id;

    let read = sys.read_object(Some(&s.user1_session), file1).await.unwrap();
    assert_eq!(read.value.granted().unwrap().content, FILE1_CONTENT);

    let write = sys
        .write_object(Some(&s.user2_session), file1, "nope")
        .await
        .unwrap();
    assert_eq!(write.value, Access::Denied);

    sys.grant(Some(&s.user1_session), s.user2.id, file1, RightKind::Write)
        .await
        .unwrap();
    let write = sys
        .write_object(Some(&s.user2_session), file1, "Updated by user2")
        .await
        .unwrap();
    assert!(write.value.is_granted());

    // Write alone does not allow reading.
    let read = sys.read_object(Some(&s.user2_session), file1).await.unwrap();
    assert_eq!(read.value, Access::Denied);

    let read = sys.read_object(Some(&s.user1_session), file1).await.unwrap();
    assert_eq!(read.value.granted().unwrap().content, "Updated by user2");

    let err = sys
        .create_object(Some(&s.user2_session), "file1", "dup")
        .await
        .unwrap_err();
    assert!(matches!(err, SystemError::ObjectNameTaken(_)));
}

#[tokio::test]
async fn test_audit_failure_does_not_roll_back() {
    let store = Arc::new(MemoryStore::new());
    let system = System::with_audit_sink(
        Arc::clone(&store),
        Arc::new(OfflineSink),
        test_config(),
    );

    let audited = system.register("user1", "pass1").await.unwrap();
    assert!(!audited.is_recorded());
    let user1 = audited.value;
    let user2 = register(&system, "user2", "pass2").await;
    let session = login(&system, "user1", "pass1").await;

    let created = system
        .create_object(Some(&session), "file1", "c")
        .await
        .unwrap();
    assert!(matches!(
        created.audit_warning,
        Some(StoreError::Busy(_))
    ));
    let file1 = created.value;

    let granted = system
        .grant(Some(&session), user2.id, file1.id, RightKind::Read)
        .await
        .unwrap();
    assert_eq!(granted.value, Decision::Applied);
    assert!(granted.audit_warning.is_some());

    assert!(system
        .engine()
        .check(user2.id, file1.id, RightKind::Read)
        .await
        .unwrap());
    assert_eq!(store.rights_for_object(file1.id).await.unwrap().len(), 4);
    assert_eq!(file1.owner, user1.id);
}

#[tokio::test]
async fn test_refusal_reports_lost_audit_write() {
    let system = System::with_audit_sink(
        Arc::new(MemoryStore::new()),
        Arc::new(OfflineSink),
        test_config(),
    );
    register(&system, "user1", "pass1").await;

    let err = system.login("user1", "wrong").await.unwrap_err();
    assert!(matches!(err, SystemError::Unaudited { .. }));
    assert!(matches!(err.cause(), SystemError::InvalidCredentials));
    assert!(matches!(err.audit_warning(), Some(StoreError::Busy(_))));
    assert!(!err.is_fault());

    let err = system.list_users(None).await.unwrap_err();
    assert!(matches!(err.cause(), SystemError::AdminRequired));
    assert!(err.audit_warning().is_some());
}

#[tokio::test]
async fn test_store_faults_are_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("take_grant.db");
    let config = SystemConfig {
        database_path: Some(path.clone()),
        ..test_config()
    };
    let store = SqliteStore::open_with(&path, &config.store_config()).unwrap();
    let sink = Arc::new(MemoryStore::new());
    let system = System::with_audit_sink(Arc::new(store), sink.clone(), config);

    register(&system, "user1", "pass1").await;
    let session = login(&system, "user1", "pass1").await;
    let file1 = system
        .create_object(Some(&session), "file1", "c")
        .await
        .unwrap()
        .value;
    assert_eq!(sink.all_records().await.unwrap().len(), 3);

    let raw = rusqlite::Connection::open(&path).unwrap();
    raw.execute_batch("DROP TABLE rights;").unwrap();

    let err = system.read_object(Some(&session), file1.id).await.unwrap_err();
    assert!(err.is_fault());
    assert!(err.audit_warning().is_none());
    let records = sink.all_records().await.unwrap();
    assert_eq!(records.len(), 4);
    let last = records.last().unwrap();
    assert_eq!(last.action, AuditAction::ReadObject { object: file1.id });
    assert_eq!(last.outcome, Outcome::Fail);
    assert_eq!(last.actor, "user1");

    for result in [
        system.write_object(Some(&session), file1.id, "x").await.map(|_| ()),
        system.delete_object(Some(&session), file1.id).await.map(|_| ()),
    ] {
        assert!(result.unwrap_err().is_fault());
    }
    let records = sink.all_records().await.unwrap();
    assert_eq!(records.len(), 6);
    assert!(records[4..].iter().all(|r| r.outcome == Outcome::Fail));

    raw.execute_batch("DROP TABLE principals;").unwrap();
    let err = system.list_users(Some(&session)).await.unwrap_err();
    assert!(err.is_fault());
    let records = sink.all_records().await.unwrap();
    assert_eq!(records.len(), 7);
    let last = records.last().unwrap();
    assert_eq!(last.action, AuditAction::ListUsers);
    assert_eq!(last.outcome, Outcome::Fail);
}

#[tokio::test]
async fn test_grant_on_missing_object_is_not_found() {
    let s = Scenario::memory().await;
    let missing = takegrant::ObjectId(99);

    let err = s
        .system
        .grant(Some(&s.user1_session), s.user2.id, missing, RightKind::Read)
        .await
        .unwrap_err();
    assert!(matches!(err, SystemError::NotFound(_)));

    let err = s
        .system
        .take(Some(&s.user2_session), s.user1.id, missing, RightKind::Read)
        .await
        .unwrap_err();
    assert!(matches!(err, SystemError::NotFound(_)));

    let recent = s.system.show_audit(Some(2)).await.unwrap();
    assert!(recent.iter().all(|r| r.outcome == Outcome::Fail));
}
