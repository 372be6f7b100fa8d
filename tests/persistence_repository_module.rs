use credisphere::persistence::{
    ClassificationData, Credential, NewChatMessage, NewReport, PersistenceError, ReportDataSection,
    ReportRepository, ReportStore, ReportUpdate, UploadedFileRecord, UploadsData, User, UserInputsData, UserStore,
};
use credisphere::shared::{ReportId, UserId};
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::thread;
use tempfile::TempDir;

fn repo() -> (TempDir, ReportRepository) {
    let dir = tempfile::tempdir().expect("tempdir");
    let repo = ReportRepository::open(&dir.path().join("state/credisphere.db")).expect("open");
    repo.ensure_schema().expect("schema");
    (dir, repo)
}

fn user_id(raw: &str) -> UserId {
    UserId::parse(raw).expect("user id")
}

fn report_id(raw: &str) -> ReportId {
    ReportId::parse(raw).expect("report id")
}

fn create(repo: &ReportRepository, id: &str, owner: &str, created_at: i64) -> ReportId {
    let report_id = report_id(id);
    repo.create_report(&NewReport {
        report_id: report_id.clone(),
        user_id: user_id(owner),
        initial_context: format!("query for {id}"),
        created_at,
    })
    .expect("create report");
    report_id
}

fn classification() -> ReportDataSection {
    ReportDataSection::Classification(ClassificationData {
        api_calls: vec!["bureauA".to_string()],
        requested_data: vec![vec!["ssn".to_string()]],
        form_fields: vec!["ssn".to_string()],
    })
}

#[test]
fn reports_are_scoped_to_their_owner() {
    let (_dir, repo) = repo();
    let id = create(&repo, "rpt-a-0001", "usr-owner-0001", 100);

    let owned = repo
        .get_report(&id, &user_id("usr-owner-0001"))
        .expect("get")
        .expect("owned report");
    assert_eq!(owned.initial_context, "query for rpt-a-0001");
    assert!(owned.text_paragraph_markdown.is_none());
    assert!(owned.other_json_data.is_none());

    assert!(repo
        .get_report(&id, &user_id("usr-other-0001"))
        .expect("get")
        .is_none());
    assert!(repo.report_exists(&id).expect("exists"));
    assert!(!repo.report_exists(&report_id("rpt-missing-0001")).expect("exists"));
}

#[test]
fn creating_a_taken_report_id_is_a_distinct_error_and_keeps_the_first_row() {
    let (_dir, repo) = repo();
    let id = create(&repo, "rpt-dup-0001", "usr-owner-0001", 100);

    let err = repo
        .create_report(&NewReport {
            report_id: id.clone(),
            user_id: user_id("usr-other-0001"),
            initial_context: "second query".to_string(),
            created_at: 200,
        })
        .expect_err("duplicate id");
    match err {
        PersistenceError::ReportIdTaken { report_id } => assert_eq!(report_id, "rpt-dup-0001"),
        other => panic!("unexpected error: {other}"),
    }

    let kept = repo
        .get_report(&id, &user_id("usr-owner-0001"))
        .expect("get")
        .expect("first row kept");
    assert_eq!(kept.initial_context, "query for rpt-dup-0001");
}

#[test]
fn listing_is_newest_first() {
    let (_dir, repo) = repo();
    create(&repo, "rpt-old-0001", "usr-owner-0001", 100);
    create(&repo, "rpt-new-0001", "usr-owner-0001", 300);
    create(&repo, "rpt-mid-0001", "usr-owner-0001", 200);
    create(&repo, "rpt-else-0001", "usr-other-0001", 400);

    let ids: Vec<String> = repo
        .list_reports_by_user(&user_id("usr-owner-0001"))
        .expect("list")
        .into_iter()
        .map(|summary| summary.report_id.to_string())
        .collect();
    assert_eq!(ids, vec!["rpt-new-0001", "rpt-mid-0001", "rpt-old-0001"]);
}

#[test]
fn update_merges_sections_and_keeps_unknown_keys() {
    let (_dir, repo) = repo();
    let owner = user_id("usr-owner-0001");
    let id = create(&repo, "rpt-a-0001", owner.as_str(), 100);

    let connection = Connection::open(repo.db_path()).expect("raw connection");
    connection
        .execute(
            "UPDATE reports SET other_json_data = ?1 WHERE report_id = ?2",
            params![r#"{"legacy":{"note":"keep me"}}"#, id.as_str()],
        )
        .expect("seed blob");

    repo.update_report_data(&id, &owner, ReportUpdate::section(classification()))
        .expect("classification");
    let updated = repo
        .update_report_data(
            &id,
            &owner,
            ReportUpdate {
                markdown: Some("narrative".to_string()),
                sections: vec![ReportDataSection::UserInputs(UserInputsData {
                    values: BTreeMap::from([("ssn".to_string(), "123".to_string())]),
                })],
            },
        )
        .expect("inputs");

    let data = updated.other_json_data.expect("blob");
    assert_eq!(data.as_map()["legacy"]["note"], "keep me");
    assert!(data.classification().is_some());
    assert!(data.user_inputs().is_some());
    assert_eq!(updated.text_paragraph_markdown.as_deref(), Some("narrative"));

    let untouched = repo
        .update_report_data(&id, &owner, ReportUpdate::default())
        .expect("no-op update");
    assert_eq!(untouched.text_paragraph_markdown.as_deref(), Some("narrative"));
}

#[test]
fn update_for_wrong_owner_is_not_found() {
    let (_dir, repo) = repo();
    let id = create(&repo, "rpt-a-0001", "usr-owner-0001", 100);

    let err = repo
        .update_report_data(
            &id,
            &user_id("usr-other-0001"),
            ReportUpdate::section(classification()),
        )
        .expect_err("wrong owner");
    assert!(err.to_string().contains("rpt-a-0001"));
}

#[test]
fn concurrent_upload_merges_do_not_lose_records() {
    let (_dir, repo) = repo();
    let owner = user_id("usr-owner-0001");
    let id = create(&repo, "rpt-a-0001", owner.as_str(), 100);

    let handles: Vec<_> = (0..2)
        .map(|worker| {
            let repo = repo.clone();
            let owner = owner.clone();
            let id = id.clone();
            thread::spawn(move || {
                for idx in 0..5 {
                    let section = ReportDataSection::Uploads(UploadsData {
                        files: vec![UploadedFileRecord {
                            file_name: format!("w{worker}-{idx}.pdf"),
                            size_bytes: 1,
                            uploaded_at: 0,
                        }],
                    });
                    repo.update_report_data(&id, &owner, ReportUpdate::section(section))
                        .expect("merge upload");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("join worker");
    }

    let uploads = repo
        .get_report(&id, &owner)
        .expect("get")
        .and_then(|report| report.other_json_data)
        .and_then(|data| data.uploads())
        .expect("uploads");
    assert_eq!(uploads.files.len(), 10);
}

#[test]
fn delete_is_scoped_and_cascades_chat() {
    let (_dir, repo) = repo();
    let owner = user_id("usr-owner-0001");
    let id = create(&repo, "rpt-a-0001", owner.as_str(), 100);
    repo.append_chat_message(&NewChatMessage {
        report_id: id.clone(),
        user_id: owner.clone(),
        content: "hello".to_string(),
        is_user: true,
        timestamp: 1_000,
    })
    .expect("append");

    assert!(!repo
        .delete_report(&id, &user_id("usr-other-0001"))
        .expect("delete by other"));
    assert!(repo.report_exists(&id).expect("exists"));

    assert!(repo.delete_report(&id, &owner).expect("delete"));
    assert!(!repo.report_exists(&id).expect("exists"));
    assert!(repo
        .list_chat_messages(&id, &owner)
        .expect("list")
        .is_empty());
    assert!(!repo.delete_report(&id, &owner).expect("second delete"));
}

#[test]
fn chat_messages_list_in_timestamp_then_insertion_order() {
    let (_dir, repo) = repo();
    let owner = user_id("usr-owner-0001");
    let id = create(&repo, "rpt-a-0001", owner.as_str(), 100);
    for (content, is_user, timestamp) in [
        ("second", false, 2_000),
        ("first", true, 1_000),
        ("tie-a", true, 3_000),
        ("tie-b", false, 3_000),
    ] {
        repo.append_chat_message(&NewChatMessage {
            report_id: id.clone(),
            user_id: owner.clone(),
            content: content.to_string(),
            is_user,
            timestamp,
        })
        .expect("append");
    }

    let contents: Vec<String> = repo
        .list_chat_messages(&id, &owner)
        .expect("list")
        .into_iter()
        .map(|message| message.content)
        .collect();
    assert_eq!(contents, vec!["first", "second", "tie-a", "tie-b"]);
    assert!(repo
        .list_chat_messages(&id, &user_id("usr-other-0001"))
        .expect("list other")
        .is_empty());
}

#[test]
fn users_and_credentials_round_trip() {
    let (_dir, repo) = repo();
    let user = User {
        id: user_id("usr-owner-0001"),
        email: "Analyst@Example.com".to_string(),
        organization_name: "Acme Lending".to_string(),
        created_at: 100,
    };
    repo.insert_user(&user).expect("insert user");
    assert_eq!(repo.get_user(&user.id).expect("get"), Some(user.clone()));
    assert!(repo
        .get_user(&user_id("usr-missing-0001"))
        .expect("get")
        .is_none());

    repo.insert_credential(&Credential {
        user_id: user.id.clone(),
        email: user.email.clone(),
        password_salt: "salt".to_string(),
        password_hash: "hash".to_string(),
    })
    .expect("insert credential");
    let found = repo
        .find_credential_by_email("analyst@example.COM")
        .expect("find")
        .expect("case-insensitive match");
    assert_eq!(found.user_id, user.id);

    let duplicate = repo.insert_credential(&Credential {
        user_id: user_id("usr-second-0001"),
        email: "ANALYST@example.com".to_string(),
        password_salt: "salt".to_string(),
        password_hash: "hash".to_string(),
    });
    assert!(duplicate.is_err());
}
