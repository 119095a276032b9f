//! Integration tests for delete-time usage checks.
//!
//! Statuses, labels, and users must not be deletable while any task
//! still references them, and a blocked deletion must leave the record
//! untouched.

use taskboard::auth::Identity;
use taskboard::db::Database;
use taskboard::db::refs::ReferenceChecker;
use taskboard::error::ErrorCode;
use taskboard::handlers;
use taskboard::types::{TaskInput, User};

fn setup_db() -> Database {
    Database::open_in_memory().expect("Failed to create in-memory database")
}

fn seed_user(db: &Database, username: &str) -> User {
    db.create_user(username, "Test", "User", None, "irrelevant-hash")
        .expect("Failed to create user")
}

fn seed_task(db: &Database, author: &User, status_id: i64, input: TaskInput) -> i64 {
    db.create_task(
        author.id,
        &TaskInput {
            name: "task".to_string(),
            status_id,
            ..input
        },
    )
    .expect("Failed to create task")
    .id
}

mod status_guard_tests {
    use super::*;

    #[test]
    fn referenced_status_cannot_be_deleted() {
        let db = setup_db();
        let user = seed_user(&db, "alice");
        let status = db.create_status("new").unwrap();
        seed_task(&db, &user, status.id, TaskInput::default());

        let identity = Identity::authenticated(user);
        let err = handlers::statuses::delete(&db, &identity, status.id).unwrap_err();

        assert_eq!(err.code, ErrorCode::InUse);
        assert!(db.get_status(status.id).unwrap().is_some());
    }

    #[test]
    fn unreferenced_status_deletes_cleanly() {
        let db = setup_db();
        let user = seed_user(&db, "alice");
        let status = db.create_status("orphan").unwrap();

        let identity = Identity::authenticated(user);
        handlers::statuses::delete(&db, &identity, status.id).unwrap();

        assert!(db.get_status(status.id).unwrap().is_none());
    }

    #[test]
    fn status_becomes_deletable_after_last_task_is_gone() {
        let db = setup_db();
        let user = seed_user(&db, "alice");
        let status = db.create_status("new").unwrap();
        let task_id = seed_task(&db, &user, status.id, TaskInput::default());

        let identity = Identity::authenticated(user);
        assert_eq!(
            handlers::statuses::delete(&db, &identity, status.id)
                .unwrap_err()
                .code,
            ErrorCode::InUse
        );

        db.delete_task(task_id).unwrap();
        handlers::statuses::delete(&db, &identity, status.id).unwrap();
        assert!(db.get_status(status.id).unwrap().is_none());
    }

    #[test]
    fn deleting_unknown_status_reports_not_found() {
        let db = setup_db();
        let user = seed_user(&db, "alice");

        let identity = Identity::authenticated(user);
        let err = handlers::statuses::delete(&db, &identity, 9999).unwrap_err();

        assert_eq!(err.code, ErrorCode::StatusNotFound);
    }
}

mod label_guard_tests {
    use super::*;

    #[test]
    fn referenced_label_cannot_be_deleted() {
        let db = setup_db();
        let user = seed_user(&db, "alice");
        let status = db.create_status("new").unwrap();
        let label = db.create_label("bug").unwrap();
        seed_task(
            &db,
            &user,
            status.id,
            TaskInput {
                label_ids: vec![label.id],
                ..Default::default()
            },
        );

        let identity = Identity::authenticated(user);
        let err = handlers::labels::delete(&db, &identity, label.id).unwrap_err();

        assert_eq!(err.code, ErrorCode::InUse);
        assert!(db.get_label(label.id).unwrap().is_some());
    }

    #[test]
    fn unreferenced_label_deletes_cleanly() {
        let db = setup_db();
        let user = seed_user(&db, "alice");
        let label = db.create_label("orphan").unwrap();

        let identity = Identity::authenticated(user);
        handlers::labels::delete(&db, &identity, label.id).unwrap();

        assert!(db.get_label(label.id).unwrap().is_none());
    }

    #[test]
    fn detaching_the_label_unblocks_deletion() {
        let db = setup_db();
        let user = seed_user(&db, "alice");
        let status = db.create_status("new").unwrap();
        let label = db.create_label("bug").unwrap();
        let task_id = seed_task(
            &db,
            &user,
            status.id,
            TaskInput {
                label_ids: vec![label.id],
                ..Default::default()
            },
        );

        // Update the task to drop the label, then deletion must succeed
        db.update_task(
            task_id,
            &TaskInput {
                name: "task".to_string(),
                status_id: status.id,
                label_ids: vec![],
                ..Default::default()
            },
        )
        .unwrap();

        let identity = Identity::authenticated(user);
        handlers::labels::delete(&db, &identity, label.id).unwrap();
        assert!(db.get_label(label.id).unwrap().is_none());
    }
}

mod user_guard_tests {
    use super::*;

    #[test]
    fn task_author_cannot_be_deleted() {
        let db = setup_db();
        let user = seed_user(&db, "alice");
        let status = db.create_status("new").unwrap();
        seed_task(&db, &user, status.id, TaskInput::default());

        // Scenario: the user tries to delete their own account while
        // still authoring a task
        let identity = Identity::authenticated(user.clone());
        let err = handlers::users::delete(&db, &identity, user.id).unwrap_err();

        assert_eq!(err.code, ErrorCode::InUse);
        assert!(db.get_user(user.id).unwrap().is_some());
    }

    #[test]
    fn task_executor_cannot_be_deleted() {
        let db = setup_db();
        let author = seed_user(&db, "alice");
        let executor = seed_user(&db, "bob");
        let status = db.create_status("new").unwrap();
        seed_task(
            &db,
            &author,
            status.id,
            TaskInput {
                executor_id: Some(executor.id),
                ..Default::default()
            },
        );

        let identity = Identity::authenticated(executor.clone());
        let err = handlers::users::delete(&db, &identity, executor.id).unwrap_err();

        assert_eq!(err.code, ErrorCode::InUse);
        assert!(db.get_user(executor.id).unwrap().is_some());
    }

    #[test]
    fn unreferenced_user_can_delete_own_account() {
        let db = setup_db();
        let user = seed_user(&db, "alice");

        let identity = Identity::authenticated(user.clone());
        handlers::users::delete(&db, &identity, user.id).unwrap();

        assert!(db.get_user(user.id).unwrap().is_none());
    }
}

mod reference_checker_tests {
    use super::*;

    #[test]
    fn counts_track_task_references() {
        let db = setup_db();
        let user = seed_user(&db, "alice");
        let status = db.create_status("new").unwrap();
        let label = db.create_label("bug").unwrap();

        assert_eq!(db.status_references(status.id).unwrap(), 0);
        assert_eq!(db.label_references(label.id).unwrap(), 0);
        assert_eq!(db.user_references(user.id).unwrap(), 0);

        seed_task(
            &db,
            &user,
            status.id,
            TaskInput {
                label_ids: vec![label.id],
                ..Default::default()
            },
        );
        seed_task(&db, &user, status.id, TaskInput::default());

        assert_eq!(db.status_references(status.id).unwrap(), 2);
        assert_eq!(db.label_references(label.id).unwrap(), 1);
        assert_eq!(db.user_references(user.id).unwrap(), 2);
    }

    #[test]
    fn author_and_executor_on_one_task_count_once() {
        let db = setup_db();
        let user = seed_user(&db, "alice");
        let status = db.create_status("new").unwrap();
        seed_task(
            &db,
            &user,
            status.id,
            TaskInput {
                executor_id: Some(user.id),
                ..Default::default()
            },
        );

        assert_eq!(db.user_references(user.id).unwrap(), 1);
    }

    #[test]
    fn counts_for_unknown_ids_are_zero() {
        let db = setup_db();
        assert_eq!(db.status_references(9999).unwrap(), 0);
        assert_eq!(db.label_references(9999).unwrap(), 0);
        assert_eq!(db.user_references(9999).unwrap(), 0);
    }
}
