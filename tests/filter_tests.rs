//! Integration tests for the task filter queries.
//!
//! These tests verify that filter criteria combine by intersection,
//! results stay deduplicated, and ordering is stable, using an
//! in-memory SQLite database.

use taskboard::auth::Identity;
use taskboard::db::Database;
use taskboard::handlers;
use taskboard::types::{Task, TaskFilter, TaskInput, User};

/// Helper to create a fresh in-memory database for testing.
fn setup_db() -> Database {
    Database::open_in_memory().expect("Failed to create in-memory database")
}

fn seed_user(db: &Database, username: &str) -> User {
    db.create_user(username, "Test", "User", None, "irrelevant-hash")
        .expect("Failed to create user")
}

fn ids(tasks: &[Task]) -> Vec<i64> {
    let mut ids: Vec<i64> = tasks.iter().map(|t| t.id).collect();
    ids.sort();
    ids
}

/// Shared fixture:
/// T1(status=S1, label=L1, author=U1),
/// T2(status=S2, label=L2, author=U1, executor=U1),
/// T3(status=S1, labels={L1,L2}, author=U2, executor=U1).
struct Fixture {
    db: Database,
    u1: User,
    u2: User,
    s1: i64,
    s2: i64,
    l1: i64,
    l2: i64,
    t1: i64,
    t2: i64,
    t3: i64,
}

fn setup_fixture() -> Fixture {
    let db = setup_db();
    let u1 = seed_user(&db, "alice");
    let u2 = seed_user(&db, "bob");
    let s1 = db.create_status("new").unwrap().id;
    let s2 = db.create_status("done").unwrap().id;
    let l1 = db.create_label("bug").unwrap().id;
    let l2 = db.create_label("feature").unwrap().id;

    let t1 = db
        .create_task(
            u1.id,
            &TaskInput {
                name: "first".to_string(),
                status_id: s1,
                label_ids: vec![l1],
                ..Default::default()
            },
        )
        .unwrap()
        .id;
    let t2 = db
        .create_task(
            u1.id,
            &TaskInput {
                name: "second".to_string(),
                status_id: s2,
                executor_id: Some(u1.id),
                label_ids: vec![l2],
                ..Default::default()
            },
        )
        .unwrap()
        .id;
    let t3 = db
        .create_task(
            u2.id,
            &TaskInput {
                name: "third".to_string(),
                status_id: s1,
                executor_id: Some(u1.id),
                label_ids: vec![l1, l2],
                ..Default::default()
            },
        )
        .unwrap()
        .id;

    Fixture {
        db,
        u1,
        u2,
        s1,
        s2,
        l1,
        l2,
        t1,
        t2,
        t3,
    }
}

fn list(fx: &Fixture, identity: &Identity, filter: &TaskFilter) -> Vec<Task> {
    handlers::tasks::list(&fx.db, identity, filter).expect("Failed to list tasks")
}

mod single_criterion_tests {
    use super::*;

    #[test]
    fn no_criteria_returns_all_tasks() {
        let fx = setup_fixture();
        let tasks = list(&fx, &Identity::anonymous(), &TaskFilter::default());
        assert_eq!(ids(&tasks), vec![fx.t1, fx.t2, fx.t3]);
    }

    #[test]
    fn filter_by_status() {
        let fx = setup_fixture();
        let filter = TaskFilter {
            status: Some(fx.s2),
            ..Default::default()
        };
        let tasks = list(&fx, &Identity::anonymous(), &filter);
        assert_eq!(ids(&tasks), vec![fx.t2]);
    }

    #[test]
    fn filter_by_executor() {
        let fx = setup_fixture();
        let filter = TaskFilter {
            executor: Some(fx.u1.id),
            ..Default::default()
        };
        let tasks = list(&fx, &Identity::anonymous(), &filter);
        assert_eq!(ids(&tasks), vec![fx.t2, fx.t3]);
    }

    #[test]
    fn filter_by_label_is_membership_not_exact_match() {
        let fx = setup_fixture();
        let filter = TaskFilter {
            label: Some(fx.l1),
            ..Default::default()
        };
        let tasks = list(&fx, &Identity::anonymous(), &filter);
        // T3 carries both labels and still matches a single-label query
        assert_eq!(ids(&tasks), vec![fx.t1, fx.t3]);
    }

    #[test]
    fn filter_by_own_tasks_restricts_to_author() {
        let fx = setup_fixture();
        let filter = TaskFilter {
            own_tasks: true,
            ..Default::default()
        };
        let tasks = list(&fx, &Identity::authenticated(fx.u1.clone()), &filter);
        assert_eq!(ids(&tasks), vec![fx.t1, fx.t2]);
    }

    #[test]
    fn own_tasks_follows_the_acting_identity() {
        let fx = setup_fixture();
        let filter = TaskFilter {
            own_tasks: true,
            ..Default::default()
        };
        let tasks = list(&fx, &Identity::authenticated(fx.u2.clone()), &filter);
        assert_eq!(ids(&tasks), vec![fx.t3]);
    }

    #[test]
    fn own_tasks_is_a_noop_for_anonymous_visitors() {
        let fx = setup_fixture();
        let filter = TaskFilter {
            own_tasks: true,
            ..Default::default()
        };
        let tasks = list(&fx, &Identity::anonymous(), &filter);
        assert_eq!(ids(&tasks), vec![fx.t1, fx.t2, fx.t3]);
    }

    #[test]
    fn unknown_status_id_yields_empty_result_not_error() {
        let fx = setup_fixture();
        let filter = TaskFilter {
            status: Some(9999),
            ..Default::default()
        };
        let tasks = list(&fx, &Identity::anonymous(), &filter);
        assert!(tasks.is_empty());
    }

    #[test]
    fn unknown_label_id_yields_empty_result_not_error() {
        let fx = setup_fixture();
        let filter = TaskFilter {
            label: Some(9999),
            ..Default::default()
        };
        let tasks = list(&fx, &Identity::anonymous(), &filter);
        assert!(tasks.is_empty());
    }
}

mod combined_criteria_tests {
    use super::*;

    #[test]
    fn status_and_executor_combine_by_intersection() {
        let fx = setup_fixture();
        let filter = TaskFilter {
            status: Some(fx.s1),
            executor: Some(fx.u1.id),
            ..Default::default()
        };
        let tasks = list(&fx, &Identity::anonymous(), &filter);
        assert_eq!(ids(&tasks), vec![fx.t3]);
    }

    #[test]
    fn filtered_result_equals_intersection_of_per_criterion_sets() {
        let fx = setup_fixture();
        let identity = Identity::authenticated(fx.u1.clone());

        let by_status = ids(&list(
            &fx,
            &identity,
            &TaskFilter {
                status: Some(fx.s1),
                ..Default::default()
            },
        ));
        let by_label = ids(&list(
            &fx,
            &identity,
            &TaskFilter {
                label: Some(fx.l1),
                ..Default::default()
            },
        ));
        let combined = ids(&list(
            &fx,
            &identity,
            &TaskFilter {
                status: Some(fx.s1),
                label: Some(fx.l1),
                ..Default::default()
            },
        ));

        let expected: Vec<i64> = by_status
            .iter()
            .filter(|id| by_label.contains(id))
            .copied()
            .collect();
        assert_eq!(combined, expected);
    }

    #[test]
    fn conflicting_criteria_yield_empty_result_not_error() {
        let fx = setup_fixture();
        // No task has status S2 and label L1 at once
        let filter = TaskFilter {
            status: Some(fx.s2),
            label: Some(fx.l1),
            ..Default::default()
        };
        let tasks = list(&fx, &Identity::anonymous(), &filter);
        assert!(tasks.is_empty());
    }

    #[test]
    fn all_four_criteria_together() {
        let fx = setup_fixture();
        let filter = TaskFilter {
            status: Some(fx.s2),
            executor: Some(fx.u1.id),
            label: Some(fx.l2),
            own_tasks: true,
        };
        let tasks = list(&fx, &Identity::authenticated(fx.u1.clone()), &filter);
        assert_eq!(ids(&tasks), vec![fx.t2]);
    }
}

mod result_shape_tests {
    use super::*;

    #[test]
    fn multi_label_task_appears_once() {
        let fx = setup_fixture();
        for label in [fx.l1, fx.l2] {
            let filter = TaskFilter {
                label: Some(label),
                ..Default::default()
            };
            let tasks = list(&fx, &Identity::anonymous(), &filter);
            let t3_count = tasks.iter().filter(|t| t.id == fx.t3).count();
            assert_eq!(t3_count, 1);
        }
    }

    #[test]
    fn filtering_twice_yields_identical_results() {
        let fx = setup_fixture();
        let filter = TaskFilter {
            label: Some(fx.l1),
            ..Default::default()
        };
        let first: Vec<i64> = list(&fx, &Identity::anonymous(), &filter)
            .iter()
            .map(|t| t.id)
            .collect();
        let second: Vec<i64> = list(&fx, &Identity::anonymous(), &filter)
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn tasks_are_ordered_newest_first() {
        let fx = setup_fixture();
        let tasks = list(&fx, &Identity::anonymous(), &TaskFilter::default());
        let listed: Vec<i64> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(listed, vec![fx.t3, fx.t2, fx.t1]);
    }

    #[test]
    fn rows_resolve_relationship_names() {
        let fx = setup_fixture();
        let tasks = list(&fx, &Identity::anonymous(), &TaskFilter::default());
        let t3 = tasks.iter().find(|t| t.id == fx.t3).unwrap();

        assert_eq!(t3.status_name, "new");
        assert_eq!(t3.author_name, "Test User");
        assert_eq!(t3.executor_name.as_deref(), Some("Test User"));
        let mut label_names: Vec<&str> = t3.labels.iter().map(|l| l.name.as_str()).collect();
        label_names.sort();
        assert_eq!(label_names, vec!["bug", "feature"]);
    }

    #[test]
    fn sentinel_id_from_malformed_param_matches_nothing() {
        let fx = setup_fixture();
        let tasks = fx
            .db
            .list_tasks(Some(-1), None, None, None)
            .expect("Failed to list tasks");
        assert!(tasks.is_empty());
    }
}
