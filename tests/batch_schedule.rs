use chrono::{NaiveDate, TimeZone, Utc};
use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
use subshift::api::schedule::{run_batch_create, run_batch_delete};
use subshift::entity::shift::{self, ShiftStatus};
use subshift::entity::user::UserRole;
use subshift::model::auth::AuthenticatedUser;
use subshift::model::global_error::{AppError, ErrorCode};
use subshift::model::schedule::{BatchCreateRequest, BatchDeleteRequest, SlotSelection};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn slot(label: &str, start: &str, end: &str, subjects: &[&str]) -> SlotSelection {
    SlotSelection {
        label: label.to_string(),
        start_time: start.to_string(),
        end_time: end.to_string(),
        subjects: subjects.iter().map(|s| s.to_string()).collect(),
    }
}

fn shift_row(id: i32, teacher_id: i32) -> shift::Model {
    shift::Model {
        id,
        title: "1교시 수학".to_string(),
        description: None,
        start_time: Utc.with_ymd_and_hms(2024, 1, 1, 18, 45, 0).unwrap(),
        end_time: Utc.with_ymd_and_hms(2024, 1, 1, 20, 5, 0).unwrap(),
        subject: "수학".to_string(),
        grade: None,
        location: None,
        status: ShiftStatus::Scheduled,
        teacher_id,
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        updated_at: None,
    }
}

fn teacher(id: i32) -> AuthenticatedUser {
    AuthenticatedUser {
        id,
        role: UserRole::Teacher,
    }
}

fn admin(id: i32) -> AuthenticatedUser {
    AuthenticatedUser {
        id,
        role: UserRole::Admin,
    }
}

#[tokio::test]
async fn batch_create_fast_fails_before_touching_the_database() {
    let db = MockDatabase::new(DatabaseBackend::MySql).into_connection();

    let request = BatchCreateRequest {
        start_date: date(2024, 1, 1),
        end_date: date(2024, 1, 14),
        weekdays: vec![9],
        slots: vec![],
        description: None,
        location: None,
    };

    let err = run_batch_create(&db, &request, 2).await.unwrap_err();

    match err {
        AppError::ValidationError(errors) => {
            let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
            assert_eq!(fields, vec!["slots", "weekdays"]);
        }
        other => panic!("유효성 오류가 아님: {:?}", other),
    }

    let log = format!("{:?}", db.into_transaction_log());
    assert_eq!(log, "[]");
}

#[tokio::test]
async fn batch_create_spawns_one_shift_per_date_slot_pair() {
    let db = MockDatabase::new(DatabaseBackend::MySql)
        .append_query_results([
            vec![shift_row(1, 2)],
            vec![shift_row(2, 2)],
            vec![shift_row(3, 2)],
            vec![shift_row(4, 2)],
        ])
        .append_exec_results([
            MockExecResult { last_insert_id: 1, rows_affected: 1 },
            MockExecResult { last_insert_id: 2, rows_affected: 1 },
            MockExecResult { last_insert_id: 3, rows_affected: 1 },
            MockExecResult { last_insert_id: 4, rows_affected: 1 },
        ])
        .into_connection();

    // 2024-01-01(월), 2024-01-03(수) × 교시 2개 = 4건
    let request = BatchCreateRequest {
        start_date: date(2024, 1, 1),
        end_date: date(2024, 1, 3),
        weekdays: vec![1, 3],
        slots: vec![
            slot("1교시", "18:45", "20:05", &["수학"]),
            slot("2교시", "20:15", "21:35", &["수학", "영어"]),
        ],
        description: Some("정규 보강".to_string()),
        location: Some("3강의실".to_string()),
    };

    let outcome = run_batch_create(&db, &request, 2).await.unwrap();

    assert_eq!(outcome.success_count(), 4);
    assert_eq!(outcome.failure_count(), 0);

    let log = format!("{:?}", db.into_transaction_log());
    assert_eq!(log.matches("INSERT INTO `shifts`").count(), 4);
    // 제목은 "교시 이름표 + 과목 목록"으로 합성된다
    assert!(log.contains("1교시 수학"));
    assert!(log.contains("2교시 수학, 영어"));
}

#[tokio::test]
async fn batch_create_records_failures_but_keeps_going() {
    let db = MockDatabase::new(DatabaseBackend::MySql)
        .append_query_results([vec![shift_row(1, 2)]])
        .append_exec_results([MockExecResult { last_insert_id: 1, rows_affected: 1 }])
        .into_connection();

    let request = BatchCreateRequest {
        start_date: date(2024, 1, 1),
        end_date: date(2024, 1, 1),
        weekdays: vec![1],
        slots: vec![
            slot("1교시", "18:45", "20:05", &["수학"]),
            slot("2교시", "25:00", "26:00", &["영어"]),
        ],
        description: None,
        location: None,
    };

    let outcome = run_batch_create(&db, &request, 2).await.unwrap();

    assert_eq!(outcome.success_count(), 1);
    assert_eq!(outcome.failure_count(), 1);
    assert_eq!(outcome.failures[0].target, "2024-01-01 2교시");
    assert_eq!(outcome.failures[0].error.code(), ErrorCode::ValidationError);

    let messages = outcome.error_messages();
    assert!(messages[0].starts_with("2024-01-01 2교시 처리 중 오류"));
}

#[tokio::test]
async fn batch_create_without_matching_dates_is_a_total_failure() {
    let db = MockDatabase::new(DatabaseBackend::MySql).into_connection();

    // 화~수 구간에는 금요일(5)이 없다
    let request = BatchCreateRequest {
        start_date: date(2024, 1, 2),
        end_date: date(2024, 1, 3),
        weekdays: vec![5],
        slots: vec![slot("1교시", "18:45", "20:05", &["수학"])],
        description: None,
        location: None,
    };

    let err = run_batch_create(&db, &request, 2).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::BatchCreateFailed);
}

#[tokio::test]
async fn batch_delete_skips_foreign_shifts_but_keeps_deleting() {
    let db = MockDatabase::new(DatabaseBackend::MySql)
        .append_query_results([vec![shift_row(1, 2), shift_row(2, 3)]])
        .append_exec_results([
            MockExecResult { last_insert_id: 0, rows_affected: 0 },
            MockExecResult { last_insert_id: 0, rows_affected: 1 },
        ])
        .into_connection();

    let request = BatchDeleteRequest {
        start_date: date(2024, 1, 1),
        end_date: date(2024, 1, 1),
        weekdays: vec![1],
        teacher_id: None,
    };

    let outcome = run_batch_delete(&db, &request, &teacher(2)).await.unwrap();

    assert_eq!(outcome.successes, vec![1]);
    assert_eq!(outcome.failure_count(), 1);
    assert_eq!(outcome.failures[0].target, "시프트 #2 (2024-01-01)");
    assert_eq!(outcome.failures[0].error.code(), ErrorCode::NotEnoughPermission);

    let log = format!("{:?}", db.into_transaction_log());
    // 시프트마다 딸린 요청을 먼저 지우고 시프트를 지운다
    assert_eq!(log.matches("DELETE FROM `substitute_requests`").count(), 1);
    assert_eq!(log.matches("DELETE FROM `shifts`").count(), 1);
}

#[tokio::test]
async fn batch_delete_admin_clears_everyones_shifts() {
    let db = MockDatabase::new(DatabaseBackend::MySql)
        .append_query_results([vec![shift_row(1, 2), shift_row(2, 3)]])
        .append_exec_results([
            MockExecResult { last_insert_id: 0, rows_affected: 1 },
            MockExecResult { last_insert_id: 0, rows_affected: 1 },
            MockExecResult { last_insert_id: 0, rows_affected: 2 },
            MockExecResult { last_insert_id: 0, rows_affected: 1 },
        ])
        .into_connection();

    let request = BatchDeleteRequest {
        start_date: date(2024, 1, 1),
        end_date: date(2024, 1, 1),
        weekdays: vec![1],
        teacher_id: None,
    };

    let outcome = run_batch_delete(&db, &request, &admin(99)).await.unwrap();

    assert_eq!(outcome.successes, vec![1, 2]);
    assert_eq!(outcome.failure_count(), 0);
}

#[tokio::test]
async fn batch_delete_with_owner_filter_scopes_the_lookup() {
    let db = MockDatabase::new(DatabaseBackend::MySql)
        .append_query_results([Vec::<shift::Model>::new()])
        .into_connection();

    let request = BatchDeleteRequest {
        start_date: date(2024, 1, 1),
        end_date: date(2024, 1, 1),
        weekdays: vec![1],
        teacher_id: Some(7),
    };

    let err = run_batch_delete(&db, &request, &teacher(7)).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::BatchDeleteFailed);

    let log = format!("{:?}", db.into_transaction_log());
    assert!(log.contains("`shifts`.`teacher_id` = ?"), "{}", log);
}

#[tokio::test]
async fn batch_delete_without_matches_is_a_total_failure() {
    let db = MockDatabase::new(DatabaseBackend::MySql)
        .append_query_results([Vec::<shift::Model>::new()])
        .into_connection();

    let request = BatchDeleteRequest {
        start_date: date(2024, 1, 1),
        end_date: date(2024, 1, 1),
        weekdays: vec![1],
        teacher_id: None,
    };

    let err = run_batch_delete(&db, &request, &teacher(2)).await.unwrap_err();

    match err {
        AppError::ApiError(code, detail) => {
            assert_eq!(code, ErrorCode::BatchDeleteFailed);
            assert!(detail.is_none());
        }
        other => panic!("배치 실패 오류가 아님: {:?}", other),
    }
}
