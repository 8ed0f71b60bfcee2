use actix_web::{post, web, HttpResponse};
use chrono::{Duration, NaiveDate, NaiveTime};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use crate::api::shift::{create_shift_record, delete_shift_record, ensure_shift_access};
use crate::entity::shift::{self, Entity as ShiftEntity};
use crate::model::auth::AuthenticatedUser;
use crate::model::global_error::{AppError, ErrorCode, ValidationFieldError};
use crate::model::schedule::{BatchCreateRequest, BatchDeleteRequest, BatchFailure, BatchOutcome, BatchResultResponse, SlotSelection};
use crate::model::shift::ShiftCreateRequest;
use crate::util::recurrence::{generate_dates, join_subjects, resolve_slot_times};

/// 날짜 × 교시 조합마다 시프트를 하나씩 만든다. 항목 하나의 실패가
/// 나머지를 막지 않으며, 성공이 하나도 없으면 전체 실패로 돌려준다.
pub async fn run_batch_create(
    db: &DatabaseConnection,
    data: &BatchCreateRequest,
    owner_id: i32,
) -> Result<BatchOutcome<shift::Model>, AppError> {
    validate_batch_create(data)?;

    let dates = generate_dates(data.start_date, data.end_date, &data.weekdays);

    let mut outcome = BatchOutcome::new();
    for date in &dates {
        for slot in &data.slots {
            let subject = join_subjects(&slot.subjects);
            // 과목이 비어 있는 교시는 건너뛴다
            if subject.is_empty() {
                continue;
            }

            let target = format!("{} {}", date, slot.label);
            match create_slot_shift(db, *date, slot, &subject, data, owner_id).await {
                Ok(created) => outcome.successes.push(created),
                Err(error) => outcome.failures.push(BatchFailure { target, error }),
            }
        }
    }

    if outcome.successes.is_empty() {
        return Err(batch_exhausted(ErrorCode::BatchCreateFailed, &outcome));
    }

    tracing::info!(
        "시프트 일괄 생성 완료: 성공 {}건, 실패 {}건",
        outcome.success_count(),
        outcome.failure_count()
    );

    Ok(outcome)
}

async fn create_slot_shift(
    db: &DatabaseConnection,
    date: NaiveDate,
    slot: &SlotSelection,
    subject: &str,
    shared: &BatchCreateRequest,
    owner_id: i32,
) -> Result<shift::Model, AppError> {
    let (start_time, end_time) = resolve_slot_times(date, &slot.start_time, &slot.end_time)?;

    let payload = ShiftCreateRequest {
        title: format!("{} {}", slot.label, subject),
        description: shared.description.clone(),
        start_time,
        end_time,
        subject: subject.to_string(),
        grade: None,
        location: shared.location.clone(),
    };

    create_shift_record(db, &payload, owner_id).await
}

/// 구간 안 해당 요일 날짜들의 시프트를 찾아 하나씩 지운다.
/// 권한이 없는 항목은 실패로 기록하고 계속 진행한다.
pub async fn run_batch_delete(
    db: &DatabaseConnection,
    data: &BatchDeleteRequest,
    caller: &AuthenticatedUser,
) -> Result<BatchOutcome<i32>, AppError> {
    if let Some(error) = validate_weekdays(&data.weekdays) {
        return Err(AppError::ValidationError(vec![error]));
    }

    let dates = generate_dates(data.start_date, data.end_date, &data.weekdays);

    let mut outcome = BatchOutcome::new();
    for date in &dates {
        let shifts = match find_shifts_on(db, *date, data.teacher_id).await {
            Ok(shifts) => shifts,
            Err(error) => {
                outcome.failures.push(BatchFailure {
                    target: date.to_string(),
                    error,
                });
                continue;
            }
        };

        for shift in shifts {
            let target = format!("시프트 #{} ({})", shift.id, date);
            match delete_one(db, &shift, caller).await {
                Ok(()) => outcome.successes.push(shift.id),
                Err(error) => outcome.failures.push(BatchFailure { target, error }),
            }
        }
    }

    if outcome.successes.is_empty() {
        return Err(batch_exhausted(ErrorCode::BatchDeleteFailed, &outcome));
    }

    tracing::info!(
        "시프트 일괄 삭제 완료: 성공 {}건, 실패 {}건",
        outcome.success_count(),
        outcome.failure_count()
    );

    Ok(outcome)
}

// 하루 구간은 [당일 00:00, 다음날 00:00) 반개구간으로 본다
async fn find_shifts_on(
    db: &DatabaseConnection,
    date: NaiveDate,
    teacher_id: Option<i32>,
) -> Result<Vec<shift::Model>, AppError> {
    let day_start = date.and_time(NaiveTime::MIN).and_utc();
    let day_end = day_start + Duration::days(1);

    let mut query = ShiftEntity::find()
        .filter(shift::Column::StartTime.gte(day_start))
        .filter(shift::Column::StartTime.lt(day_end));

    if let Some(teacher_id) = teacher_id {
        query = query.filter(shift::Column::TeacherId.eq(teacher_id));
    }

    let shifts = query.order_by_asc(shift::Column::StartTime).all(db).await?;

    Ok(shifts)
}

async fn delete_one(
    db: &DatabaseConnection,
    shift: &shift::Model,
    caller: &AuthenticatedUser,
) -> Result<(), AppError> {
    ensure_shift_access(shift, caller)?;
    delete_shift_record(db, shift.id).await
}

fn batch_exhausted<T>(code: ErrorCode, outcome: &BatchOutcome<T>) -> AppError {
    if outcome.failures.is_empty() {
        AppError::bad_request(code)
    } else {
        AppError::with_detail(code, outcome.error_messages().join("; "))
    }
}

fn validate_batch_create(data: &BatchCreateRequest) -> Result<(), AppError> {
    let mut errors = Vec::new();

    if data.slots.is_empty() {
        errors.push(ValidationFieldError {
            field: "slots".to_string(),
            message: "교시를 하나 이상 선택해야 합니다.".to_string(),
        });
    } else if data.slots.iter().all(|slot| join_subjects(&slot.subjects).is_empty()) {
        errors.push(ValidationFieldError {
            field: "slots".to_string(),
            message: "과목이 선택된 교시가 없습니다.".to_string(),
        });
    }

    if let Some(error) = validate_weekdays(&data.weekdays) {
        errors.push(error);
    }

    if !errors.is_empty() {
        return Err(AppError::ValidationError(errors));
    }

    Ok(())
}

fn validate_weekdays(weekdays: &[u8]) -> Option<ValidationFieldError> {
    if weekdays.iter().any(|day| *day > 6) {
        return Some(ValidationFieldError {
            field: "weekdays".to_string(),
            message: "요일 값은 0(일)부터 6(토) 사이여야 합니다.".to_string(),
        });
    }

    None
}

#[utoipa::path(
    post,
    path = "/api/schedule/batch-create",
    summary = "시프트 일괄 생성",
    request_body = BatchCreateRequest,
    responses(
        (status = 200, description = "일괄 생성 결과", body = BatchResultResponse),
    ),
)]
#[post("/schedule/batch-create")]
pub async fn batch_create_shifts(
    body: web::Json<BatchCreateRequest>,
    db: web::Data<DatabaseConnection>,
    auth_user: web::ReqData<AuthenticatedUser>,
) -> Result<HttpResponse, AppError> {
    let caller = auth_user.into_inner();

    let outcome = run_batch_create(db.get_ref(), &body, caller.id).await?;

    Ok(HttpResponse::Ok().json(BatchResultResponse::from(&outcome)))
}

#[utoipa::path(
    post,
    path = "/api/schedule/batch-delete",
    summary = "시프트 일괄 삭제",
    request_body = BatchDeleteRequest,
    responses(
        (status = 200, description = "일괄 삭제 결과", body = BatchResultResponse),
    ),
)]
#[post("/schedule/batch-delete")]
pub async fn batch_delete_shifts(
    body: web::Json<BatchDeleteRequest>,
    db: web::Data<DatabaseConnection>,
    auth_user: web::ReqData<AuthenticatedUser>,
) -> Result<HttpResponse, AppError> {
    let caller = auth_user.into_inner();

    let outcome = run_batch_delete(db.get_ref(), &body, &caller).await?;

    Ok(HttpResponse::Ok().json(BatchResultResponse::from(&outcome)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(label: &str, subjects: &[&str]) -> SlotSelection {
        SlotSelection {
            label: label.to_string(),
            start_time: "18:45".to_string(),
            end_time: "20:05".to_string(),
            subjects: subjects.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn request(slots: Vec<SlotSelection>, weekdays: Vec<u8>) -> BatchCreateRequest {
        BatchCreateRequest {
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 14).unwrap(),
            weekdays,
            slots,
            description: None,
            location: None,
        }
    }

    #[test]
    fn batch_create_requires_at_least_one_slot() {
        let err = validate_batch_create(&request(vec![], vec![1])).unwrap_err();

        match err {
            AppError::ValidationError(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "slots");
                assert_eq!(errors[0].message, "교시를 하나 이상 선택해야 합니다.");
            }
            other => panic!("유효성 오류가 아님: {:?}", other),
        }
    }

    #[test]
    fn batch_create_requires_a_slot_with_subjects() {
        let slots = vec![slot("1교시", &[]), slot("2교시", &["", "  "])];
        let err = validate_batch_create(&request(slots, vec![1])).unwrap_err();

        match err {
            AppError::ValidationError(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].message, "과목이 선택된 교시가 없습니다.");
            }
            other => panic!("유효성 오류가 아님: {:?}", other),
        }
    }

    #[test]
    fn batch_create_rejects_out_of_range_weekday() {
        let err = validate_batch_create(&request(vec![slot("1교시", &["수학"])], vec![1, 7])).unwrap_err();

        match err {
            AppError::ValidationError(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "weekdays");
            }
            other => panic!("유효성 오류가 아님: {:?}", other),
        }
    }

    #[test]
    fn batch_create_collects_slot_and_weekday_errors_together() {
        let err = validate_batch_create(&request(vec![], vec![9])).unwrap_err();

        match err {
            AppError::ValidationError(errors) => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["slots", "weekdays"]);
            }
            other => panic!("유효성 오류가 아님: {:?}", other),
        }
    }

    #[test]
    fn batch_create_accepts_mixed_slots_when_one_has_subjects() {
        let slots = vec![slot("1교시", &[]), slot("2교시", &["수학"])];
        assert!(validate_batch_create(&request(slots, vec![0, 6])).is_ok());
    }

    #[test]
    fn exhausted_batch_without_failures_has_no_detail() {
        let outcome: BatchOutcome<i32> = BatchOutcome::new();
        let err = batch_exhausted(ErrorCode::BatchDeleteFailed, &outcome);

        match err {
            AppError::ApiError(code, detail) => {
                assert_eq!(code, ErrorCode::BatchDeleteFailed);
                assert!(detail.is_none());
            }
            other => panic!("배치 실패 오류가 아님: {:?}", other),
        }
    }

    #[test]
    fn exhausted_batch_joins_failure_messages_into_detail() {
        let mut outcome: BatchOutcome<i32> = BatchOutcome::new();
        outcome.failures.push(BatchFailure {
            target: "2024-01-01 1교시".to_string(),
            error: AppError::bad_request(ErrorCode::InvalidTimeRange),
        });
        outcome.failures.push(BatchFailure {
            target: "2024-01-03 1교시".to_string(),
            error: AppError::bad_request(ErrorCode::InvalidTimeRange),
        });

        let err = batch_exhausted(ErrorCode::BatchCreateFailed, &outcome);

        match err {
            AppError::ApiError(code, Some(detail)) => {
                assert_eq!(code, ErrorCode::BatchCreateFailed);
                assert!(detail.contains("2024-01-01 1교시 처리 중 오류"));
                assert!(detail.contains("; 2024-01-03 1교시"));
            }
            other => panic!("상세가 붙은 배치 실패가 아님: {:?}", other),
        }
    }
}
