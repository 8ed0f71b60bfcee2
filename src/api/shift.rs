use std::collections::HashMap;
use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Select, Set, TransactionTrait};
use crate::entity::shift::{self, Entity as ShiftEntity};
use crate::entity::substitute_request::{self, Entity as SubstituteRequestEntity};
use crate::entity::user::{self, Entity as UserEntity, UserRole};
use crate::model::auth::AuthenticatedUser;
use crate::model::global_error::{AppError, ErrorCode, ValidationFieldError};
use crate::model::shift::{ShiftCreateRequest, ShiftDetailResponse, ShiftListResponse, ShiftQuery, ShiftResponse, ShiftUpdateRequest};
use crate::model::substitute_request::SubstituteRequestDetailResponse;

pub async fn find_shift(db: &DatabaseConnection, shift_id: i32) -> Result<shift::Model, AppError> {
    let shift = ShiftEntity::find_by_id(shift_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found(ErrorCode::ShiftNotFound))?;

    Ok(shift)
}

// 소유자 본인 또는 ADMIN만 시프트를 고칠 수 있다
pub fn ensure_shift_access(shift: &shift::Model, caller: &AuthenticatedUser) -> Result<(), AppError> {
    if shift.teacher_id != caller.id && caller.role != UserRole::Admin {
        return Err(AppError::forbidden(ErrorCode::NotEnoughPermission));
    }

    Ok(())
}

pub async fn create_shift_record(
    db: &DatabaseConnection,
    data: &ShiftCreateRequest,
    owner_id: i32,
) -> Result<shift::Model, AppError> {
    validate_shift_payload(data)?;

    // TODO 같은 강사의 시간대 겹침 검증은 아직 없음 (정책 확정 후 추가)
    let new_shift = shift::ActiveModel::from_create(data, owner_id);
    let inserted = new_shift.insert(db).await?;

    Ok(inserted)
}

/// 시프트와 딸린 대체 요청을 한 트랜잭션에서 지운다.
pub async fn delete_shift_record(db: &DatabaseConnection, shift_id: i32) -> Result<(), AppError> {
    let txn = db.begin().await?;

    SubstituteRequestEntity::delete_many()
        .filter(substitute_request::Column::ShiftId.eq(shift_id))
        .exec(&txn)
        .await?;

    ShiftEntity::delete_by_id(shift_id).exec(&txn).await?;

    txn.commit().await?;

    Ok(())
}

fn validate_shift_payload(data: &ShiftCreateRequest) -> Result<(), AppError> {
    let mut errors = Vec::new();

    if data.title.trim().is_empty() {
        errors.push(ValidationFieldError {
            field: "title".to_string(),
            message: "제목은 필수입니다.".to_string(),
        });
    }

    if data.subject.trim().is_empty() {
        errors.push(ValidationFieldError {
            field: "subject".to_string(),
            message: "과목은 필수입니다.".to_string(),
        });
    }

    if !errors.is_empty() {
        return Err(AppError::ValidationError(errors));
    }

    if data.start_time >= data.end_time {
        return Err(AppError::bad_request(ErrorCode::InvalidTimeRange));
    }

    Ok(())
}

/// 부분 패치를 ActiveModel로 변환한다. 시각이 하나라도 오면
/// 기존 값과 합친 (시작, 종료) 쌍을 다시 검증한다.
pub fn build_shift_patch(
    existing: &shift::Model,
    patch: &ShiftUpdateRequest,
) -> Result<shift::ActiveModel, AppError> {
    if patch.start_time.is_some() || patch.end_time.is_some() {
        let start = patch.start_time.unwrap_or(existing.start_time);
        let end = patch.end_time.unwrap_or(existing.end_time);
        if start >= end {
            return Err(AppError::bad_request(ErrorCode::InvalidTimeRange));
        }
    }

    let mut model: shift::ActiveModel = existing.clone().into();

    if let Some(title) = &patch.title {
        if !title.trim().is_empty() {
            model.title = Set(title.trim().to_string());
        }
    }
    if let Some(subject) = &patch.subject {
        if !subject.trim().is_empty() {
            model.subject = Set(subject.trim().to_string());
        }
    }
    if let Some(description) = &patch.description {
        model.description = Set(if description.is_empty() { None } else { Some(description.clone()) });
    }
    if let Some(grade) = &patch.grade {
        model.grade = Set(if grade.is_empty() { None } else { Some(grade.clone()) });
    }
    if let Some(location) = &patch.location {
        model.location = Set(if location.is_empty() { None } else { Some(location.clone()) });
    }
    if let Some(start_time) = patch.start_time {
        model.start_time = Set(start_time);
    }
    if let Some(end_time) = patch.end_time {
        model.end_time = Set(end_time);
    }
    if let Some(status) = patch.status {
        model.status = Set(status);
    }

    Ok(model)
}

fn build_shift_list_query(range: Option<(DateTime<Utc>, DateTime<Utc>)>) -> Select<ShiftEntity> {
    let mut query = ShiftEntity::find();

    if let Some((start, end)) = range {
        query = query
            .filter(shift::Column::StartTime.gte(start))
            .filter(shift::Column::StartTime.lte(end));
    }

    query.order_by_asc(shift::Column::StartTime)
}

#[utoipa::path(
    post,
    path = "/api/shifts",
    summary = "시프트 생성",
    request_body = ShiftCreateRequest,
    responses(
        (status = 201, description = "시프트 생성 성공", body = ShiftResponse),
    ),
)]
#[post("/shifts")]
pub async fn create_shift(
    body: web::Json<ShiftCreateRequest>,
    db: web::Data<DatabaseConnection>,
    auth_user: web::ReqData<AuthenticatedUser>,
) -> Result<HttpResponse, AppError> {
    let caller = auth_user.into_inner();

    let shift = create_shift_record(db.get_ref(), &body, caller.id).await?;

    Ok(HttpResponse::Created().json(ShiftResponse::from(shift)))
}

#[utoipa::path(
    get,
    path = "/api/shifts",
    summary = "시프트 목록 조회",
    params(
        ("start" = Option<String>, Query, description = "조회 구간 시작 (ISO8601)"),
        ("end" = Option<String>, Query, description = "조회 구간 종료 (ISO8601)")
    ),
    responses(
        (status = 200, description = "시프트 목록 조회 성공", body = Vec<ShiftListResponse>),
    ),
)]
#[get("/shifts")]
pub async fn list_shifts(
    db: web::Data<DatabaseConnection>,
    query: web::Query<ShiftQuery>,
) -> Result<HttpResponse, AppError> {
    // 구간 필터는 start/end가 모두 있을 때만 적용된다
    let range = match (query.start, query.end) {
        (Some(start), Some(end)) => Some((start, end)),
        _ => None,
    };

    let shifts = build_shift_list_query(range).all(db.get_ref()).await?;

    let mut teacher_ids: Vec<i32> = shifts.iter().map(|s| s.teacher_id).collect();
    teacher_ids.sort_unstable();
    teacher_ids.dedup();

    let teachers: HashMap<i32, user::Model> = UserEntity::find()
        .filter(user::Column::Id.is_in(teacher_ids))
        .all(db.get_ref())
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let response: Vec<ShiftListResponse> = shifts
        .into_iter()
        .map(|s| {
            let teacher = teachers.get(&s.teacher_id).cloned();
            ShiftListResponse::from_parts(s, teacher)
        })
        .collect();

    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    get,
    path = "/api/shifts/{id}",
    summary = "시프트 상세 조회",
    params(
        ("id", description = "시프트 ID", example = 1),
    ),
    responses(
        (status = 200, description = "시프트 상세 조회 성공", body = ShiftDetailResponse),
    ),
)]
#[get("/shifts/{id}")]
pub async fn get_shift(
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let shift_id = path.into_inner();

    let shift = find_shift(db.get_ref(), shift_id).await?;

    let teacher = UserEntity::find_by_id(shift.teacher_id)
        .one(db.get_ref())
        .await?;

    let requests = SubstituteRequestEntity::find()
        .filter(substitute_request::Column::ShiftId.eq(shift_id))
        .all(db.get_ref())
        .await?;

    let mut user_ids: Vec<i32> = requests
        .iter()
        .flat_map(|r| [Some(r.created_by_id), r.accepted_by_id])
        .flatten()
        .collect();
    user_ids.sort_unstable();
    user_ids.dedup();

    let users: HashMap<i32, user::Model> = UserEntity::find()
        .filter(user::Column::Id.is_in(user_ids))
        .all(db.get_ref())
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let request_responses: Vec<SubstituteRequestDetailResponse> = requests
        .into_iter()
        .map(|r| {
            let created_by = users.get(&r.created_by_id).cloned();
            let accepted_by = r.accepted_by_id.and_then(|id| users.get(&id).cloned());
            SubstituteRequestDetailResponse::from_parts(r, None, created_by, accepted_by)
        })
        .collect();

    Ok(HttpResponse::Ok().json(ShiftDetailResponse {
        shift: ShiftResponse::from(shift),
        teacher: teacher.map(Into::into),
        substitute_requests: request_responses,
    }))
}

#[utoipa::path(
    put,
    path = "/api/shifts/{id}",
    summary = "시프트 수정",
    request_body = ShiftUpdateRequest,
    responses(
        (status = 200, description = "시프트 수정 성공", body = ShiftResponse),
    ),
)]
#[put("/shifts/{id}")]
pub async fn update_shift(
    path: web::Path<i32>,
    body: web::Json<ShiftUpdateRequest>,
    db: web::Data<DatabaseConnection>,
    auth_user: web::ReqData<AuthenticatedUser>,
) -> Result<HttpResponse, AppError> {
    let shift_id = path.into_inner();
    let caller = auth_user.into_inner();

    let shift = find_shift(db.get_ref(), shift_id).await?;
    ensure_shift_access(&shift, &caller)?;

    let patched = build_shift_patch(&shift, &body)?;
    let updated = patched.update(db.get_ref()).await?;

    Ok(HttpResponse::Ok().json(ShiftResponse::from(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/shifts/{id}",
    summary = "시프트 삭제",
    responses(
        (status = 204, description = "시프트 삭제 성공"),
    ),
)]
#[delete("/shifts/{id}")]
pub async fn delete_shift(
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    auth_user: web::ReqData<AuthenticatedUser>,
) -> Result<HttpResponse, AppError> {
    let shift_id = path.into_inner();
    let caller = auth_user.into_inner();

    let shift = find_shift(db.get_ref(), shift_id).await?;
    ensure_shift_access(&shift, &caller)?;

    delete_shift_record(db.get_ref(), shift_id).await?;

    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sea_orm::{ActiveValue, DbBackend, QueryTrait};
    use crate::entity::shift::ShiftStatus;

    fn sample_shift() -> shift::Model {
        shift::Model {
            id: 1,
            title: "6교시 수학".to_string(),
            description: None,
            start_time: Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2024, 3, 4, 11, 0, 0).unwrap(),
            subject: "수학".to_string(),
            grade: Some("고1".to_string()),
            location: Some("3강의실".to_string()),
            status: ShiftStatus::Scheduled,
            teacher_id: 7,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            updated_at: None,
        }
    }

    fn caller(id: i32, role: UserRole) -> AuthenticatedUser {
        AuthenticatedUser { id, role }
    }

    #[test]
    fn create_payload_requires_title_and_subject() {
        let payload = ShiftCreateRequest {
            title: "  ".to_string(),
            description: None,
            start_time: Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2024, 3, 4, 11, 0, 0).unwrap(),
            subject: "".to_string(),
            grade: None,
            location: None,
        };

        match validate_shift_payload(&payload) {
            Err(AppError::ValidationError(errors)) => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["title", "subject"]);
            }
            other => panic!("유효성 오류가 아님: {:?}", other),
        }
    }

    #[test]
    fn create_payload_rejects_inverted_time_range() {
        let payload = ShiftCreateRequest {
            title: "6교시 수학".to_string(),
            description: None,
            start_time: Utc.with_ymd_and_hms(2024, 3, 4, 11, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap(),
            subject: "수학".to_string(),
            grade: None,
            location: None,
        };

        let err = validate_shift_payload(&payload).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidTimeRange);
    }

    #[test]
    fn empty_patch_changes_nothing() {
        let existing = sample_shift();
        let model = build_shift_patch(&existing, &ShiftUpdateRequest::default()).unwrap();

        assert!(model.title.is_unchanged());
        assert!(model.description.is_unchanged());
        assert!(model.start_time.is_unchanged());
        assert!(model.status.is_unchanged());
    }

    #[test]
    fn blank_title_is_ignored_but_empty_description_clears() {
        let existing = sample_shift();
        let patch = ShiftUpdateRequest {
            title: Some("   ".to_string()),
            description: Some("".to_string()),
            location: Some("".to_string()),
            ..Default::default()
        };

        let model = build_shift_patch(&existing, &patch).unwrap();

        assert!(model.title.is_unchanged());
        assert!(matches!(model.description, ActiveValue::Set(None)));
        assert!(matches!(model.location, ActiveValue::Set(None)));
    }

    #[test]
    fn supplied_fields_overwrite() {
        let existing = sample_shift();
        let patch = ShiftUpdateRequest {
            title: Some("7교시 수학".to_string()),
            grade: Some("고2".to_string()),
            status: Some(ShiftStatus::Cancelled),
            ..Default::default()
        };

        let model = build_shift_patch(&existing, &patch).unwrap();

        assert_eq!(model.title, ActiveValue::Set("7교시 수학".to_string()));
        assert_eq!(model.grade, ActiveValue::Set(Some("고2".to_string())));
        assert_eq!(model.status, ActiveValue::Set(ShiftStatus::Cancelled));
    }

    #[test]
    fn patched_start_is_validated_against_inherited_end() {
        let existing = sample_shift();
        let patch = ShiftUpdateRequest {
            start_time: Some(Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap()),
            ..Default::default()
        };

        let err = build_shift_patch(&existing, &patch).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidTimeRange);
    }

    #[test]
    fn patched_pair_replacing_both_ends_is_accepted() {
        let existing = sample_shift();
        let patch = ShiftUpdateRequest {
            start_time: Some(Utc.with_ymd_and_hms(2024, 3, 5, 14, 0, 0).unwrap()),
            end_time: Some(Utc.with_ymd_and_hms(2024, 3, 5, 15, 30, 0).unwrap()),
            ..Default::default()
        };

        let model = build_shift_patch(&existing, &patch).unwrap();
        assert!(model.start_time.is_set());
        assert!(model.end_time.is_set());
    }

    #[test]
    fn owner_and_admin_pass_access_check_others_fail() {
        let shift = sample_shift();

        assert!(ensure_shift_access(&shift, &caller(7, UserRole::Teacher)).is_ok());
        assert!(ensure_shift_access(&shift, &caller(99, UserRole::Admin)).is_ok());

        let err = ensure_shift_access(&shift, &caller(99, UserRole::Teacher)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotEnoughPermission);
    }

    #[test]
    fn list_query_orders_by_start_time_ascending() {
        let sql = build_shift_list_query(None)
            .build(DbBackend::MySql)
            .to_string();

        assert!(sql.contains("ORDER BY `shifts`.`start_time` ASC"), "{}", sql);
        assert!(!sql.contains("WHERE"), "{}", sql);
    }

    #[test]
    fn list_query_applies_range_on_start_time() {
        let range = Some((
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap(),
        ));
        let sql = build_shift_list_query(range)
            .build(DbBackend::MySql)
            .to_string();

        assert!(sql.contains("`shifts`.`start_time` >="), "{}", sql);
        assert!(sql.contains("`shifts`.`start_time` <="), "{}", sql);
    }
}
