use std::collections::HashMap;
use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Select, TransactionTrait};
use sea_query::Expr;
use crate::api::shift::find_shift;
use crate::entity::shift::{self, Entity as ShiftEntity};
use crate::entity::substitute_request::{self, Entity as SubstituteRequestEntity, RequestPriority, RequestStatus};
use crate::entity::user::{self, Entity as UserEntity};
use crate::model::auth::AuthenticatedUser;
use crate::model::global_error::{AppError, ErrorCode, ValidationFieldError};
use crate::model::substitute_request::{DecideAction, DecideRequest, SubstituteRequestCreateRequest, SubstituteRequestDetailResponse, SubstituteRequestQuery, SubstituteRequestResponse};

pub async fn find_request(
    db: &DatabaseConnection,
    request_id: i32,
) -> Result<substitute_request::Model, AppError> {
    let request = SubstituteRequestEntity::find_by_id(request_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found(ErrorCode::SubstituteRequestNotFound))?;

    Ok(request)
}

pub async fn create_request(
    db: &DatabaseConnection,
    data: &SubstituteRequestCreateRequest,
    caller: &AuthenticatedUser,
) -> Result<substitute_request::Model, AppError> {
    if data.reason.trim().is_empty() {
        return Err(AppError::ValidationError(vec![ValidationFieldError {
            field: "reason".to_string(),
            message: "사유는 필수입니다.".to_string(),
        }]));
    }

    let shift = find_shift(db, data.shift_id).await?;

    // 자기 시프트에는 대체 요청을 낼 수 없다
    if shift.teacher_id == caller.id {
        return Err(AppError::bad_request(ErrorCode::SelfSubstituteRequest));
    }

    let duplicate = SubstituteRequestEntity::find()
        .filter(
            Condition::all()
                .add(substitute_request::Column::ShiftId.eq(data.shift_id))
                .add(substitute_request::Column::CreatedById.eq(caller.id))
                .add(substitute_request::Column::Status.is_in([RequestStatus::Pending, RequestStatus::Accepted])),
        )
        .one(db)
        .await?;

    if duplicate.is_some() {
        return Err(AppError::conflict(ErrorCode::DuplicateSubstituteRequest));
    }

    let new_request = substitute_request::ActiveModel::from_request(data, caller.id);
    let inserted = new_request.insert(db).await?;

    Ok(inserted)
}

pub async fn decide_request(
    db: &DatabaseConnection,
    request_id: i32,
    action: DecideAction,
    decider: &AuthenticatedUser,
) -> Result<substitute_request::Model, AppError> {
    let request = find_request(db, request_id).await?;
    let shift = find_shift(db, request.shift_id).await?;

    // 결정 권한은 시프트 소유자 본인에게만 있다
    if shift.teacher_id != decider.id {
        return Err(AppError::forbidden(ErrorCode::NotEnoughPermission));
    }

    if request.status != RequestStatus::Pending {
        return Err(AppError::conflict(ErrorCode::AlreadyDecidedRequest));
    }

    match action {
        DecideAction::Accept => accept_request(db, &request, decider).await?,
        DecideAction::Reject => reject_request(db, &request, decider).await?,
    }

    find_request(db, request_id).await
}

/// 수락은 요청 확정, 형제 요청 거절, 시프트 재배정을
/// 한 트랜잭션으로 묶는다. PENDING 조건이 걸린 첫 갱신이
/// 0행이면 다른 결정이 먼저 끝난 것이므로 충돌로 돌려준다.
async fn accept_request(
    db: &DatabaseConnection,
    request: &substitute_request::Model,
    decider: &AuthenticatedUser,
) -> Result<(), AppError> {
    let now = Utc::now();
    let txn = db.begin().await?;

    let accepted = SubstituteRequestEntity::update_many()
        .col_expr(substitute_request::Column::Status, Expr::value(RequestStatus::Accepted))
        .col_expr(substitute_request::Column::AcceptedById, Expr::value(decider.id))
        .col_expr(substitute_request::Column::UpdatedAt, Expr::value(now))
        .filter(substitute_request::Column::Id.eq(request.id))
        .filter(substitute_request::Column::Status.eq(RequestStatus::Pending))
        .exec(&txn)
        .await?;

    if accepted.rows_affected == 0 {
        txn.rollback().await.ok();
        return Err(AppError::conflict(ErrorCode::AlreadyDecidedRequest));
    }

    SubstituteRequestEntity::update_many()
        .col_expr(substitute_request::Column::Status, Expr::value(RequestStatus::Rejected))
        .col_expr(substitute_request::Column::UpdatedAt, Expr::value(now))
        .filter(substitute_request::Column::ShiftId.eq(request.shift_id))
        .filter(substitute_request::Column::Id.ne(request.id))
        .filter(substitute_request::Column::Status.eq(RequestStatus::Pending))
        .exec(&txn)
        .await?;

    ShiftEntity::update_many()
        .col_expr(shift::Column::TeacherId, Expr::value(request.created_by_id))
        .col_expr(shift::Column::UpdatedAt, Expr::value(now))
        .filter(shift::Column::Id.eq(request.shift_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    Ok(())
}

async fn reject_request(
    db: &DatabaseConnection,
    request: &substitute_request::Model,
    decider: &AuthenticatedUser,
) -> Result<(), AppError> {
    SubstituteRequestEntity::update_many()
        .col_expr(substitute_request::Column::Status, Expr::value(RequestStatus::Rejected))
        .col_expr(substitute_request::Column::AcceptedById, Expr::value(decider.id))
        .col_expr(substitute_request::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(substitute_request::Column::Id.eq(request.id))
        .exec(db)
        .await?;

    Ok(())
}

pub async fn delete_request(
    db: &DatabaseConnection,
    request_id: i32,
    caller: &AuthenticatedUser,
) -> Result<(), AppError> {
    let request = find_request(db, request_id).await?;

    // 요청 취소는 작성자 본인만 할 수 있다
    if request.created_by_id != caller.id {
        return Err(AppError::forbidden(ErrorCode::NotEnoughPermission));
    }

    if request.status == RequestStatus::Accepted {
        return Err(AppError::conflict(ErrorCode::AcceptedRequestImmutable));
    }

    SubstituteRequestEntity::delete_by_id(request_id).exec(db).await?;

    Ok(())
}

fn build_request_list_query(
    status: Option<RequestStatus>,
    priority: Option<RequestPriority>,
) -> Select<SubstituteRequestEntity> {
    let mut query = SubstituteRequestEntity::find();

    if let Some(status) = status {
        query = query.filter(substitute_request::Column::Status.eq(status));
    }
    if let Some(priority) = priority {
        query = query.filter(substitute_request::Column::Priority.eq(priority));
    }

    // MySQL ENUM 정렬이 선언 순서를 따르므로 DESC가 긴급한 순서가 된다
    query
        .order_by_desc(substitute_request::Column::Priority)
        .order_by_desc(substitute_request::Column::CreatedAt)
        .order_by_desc(substitute_request::Column::Id)
}

async fn load_request_detail(
    db: &DatabaseConnection,
    request: substitute_request::Model,
) -> Result<SubstituteRequestDetailResponse, AppError> {
    let shift = ShiftEntity::find_by_id(request.shift_id).one(db).await?;

    let mut user_ids = vec![request.created_by_id];
    if let Some(accepted_by_id) = request.accepted_by_id {
        user_ids.push(accepted_by_id);
    }
    user_ids.sort_unstable();
    user_ids.dedup();

    let users: HashMap<i32, user::Model> = UserEntity::find()
        .filter(user::Column::Id.is_in(user_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let created_by = users.get(&request.created_by_id).cloned();
    let accepted_by = request.accepted_by_id.and_then(|id| users.get(&id).cloned());

    Ok(SubstituteRequestDetailResponse::from_parts(
        request, shift, created_by, accepted_by,
    ))
}

#[utoipa::path(
    post,
    path = "/api/substitute-requests",
    summary = "대체 요청 생성",
    request_body = SubstituteRequestCreateRequest,
    responses(
        (status = 201, description = "대체 요청 생성 성공", body = SubstituteRequestResponse),
    ),
)]
#[post("/substitute-requests")]
pub async fn create_substitute_request(
    body: web::Json<SubstituteRequestCreateRequest>,
    db: web::Data<DatabaseConnection>,
    auth_user: web::ReqData<AuthenticatedUser>,
) -> Result<HttpResponse, AppError> {
    let caller = auth_user.into_inner();

    let request = create_request(db.get_ref(), &body, &caller).await?;

    Ok(HttpResponse::Created().json(SubstituteRequestResponse::from(request)))
}

#[utoipa::path(
    get,
    path = "/api/substitute-requests",
    summary = "대체 요청 목록 조회",
    params(
        ("status" = Option<String>, Query, description = "요청 상태 필터"),
        ("priority" = Option<String>, Query, description = "우선순위 필터")
    ),
    responses(
        (status = 200, description = "대체 요청 목록 조회 성공", body = Vec<SubstituteRequestDetailResponse>),
    ),
)]
#[get("/substitute-requests")]
pub async fn list_substitute_requests(
    db: web::Data<DatabaseConnection>,
    query: web::Query<SubstituteRequestQuery>,
) -> Result<HttpResponse, AppError> {
    let requests = build_request_list_query(query.status, query.priority)
        .all(db.get_ref())
        .await?;

    let mut shift_ids: Vec<i32> = requests.iter().map(|r| r.shift_id).collect();
    shift_ids.sort_unstable();
    shift_ids.dedup();

    let shifts: HashMap<i32, shift::Model> = ShiftEntity::find()
        .filter(shift::Column::Id.is_in(shift_ids))
        .all(db.get_ref())
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

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

    let response: Vec<SubstituteRequestDetailResponse> = requests
        .into_iter()
        .map(|r| {
            let shift = shifts.get(&r.shift_id).cloned();
            let created_by = users.get(&r.created_by_id).cloned();
            let accepted_by = r.accepted_by_id.and_then(|id| users.get(&id).cloned());
            SubstituteRequestDetailResponse::from_parts(r, shift, created_by, accepted_by)
        })
        .collect();

    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    get,
    path = "/api/substitute-requests/{id}",
    summary = "대체 요청 상세 조회",
    params(
        ("id", description = "대체 요청 ID", example = 1),
    ),
    responses(
        (status = 200, description = "대체 요청 상세 조회 성공", body = SubstituteRequestDetailResponse),
    ),
)]
#[get("/substitute-requests/{id}")]
pub async fn get_substitute_request(
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let request_id = path.into_inner();

    let request = find_request(db.get_ref(), request_id).await?;
    let detail = load_request_detail(db.get_ref(), request).await?;

    Ok(HttpResponse::Ok().json(detail))
}

#[utoipa::path(
    put,
    path = "/api/substitute-requests/{id}/decide",
    summary = "대체 요청 결정",
    request_body = DecideRequest,
    responses(
        (status = 200, description = "대체 요청 결정 성공", body = SubstituteRequestDetailResponse),
    ),
)]
#[put("/substitute-requests/{id}/decide")]
pub async fn decide_substitute_request(
    path: web::Path<i32>,
    body: web::Json<DecideRequest>,
    db: web::Data<DatabaseConnection>,
    auth_user: web::ReqData<AuthenticatedUser>,
) -> Result<HttpResponse, AppError> {
    let request_id = path.into_inner();
    let caller = auth_user.into_inner();

    let decided = decide_request(db.get_ref(), request_id, body.action, &caller).await?;
    let detail = load_request_detail(db.get_ref(), decided).await?;

    Ok(HttpResponse::Ok().json(detail))
}

#[utoipa::path(
    delete,
    path = "/api/substitute-requests/{id}",
    summary = "대체 요청 삭제",
    responses(
        (status = 204, description = "대체 요청 삭제 성공"),
    ),
)]
#[delete("/substitute-requests/{id}")]
pub async fn delete_substitute_request(
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    auth_user: web::ReqData<AuthenticatedUser>,
) -> Result<HttpResponse, AppError> {
    let request_id = path.into_inner();
    let caller = auth_user.into_inner();

    delete_request(db.get_ref(), request_id, &caller).await?;

    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    #[test]
    fn list_query_orders_urgent_and_newest_first() {
        let sql = build_request_list_query(None, None)
            .build(DbBackend::MySql)
            .to_string();

        assert!(
            sql.contains(
                "ORDER BY `substitute_requests`.`priority` DESC, \
                 `substitute_requests`.`created_at` DESC, \
                 `substitute_requests`.`id` DESC"
            ),
            "{}",
            sql
        );
        assert!(!sql.contains("WHERE"), "{}", sql);
    }

    #[test]
    fn list_query_filters_by_status() {
        let sql = build_request_list_query(Some(RequestStatus::Pending), None)
            .build(DbBackend::MySql)
            .to_string();

        assert!(sql.contains("`substitute_requests`.`status` = 'PENDING'"), "{}", sql);
    }

    #[test]
    fn list_query_filters_by_priority() {
        let sql = build_request_list_query(None, Some(RequestPriority::Urgent))
            .build(DbBackend::MySql)
            .to_string();

        assert!(sql.contains("`substitute_requests`.`priority` = 'URGENT'"), "{}", sql);
    }
}
