use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use crate::entity::shift::Model as ShiftModel;
use crate::entity::substitute_request::{Model as RequestModel, RequestPriority, RequestStatus};
use crate::entity::user::Model as UserModel;
use crate::model::auth::UserSummary;
use crate::model::shift::ShiftResponse;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubstituteRequestCreateRequest {
    pub shift_id: i32,
    pub reason: String,
    pub priority: Option<RequestPriority>,
}

// 수락/거절 — 닫힌 두 갈래 액션만 허용
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DecideAction {
    Accept,
    Reject,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DecideRequest {
    pub action: DecideAction,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubstituteRequestQuery {
    pub status: Option<RequestStatus>,
    pub priority: Option<RequestPriority>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubstituteRequestResponse {
    pub id: i32,
    pub shift_id: i32,
    pub reason: String,
    pub priority: RequestPriority,
    pub status: RequestStatus,
    pub created_by_id: i32,
    pub accepted_by_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl From<RequestModel> for SubstituteRequestResponse {
    fn from(model: RequestModel) -> Self {
        Self {
            id: model.id,
            shift_id: model.shift_id,
            reason: model.reason,
            priority: model.priority,
            status: model.status,
            created_by_id: model.created_by_id,
            accepted_by_id: model.accepted_by_id,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubstituteRequestDetailResponse {
    pub id: i32,
    pub shift_id: i32,
    pub reason: String,
    pub priority: RequestPriority,
    pub status: RequestStatus,
    pub created_by: Option<UserSummary>,
    pub accepted_by: Option<UserSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shift: Option<ShiftResponse>,
    pub created_at: DateTime<Utc>,
}

impl SubstituteRequestDetailResponse {
    pub fn from_parts(
        request: RequestModel,
        shift: Option<ShiftModel>,
        created_by: Option<UserModel>,
        accepted_by: Option<UserModel>,
    ) -> Self {
        Self {
            id: request.id,
            shift_id: request.shift_id,
            reason: request.reason,
            priority: request.priority,
            status: request.status,
            created_by: created_by.map(UserSummary::from),
            accepted_by: accepted_by.map(UserSummary::from),
            shift: shift.map(ShiftResponse::from),
            created_at: request.created_at,
        }
    }
}
