use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use crate::entity::shift::{Model as ShiftModel, ShiftStatus};
use crate::entity::user::Model as UserModel;
use crate::model::auth::UserSummary;
use crate::model::substitute_request::SubstituteRequestDetailResponse;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShiftCreateRequest {
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub subject: String,
    pub grade: Option<String>,
    pub location: Option<String>,
}

/// 부분 패치: 생략된 필드는 유지, description/grade/location은 빈 문자열로 비울 수 있다.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShiftUpdateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub subject: Option<String>,
    pub grade: Option<String>,
    pub location: Option<String>,
    pub status: Option<ShiftStatus>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ShiftQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShiftResponse {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub subject: String,
    pub grade: Option<String>,
    pub location: Option<String>,
    pub status: ShiftStatus,
    pub teacher_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<ShiftModel> for ShiftResponse {
    fn from(model: ShiftModel) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            start_time: model.start_time,
            end_time: model.end_time,
            subject: model.subject,
            grade: model.grade,
            location: model.location,
            status: model.status,
            teacher_id: model.teacher_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShiftListResponse {
    pub id: i32,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub subject: String,
    pub grade: Option<String>,
    pub location: Option<String>,
    pub status: ShiftStatus,
    pub teacher: Option<UserSummary>,
}

impl ShiftListResponse {
    pub fn from_parts(model: ShiftModel, teacher: Option<UserModel>) -> Self {
        Self {
            id: model.id,
            title: model.title,
            start_time: model.start_time,
            end_time: model.end_time,
            subject: model.subject,
            grade: model.grade,
            location: model.location,
            status: model.status,
            teacher: teacher.map(UserSummary::from),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShiftDetailResponse {
    pub shift: ShiftResponse,
    pub teacher: Option<UserSummary>,
    pub substitute_requests: Vec<SubstituteRequestDetailResponse>,
}
