use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use crate::model::substitute_request::SubstituteRequestCreateRequest;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "substitute_requests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub shift_id: i32,
    pub reason: String,
    pub priority: RequestPriority,
    pub status: RequestStatus,
    pub created_by_id: i32,
    pub accepted_by_id: Option<i32>,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

// MySQL ENUM은 선언 순서로 정렬되므로 우선순위 오름차순으로 선언한다
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, Copy, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "request_priority")]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestPriority {
    #[sea_orm(string_value = "LOW")]
    Low,

    #[sea_orm(string_value = "NORMAL")]
    Normal,

    #[sea_orm(string_value = "HIGH")]
    High,

    #[sea_orm(string_value = "URGENT")]
    Urgent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, Copy, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "request_status")]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,

    #[sea_orm(string_value = "ACCEPTED")]
    Accepted,

    #[sea_orm(string_value = "REJECTED")]
    Rejected,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::shift::Entity",
        from = "Column::ShiftId",
        to = "super::shift::Column::Id"
    )]
    Shift,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatedById",
        to = "super::user::Column::Id"
    )]
    CreatedBy,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AcceptedById",
        to = "super::user::Column::Id"
    )]
    AcceptedBy,
}

impl Related<super::shift::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shift.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CreatedBy.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr> {
        let now = Utc::now();
        if insert {
            self.created_at = Set(now);
        } else {
            self.updated_at = Set(Some(now));
        }
        Ok(self)
    }
}

impl ActiveModel {
    pub fn from_request(data: &SubstituteRequestCreateRequest, candidate_id: i32) -> Self {
        let now = Utc::now();

        Self {
            shift_id: Set(data.shift_id),
            reason: Set(data.reason.trim().to_string()),
            priority: Set(data.priority.unwrap_or(RequestPriority::Normal)),
            status: Set(RequestStatus::Pending),
            created_by_id: Set(candidate_id),
            accepted_by_id: Set(None),
            created_at: Set(now),
            updated_at: Set(None),
            ..Default::default()
        }
    }
}
