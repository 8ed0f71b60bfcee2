use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use crate::model::shift::ShiftCreateRequest;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shifts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub subject: String, // 쉼표로 연결된 과목 목록 (입력 순서 유지)
    pub grade: Option<String>,
    pub location: Option<String>,
    pub status: ShiftStatus,
    pub teacher_id: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, Copy, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "shift_status")]
#[serde(rename_all = "UPPERCASE")]
pub enum ShiftStatus {
    #[sea_orm(string_value = "SCHEDULED")]
    Scheduled,

    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,

    #[sea_orm(string_value = "COMPLETED")]
    Completed,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::TeacherId",
        to = "super::user::Column::Id"
    )]
    Teacher,

    #[sea_orm(has_many = "super::substitute_request::Entity")]
    SubstituteRequests,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Teacher.def()
    }
}

impl Related<super::substitute_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SubstituteRequests.def()
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
    pub fn from_create(data: &ShiftCreateRequest, owner_id: i32) -> Self {
        let now = Utc::now();

        Self {
            title: Set(data.title.trim().to_string()),
            description: Set(data.description.clone()),
            start_time: Set(data.start_time),
            end_time: Set(data.end_time),
            subject: Set(data.subject.trim().to_string()),
            grade: Set(data.grade.clone()),
            location: Set(data.location.clone()),
            status: Set(ShiftStatus::Scheduled),
            teacher_id: Set(owner_id),
            created_at: Set(now),
            updated_at: Set(None),
            ..Default::default()
        }
    }
}
