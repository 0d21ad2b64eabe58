//! `SeaORM` Entity for applications table.
//!
//! `documents` is a JSONB array of serialized `DocumentReference` values in
//! insertion order. It is only mutated through `ApplicationRegistry`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "applications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub position_title: String,
    pub company: String,
    pub job_requirements: Option<String>,
    pub job_qualifications: Option<String>,
    pub location: Option<String>,
    pub application_link: Option<String>,
    pub current_stage: String,
    pub priority: String,
    pub application_date: DateTimeWithTimeZone,
    pub interview_date_time: Option<DateTimeWithTimeZone>,
    #[sea_orm(column_type = "JsonBinary")]
    pub documents: Json,
    pub notes: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
