use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,

    pub email: String,

    /// Argon2id password hash
    pub password_hash: String,

    /// Outstanding password-reset token, cleared once used.
    #[sea_orm(indexed)]
    pub reset_token: Option<String>,

    /// Unix timestamp (seconds) at which `reset_token` was issued.
    pub reset_issued_at: Option<i64>,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_cases::Entity")]
    UserCases,
}

impl Related<super::user_cases::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserCases.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
