use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "cases")]
pub struct Model {
    /// Receipt number, upper-case
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub name: String,

    pub status: String,

    pub old_status: String,

    pub checked_at: Option<String>,

    pub created_at: String,
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
