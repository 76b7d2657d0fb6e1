use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub auth_user_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: crate::models::Role,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::auth_accounts::Entity",
        from = "Column::AuthUserId",
        to = "super::auth_accounts::Column::Id",
        on_delete = "Cascade"
    )]
    AuthAccounts,
}

impl Related<super::auth_accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AuthAccounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
