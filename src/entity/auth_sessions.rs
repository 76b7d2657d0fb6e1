use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "auth_sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub account_id: Uuid,
    pub expires_at: DateTimeWithTimeZone,
    pub revoked_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::auth_accounts::Entity",
        from = "Column::AccountId",
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
