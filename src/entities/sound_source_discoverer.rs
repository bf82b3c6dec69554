use sea_orm::entity::prelude::*;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "sound_source_discoverers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub sound_source_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,

    #[sea_orm(belongs_to, from = "sound_source_id", to = "id")]
    pub sound_source: HasOne<super::sound_source::Entity>,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
