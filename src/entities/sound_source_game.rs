use sea_orm::entity::prelude::*;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "sound_source_games")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub sound_source_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub game_id: i64,

    #[sea_orm(belongs_to, from = "sound_source_id", to = "id")]
    pub sound_source: HasOne<super::sound_source::Entity>,
    #[sea_orm(belongs_to, from = "game_id", to = "id")]
    pub game: HasOne<super::game::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
