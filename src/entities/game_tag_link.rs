use sea_orm::entity::prelude::*;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "game_tags")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub game_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub game_tag_id: i64,

    #[sea_orm(belongs_to, from = "game_id", to = "id")]
    pub game: HasOne<super::game::Entity>,
    #[sea_orm(belongs_to, from = "game_tag_id", to = "id")]
    pub game_tag: HasOne<super::game_tag::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
