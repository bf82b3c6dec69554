use sea_orm::entity::prelude::*;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "song_arrangers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub song_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub person_id: i64,

    #[sea_orm(belongs_to, from = "song_id", to = "id")]
    pub song: HasOne<super::song::Entity>,
    #[sea_orm(belongs_to, from = "person_id", to = "id")]
    pub person: HasOne<super::person::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
