//! Static description of every importable model: its fixture label, the
//! fixture file it lives in, and how each fixture field maps onto storage.

use std::fmt;

use sea_orm::{EntityTrait, IdenStatic, Iterable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModelKind {
    User,
    GameTag,
    Game,
    Person,
    Song,
    Company,
    Product,
    Bank,
    SoundSource,
}

/// Dependency order for import and export. Every reference points at a model
/// earlier in the list.
pub const IMPORT_ORDER: [ModelKind; 9] = [
    ModelKind::User,
    ModelKind::GameTag,
    ModelKind::Company,
    ModelKind::Product,
    ModelKind::Person,
    ModelKind::Game,
    ModelKind::Song,
    ModelKind::Bank,
    ModelKind::SoundSource,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Category {
    Users,
    Games,
    Songs,
    Sources,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Non-null text column
    Text,
    /// Nullable integer column
    Integer,
    /// Nullable `YYYY-MM-DD` date column
    Date,
    Reference { target: ModelKind, nullable: bool },
    Many { target: ModelKind, junction: Junction },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Name used in fixture `fields`
    pub name: &'static str,
    /// Storage column; empty for many-to-many fields
    pub column: &'static str,
    pub kind: FieldKind,
}

const fn text(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        column: name,
        kind: FieldKind::Text,
    }
}

const fn reference(
    name: &'static str,
    column: &'static str,
    target: ModelKind,
    nullable: bool,
) -> FieldSpec {
    FieldSpec {
        name,
        column,
        kind: FieldKind::Reference { target, nullable },
    }
}

const fn many(name: &'static str, target: ModelKind, junction: Junction) -> FieldSpec {
    FieldSpec {
        name,
        column: "",
        kind: FieldKind::Many { target, junction },
    }
}

const USER_FIELDS: &[FieldSpec] = &[text("username")];

const GAME_TAG_FIELDS: &[FieldSpec] = &[text("name"), text("slug"), text("description")];

const GAME_FIELDS: &[FieldSpec] = &[
    text("title"),
    FieldSpec {
        name: "release_date",
        column: "release_date",
        kind: FieldKind::Date,
    },
    FieldSpec {
        name: "release_year",
        column: "release_year",
        kind: FieldKind::Integer,
    },
    many("album_artists", ModelKind::Person, Junction::GameAlbumArtists),
    many("tags", ModelKind::GameTag, Junction::GameTags),
    text("notes"),
];

const PERSON_FIELDS: &[FieldSpec] = &[
    text("name"),
    many("products", ModelKind::Product, Junction::PersonProducts),
    text("notes"),
];

const SONG_FIELDS: &[FieldSpec] = &[
    text("title"),
    reference("game", "game_id", ModelKind::Game, false),
    many("composers", ModelKind::Person, Junction::SongComposers),
    many("arrangers", ModelKind::Person, Junction::SongArrangers),
    FieldSpec {
        name: "track_number",
        column: "track_number",
        kind: FieldKind::Integer,
    },
    text("notes"),
];

const COMPANY_FIELDS: &[FieldSpec] = &[text("name"), text("notes")];

const PRODUCT_FIELDS: &[FieldSpec] = &[
    text("name"),
    reference("company", "company_id", ModelKind::Company, false),
    text("notes"),
];

const BANK_FIELDS: &[FieldSpec] = &[
    text("name"),
    reference("product", "product_id", ModelKind::Product, false),
    text("notes"),
];

const SOUND_SOURCE_FIELDS: &[FieldSpec] = &[
    text("name"),
    reference("bank", "bank_id", ModelKind::Bank, true),
    reference("product", "product_id", ModelKind::Product, true),
    many("discoverers", ModelKind::User, Junction::SoundSourceDiscoverers),
    many("games", ModelKind::Game, Junction::SoundSourceGames),
    many("songs", ModelKind::Song, Junction::SoundSourceSongs),
    text("notes"),
];

impl ModelKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::User => "users.User",
            Self::GameTag => "games.GameTag",
            Self::Game => "games.Game",
            Self::Person => "songs.Person",
            Self::Song => "songs.Song",
            Self::Company => "sources.Company",
            Self::Product => "sources.Product",
            Self::Bank => "sources.Bank",
            Self::SoundSource => "sources.SoundSource",
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Self::User => Category::Users,
            Self::GameTag | Self::Game => Category::Games,
            Self::Person | Self::Song => Category::Songs,
            Self::Company | Self::Product | Self::Bank | Self::SoundSource => Category::Sources,
        }
    }

    /// Fixture file name without extension
    pub fn file_stem(&self) -> &'static str {
        match self {
            Self::User => "users_users",
            Self::GameTag => "games_gametags",
            Self::Game => "games_games",
            Self::Person => "songs_people",
            Self::Song => "songs_songs",
            Self::Company => "sources_companies",
            Self::Product => "sources_products",
            Self::Bank => "sources_banks",
            Self::SoundSource => "sources_soundsources",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            Self::User => "users",
            Self::GameTag => "game_tag",
            Self::Game => "game",
            Self::Person => "person",
            Self::Song => "song",
            Self::Company => "company",
            Self::Product => "product",
            Self::Bank => "bank",
            Self::SoundSource => "sound_source",
        }
    }

    /// Resolve `app.Model` (or `project.app.Model`). The app must match and
    /// the model name is compared case-insensitively.
    pub fn from_label(label: &str) -> Option<Self> {
        let mut parts = label.rsplit('.');
        let model = parts.next()?;
        let app = parts.next()?;
        IMPORT_ORDER.into_iter().find(|kind| {
            let (kind_app, kind_model) = kind
                .label()
                .split_once('.')
                .unwrap_or(("", kind.label()));
            kind_app == app && kind_model.eq_ignore_ascii_case(model)
        })
    }

    pub fn fields(&self) -> &'static [FieldSpec] {
        match self {
            Self::User => USER_FIELDS,
            Self::GameTag => GAME_TAG_FIELDS,
            Self::Game => GAME_FIELDS,
            Self::Person => PERSON_FIELDS,
            Self::Song => SONG_FIELDS,
            Self::Company => COMPANY_FIELDS,
            Self::Product => PRODUCT_FIELDS,
            Self::Bank => BANK_FIELDS,
            Self::SoundSource => SOUND_SOURCE_FIELDS,
        }
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields().iter().find(|spec| spec.name == name)
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Many-to-many junction tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Junction {
    GameTags,
    GameAlbumArtists,
    PersonProducts,
    SongComposers,
    SongArrangers,
    SoundSourceDiscoverers,
    SoundSourceGames,
    SoundSourceSongs,
}

impl Junction {
    pub fn owner_column(&self) -> &'static str {
        match self {
            Self::GameTags | Self::GameAlbumArtists => "game_id",
            Self::PersonProducts => "person_id",
            Self::SongComposers | Self::SongArrangers => "song_id",
            Self::SoundSourceDiscoverers | Self::SoundSourceGames | Self::SoundSourceSongs => {
                "sound_source_id"
            }
        }
    }

    pub fn target_column(&self) -> &'static str {
        match self {
            Self::GameTags => "game_tag_id",
            Self::GameAlbumArtists | Self::SongComposers | Self::SongArrangers => "person_id",
            Self::PersonProducts => "product_id",
            Self::SoundSourceDiscoverers => "user_id",
            Self::SoundSourceGames => "game_id",
            Self::SoundSourceSongs => "song_id",
        }
    }
}

/// Look up an entity column by its storage name
pub fn column<E: EntityTrait>(name: &str) -> Option<E::Column> {
    E::Column::iter().find(|col| col.as_str() == name)
}

/// Run `$body` with `$entity` aliased to the sea-orm entity behind a `ModelKind`
macro_rules! with_entity {
    ($kind:expr, $entity:ident => $body:expr) => {{
        use $crate::entities;
        use $crate::fixtures::models::ModelKind;
        match $kind {
            ModelKind::User => {
                type $entity = entities::user::Entity;
                $body
            }
            ModelKind::GameTag => {
                type $entity = entities::game_tag::Entity;
                $body
            }
            ModelKind::Game => {
                type $entity = entities::game::Entity;
                $body
            }
            ModelKind::Person => {
                type $entity = entities::person::Entity;
                $body
            }
            ModelKind::Song => {
                type $entity = entities::song::Entity;
                $body
            }
            ModelKind::Company => {
                type $entity = entities::company::Entity;
                $body
            }
            ModelKind::Product => {
                type $entity = entities::product::Entity;
                $body
            }
            ModelKind::Bank => {
                type $entity = entities::bank::Entity;
                $body
            }
            ModelKind::SoundSource => {
                type $entity = entities::sound_source::Entity;
                $body
            }
        }
    }};
}

/// Same as `with_entity!` for junction tables
macro_rules! with_junction {
    ($junction:expr, $entity:ident => $body:expr) => {{
        use $crate::entities;
        use $crate::fixtures::models::Junction;
        match $junction {
            Junction::GameTags => {
                type $entity = entities::game_tag_link::Entity;
                $body
            }
            Junction::GameAlbumArtists => {
                type $entity = entities::game_album_artist::Entity;
                $body
            }
            Junction::PersonProducts => {
                type $entity = entities::person_product::Entity;
                $body
            }
            Junction::SongComposers => {
                type $entity = entities::song_composer::Entity;
                $body
            }
            Junction::SongArrangers => {
                type $entity = entities::song_arranger::Entity;
                $body
            }
            Junction::SoundSourceDiscoverers => {
                type $entity = entities::sound_source_discoverer::Entity;
                $body
            }
            Junction::SoundSourceGames => {
                type $entity = entities::sound_source_game::Entity;
                $body
            }
            Junction::SoundSourceSongs => {
                type $entity = entities::sound_source_song::Entity;
                $body
            }
        }
    }};
}

pub(crate) use with_entity;
pub(crate) use with_junction;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities;

    #[test]
    fn labels_round_trip() {
        for kind in IMPORT_ORDER {
            assert_eq!(ModelKind::from_label(kind.label()), Some(kind));
        }
    }

    #[test]
    fn label_matching_is_lenient_on_case_and_prefix() {
        assert_eq!(
            ModelKind::from_label("games.gametag"),
            Some(ModelKind::GameTag)
        );
        assert_eq!(
            ModelKind::from_label("vgm_source_database.sources.SoundSource"),
            Some(ModelKind::SoundSource)
        );
        assert_eq!(ModelKind::from_label("sources.Game"), None);
        assert_eq!(ModelKind::from_label("Game"), None);
        assert_eq!(ModelKind::from_label("games.Console"), None);
    }

    #[test]
    fn references_point_backwards_in_import_order() {
        let position = |kind: ModelKind| IMPORT_ORDER.iter().position(|k| *k == kind).unwrap();
        for kind in IMPORT_ORDER {
            for spec in kind.fields() {
                let target = match spec.kind {
                    FieldKind::Reference { target, .. } | FieldKind::Many { target, .. } => target,
                    _ => continue,
                };
                assert!(
                    position(target) < position(kind),
                    "{}.{} points forward to {}",
                    kind,
                    spec.name,
                    target
                );
            }
        }
    }

    #[test]
    fn every_plain_field_has_a_column() {
        for kind in IMPORT_ORDER {
            for spec in kind.fields() {
                if matches!(spec.kind, FieldKind::Many { .. }) {
                    continue;
                }
                let found = with_entity!(kind, E => column::<E>(spec.column).is_some());
                assert!(found, "{} has no column {}", kind, spec.column);
            }
        }
    }

    #[test]
    fn junction_columns_exist() {
        let junctions = [
            Junction::GameTags,
            Junction::GameAlbumArtists,
            Junction::PersonProducts,
            Junction::SongComposers,
            Junction::SongArrangers,
            Junction::SoundSourceDiscoverers,
            Junction::SoundSourceGames,
            Junction::SoundSourceSongs,
        ];
        for junction in junctions {
            let found = with_junction!(junction, J => {
                column::<J>(junction.owner_column()).is_some()
                    && column::<J>(junction.target_column()).is_some()
            });
            assert!(found, "{:?}", junction);
        }
    }

    #[test]
    fn column_lookup() {
        assert!(column::<entities::song::Entity>("game_id").is_some());
        assert!(column::<entities::song::Entity>("game").is_none());
    }
}
