use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

const NOW: &str = "(strftime('%s', 'now'))";

fn id_col<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name)
        .integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

fn notes_col<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name).text().not_null().default("").to_owned()
}

fn timestamp_col<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name)
        .integer()
        .not_null()
        .default(Expr::cust(NOW))
        .to_owned()
}

/// Many-to-many link table: composite primary key, both sides cascade.
fn junction_table(
    table: &str,
    (owner_col, owner_table): (&str, &str),
    (target_col, target_table): (&str, &str),
) -> TableCreateStatement {
    Table::create()
        .table(Alias::new(table))
        .if_not_exists()
        .col(ColumnDef::new(Alias::new(owner_col)).integer().not_null())
        .col(ColumnDef::new(Alias::new(target_col)).integer().not_null())
        .primary_key(
            Index::create()
                .col(Alias::new(owner_col))
                .col(Alias::new(target_col)),
        )
        .foreign_key(
            ForeignKey::create()
                .name(format!("fk_{table}_{owner_col}"))
                .from(Alias::new(table), Alias::new(owner_col))
                .to(Alias::new(owner_table), Alias::new("id"))
                .on_delete(ForeignKeyAction::Cascade),
        )
        .foreign_key(
            ForeignKey::create()
                .name(format!("fk_{table}_{target_col}"))
                .from(Alias::new(table), Alias::new(target_col))
                .to(Alias::new(target_table), Alias::new("id"))
                .on_delete(ForeignKeyAction::Cascade),
        )
        .to_owned()
}

const JUNCTIONS: &[(&str, (&str, &str), (&str, &str))] = &[
    (
        "game_tags",
        ("game_id", "game"),
        ("game_tag_id", "game_tag"),
    ),
    (
        "game_album_artists",
        ("game_id", "game"),
        ("person_id", "person"),
    ),
    (
        "person_products",
        ("person_id", "person"),
        ("product_id", "product"),
    ),
    (
        "song_composers",
        ("song_id", "song"),
        ("person_id", "person"),
    ),
    (
        "song_arrangers",
        ("song_id", "song"),
        ("person_id", "person"),
    ),
    (
        "sound_source_discoverers",
        ("sound_source_id", "sound_source"),
        ("user_id", "users"),
    ),
    (
        "sound_source_games",
        ("sound_source_id", "sound_source"),
        ("game_id", "game"),
    ),
    (
        "sound_source_songs",
        ("sound_source_id", "sound_source"),
        ("song_id", "song"),
    ),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Users only exist as sound source discoverers
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(&mut id_col(Users::Id))
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(&mut timestamp_col(Users::CreatedAt))
                    .col(&mut timestamp_col(Users::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GameTag::Table)
                    .if_not_exists()
                    .col(&mut id_col(GameTag::Id))
                    .col(
                        ColumnDef::new(GameTag::Name)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(GameTag::Slug)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(&mut notes_col(GameTag::Description))
                    .col(&mut timestamp_col(GameTag::CreatedAt))
                    .col(&mut timestamp_col(GameTag::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Game::Table)
                    .if_not_exists()
                    .col(&mut id_col(Game::Id))
                    .col(ColumnDef::new(Game::Title).string().not_null())
                    .col(ColumnDef::new(Game::ReleaseDate).date())
                    .col(ColumnDef::new(Game::ReleaseYear).integer())
                    .col(&mut notes_col(Game::Notes))
                    .col(&mut timestamp_col(Game::CreatedAt))
                    .col(&mut timestamp_col(Game::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Person::Table)
                    .if_not_exists()
                    .col(&mut id_col(Person::Id))
                    .col(ColumnDef::new(Person::Name).string().not_null())
                    .col(&mut notes_col(Person::Notes))
                    .col(&mut timestamp_col(Person::CreatedAt))
                    .col(&mut timestamp_col(Person::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Song::Table)
                    .if_not_exists()
                    .col(&mut id_col(Song::Id))
                    .col(ColumnDef::new(Song::Title).string().not_null())
                    .col(ColumnDef::new(Song::GameId).integer().not_null())
                    .col(ColumnDef::new(Song::TrackNumber).integer())
                    .col(&mut notes_col(Song::Notes))
                    .col(&mut timestamp_col(Song::CreatedAt))
                    .col(&mut timestamp_col(Song::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_song_game_id")
                            .from(Song::Table, Song::GameId)
                            .to(Game::Table, Game::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Company::Table)
                    .if_not_exists()
                    .col(&mut id_col(Company::Id))
                    .col(
                        ColumnDef::new(Company::Name)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(&mut notes_col(Company::Notes))
                    .col(&mut timestamp_col(Company::CreatedAt))
                    .col(&mut timestamp_col(Company::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Product::Table)
                    .if_not_exists()
                    .col(&mut id_col(Product::Id))
                    .col(ColumnDef::new(Product::Name).string().not_null())
                    .col(ColumnDef::new(Product::CompanyId).integer().not_null())
                    .col(&mut notes_col(Product::Notes))
                    .col(&mut timestamp_col(Product::CreatedAt))
                    .col(&mut timestamp_col(Product::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_company_id")
                            .from(Product::Table, Product::CompanyId)
                            .to(Company::Table, Company::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Bank::Table)
                    .if_not_exists()
                    .col(&mut id_col(Bank::Id))
                    .col(ColumnDef::new(Bank::Name).string().not_null())
                    .col(ColumnDef::new(Bank::ProductId).integer().not_null())
                    .col(&mut notes_col(Bank::Notes))
                    .col(&mut timestamp_col(Bank::CreatedAt))
                    .col(&mut timestamp_col(Bank::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bank_product_id")
                            .from(Bank::Table, Bank::ProductId)
                            .to(Product::Table, Product::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SoundSource::Table)
                    .if_not_exists()
                    .col(&mut id_col(SoundSource::Id))
                    .col(ColumnDef::new(SoundSource::Name).string().not_null())
                    .col(ColumnDef::new(SoundSource::BankId).integer())
                    .col(ColumnDef::new(SoundSource::ProductId).integer())
                    .col(&mut notes_col(SoundSource::Notes))
                    .col(&mut timestamp_col(SoundSource::CreatedAt))
                    .col(&mut timestamp_col(SoundSource::UpdatedAt))
                    .check(Expr::cust("bank_id IS NOT NULL OR product_id IS NOT NULL"))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sound_source_bank_id")
                            .from(SoundSource::Table, SoundSource::BankId)
                            .to(Bank::Table, Bank::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sound_source_product_id")
                            .from(SoundSource::Table, SoundSource::ProductId)
                            .to(Product::Table, Product::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        for (table, owner, target) in JUNCTIONS {
            manager
                .create_table(junction_table(table, *owner, *target))
                .await?;
        }

        // Natural keys
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_song_title_game_id")
                    .table(Song::Table)
                    .col(Song::Title)
                    .col(Song::GameId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_product_name_company_id")
                    .table(Product::Table)
                    .col(Product::Name)
                    .col(Product::CompanyId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_bank_name_product_id")
                    .table(Bank::Table)
                    .col(Bank::Name)
                    .col(Bank::ProductId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_sound_source_bank_id")
                    .table(SoundSource::Table)
                    .col(SoundSource::BankId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_sound_source_product_id")
                    .table(SoundSource::Table)
                    .col(SoundSource::ProductId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop tables in reverse order
        for (table, _, _) in JUNCTIONS.iter().rev() {
            manager
                .drop_table(Table::drop().table(Alias::new(*table)).to_owned())
                .await?;
        }
        manager
            .drop_table(Table::drop().table(SoundSource::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Bank::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Product::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Company::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Song::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Person::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Game::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GameTag::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum GameTag {
    Table,
    Id,
    Name,
    Slug,
    Description,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Game {
    Table,
    Id,
    Title,
    ReleaseDate,
    ReleaseYear,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Person {
    Table,
    Id,
    Name,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Song {
    Table,
    Id,
    Title,
    GameId,
    TrackNumber,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Company {
    Table,
    Id,
    Name,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Product {
    Table,
    Id,
    Name,
    CompanyId,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Bank {
    Table,
    Id,
    Name,
    ProductId,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum SoundSource {
    Table,
    Id,
    Name,
    BankId,
    ProductId,
    Notes,
    CreatedAt,
    UpdatedAt,
}
