//! Turns spreadsheet rows into fixture records.
//!
//! Every run owns its lookup tables. Keys are handed out in first-occurrence
//! order while scanning, so the same input always yields the same keys.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value, json};

use super::classify::{ClassifierRules, RowClass, RowView};
use super::format::FixtureRecord;
use super::models::ModelKind;
use crate::ports::sheets::{Sheet, SheetRow};
use crate::slug::{tag_slug_base, unique_slug};

static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\((\d{4})\)").unwrap());

const SKIPPED_CONTENT_LEN: usize = 100;

/// Natural key to synthetic key, counting from 1
#[derive(Debug)]
struct KeyTable<K: Ord> {
    keys: BTreeMap<K, i64>,
    next: i64,
}

impl<K: Ord> KeyTable<K> {
    fn new() -> Self {
        Self {
            keys: BTreeMap::new(),
            next: 1,
        }
    }

    fn intern(&mut self, key: K) -> i64 {
        if let Some(pk) = self.keys.get(&key) {
            return *pk;
        }
        let pk = self.next;
        self.next += 1;
        self.keys.insert(key, pk);
        pk
    }

    fn get(&self, key: &K) -> Option<i64> {
        self.keys.get(key).copied()
    }

    /// Entries sorted by natural key
    fn iter(&self) -> impl Iterator<Item = (&K, i64)> {
        self.keys.iter().map(|(k, pk)| (k, *pk))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    SectionHeader,
    BeforeFirstGame,
    NoCompanyOrProduct,
    NameTooShort,
    NoBankOrProduct,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SectionHeader => "section header",
            Self::BeforeFirstGame => "precedes any game title",
            Self::NoCompanyOrProduct => "no company or product",
            Self::NameTooShort => "sound source name too short",
            Self::NoBankOrProduct => "no bank or product could be resolved",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub file: String,
    pub row: usize,
    pub content: String,
    pub reason: SkipReason,
}

#[derive(Debug)]
struct GameDraft {
    pk: i64,
    title: String,
    tag: i64,
    release_year: Option<i32>,
}

#[derive(Debug)]
struct SourceDraft {
    name: String,
    bank: Option<i64>,
    product: Option<i64>,
    game: i64,
    notes: String,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct BuildOutput {
    pub game_tags: Vec<FixtureRecord>,
    pub companies: Vec<FixtureRecord>,
    pub products: Vec<FixtureRecord>,
    pub banks: Vec<FixtureRecord>,
    pub games: Vec<FixtureRecord>,
    pub sound_sources: Vec<FixtureRecord>,
    pub skipped: Vec<SkippedRow>,
}

impl BuildOutput {
    /// Collections in the order they are written
    pub fn collections(&self) -> [(ModelKind, &[FixtureRecord]); 6] {
        [
            (ModelKind::GameTag, &self.game_tags),
            (ModelKind::Company, &self.companies),
            (ModelKind::Product, &self.products),
            (ModelKind::Bank, &self.banks),
            (ModelKind::Game, &self.games),
            (ModelKind::SoundSource, &self.sound_sources),
        ]
    }
}

struct BuildState<'r> {
    rules: &'r ClassifierRules,
    tags: KeyTable<String>,
    tag_slugs: BTreeMap<String, String>,
    used_slugs: BTreeSet<String>,
    companies: KeyTable<String>,
    /// (product, company)
    products: KeyTable<(String, String)>,
    /// (bank, product, company)
    banks: KeyTable<(String, String, String)>,
    games: KeyTable<String>,
    game_drafts: Vec<GameDraft>,
    sources: Vec<SourceDraft>,
    skipped: Vec<SkippedRow>,
}

pub fn build(rules: &ClassifierRules, sheets: &[Sheet]) -> BuildOutput {
    let mut state = BuildState {
        rules,
        tags: KeyTable::new(),
        tag_slugs: BTreeMap::new(),
        used_slugs: BTreeSet::new(),
        companies: KeyTable::new(),
        products: KeyTable::new(),
        banks: KeyTable::new(),
        games: KeyTable::new(),
        game_drafts: Vec::new(),
        sources: Vec::new(),
        skipped: Vec::new(),
    };

    for sheet in sheets {
        state.scan_sheet(sheet);
    }

    state.finish()
}

fn truncated(text: &str) -> String {
    text.chars().take(SKIPPED_CONTENT_LEN).collect()
}

fn release_year(title: &str, product: &str) -> Option<i32> {
    let captures = YEAR.captures(title).or_else(|| YEAR.captures(product))?;
    captures[1].parse().ok()
}

impl BuildState<'_> {
    fn scan_sheet(&mut self, sheet: &Sheet) {
        let tag = self.intern_tag(&sheet.name);
        log::info!("Processing {} -> tag '{}'", sheet.source, sheet.name);

        let mut current_game: Option<i64> = None;
        let (games_before, sources_before) = (self.game_drafts.len(), self.sources.len());

        for row in &sheet.rows {
            match self.rules.classify(row) {
                RowClass::Blank => {}
                RowClass::SectionHeader => self.skip(sheet, row, SkipReason::SectionHeader),
                RowClass::GameTitle => {
                    let view = self.rules.view(row);
                    current_game = Some(self.intern_game(&view, tag));
                }
                RowClass::Entry => match current_game {
                    None => self.skip(sheet, row, SkipReason::BeforeFirstGame),
                    Some(game) => {
                        let view = self.rules.view(row);
                        if let Err(reason) = self.add_sound_source(&view, game) {
                            self.skip(sheet, row, reason);
                        }
                    }
                },
            }
        }

        log::info!(
            "  Found {} new games, {} sound sources",
            self.game_drafts.len() - games_before,
            self.sources.len() - sources_before
        );
    }

    fn skip(&mut self, sheet: &Sheet, row: &SheetRow, reason: SkipReason) {
        let primary = row.get(&self.rules.columns.primary);
        let content = if primary.is_empty() {
            row.cells
                .iter()
                .map(|(_, value)| value.trim())
                .filter(|value| !value.is_empty())
                .collect::<Vec<_>>()
                .join(" | ")
        } else {
            primary.to_string()
        };
        log::debug!("Skipping {} row {}: {}", sheet.source, row.line, reason);
        self.skipped.push(SkippedRow {
            file: sheet.source.clone(),
            row: row.line,
            content: truncated(&content),
            reason,
        });
    }

    fn intern_tag(&mut self, name: &str) -> i64 {
        if let Some(pk) = self.tags.get(&name.to_string()) {
            return pk;
        }
        let pk = self.tags.intern(name.to_string());

        let base = tag_slug_base(name, pk);
        let slug = unique_slug(&base, |s| self.used_slugs.contains(s));
        self.used_slugs.insert(slug.clone());
        self.tag_slugs.insert(name.to_string(), slug);
        pk
    }

    fn intern_game(&mut self, row: &RowView, tag: i64) -> i64 {
        let title = row.primary;
        if let Some(pk) = self.games.get(&title.to_string()) {
            log::debug!("Game '{}' seen again (pk={})", title, pk);
            return pk;
        }
        let pk = self.games.intern(title.to_string());
        let release_year = release_year(title, row.product);
        log::debug!("New game '{}' (pk={}, year={:?})", title, pk, release_year);
        self.game_drafts.push(GameDraft {
            pk,
            title: title.to_string(),
            tag,
            release_year,
        });
        pk
    }

    fn add_sound_source(&mut self, row: &RowView, game: i64) -> Result<(), SkipReason> {
        let (company, product, bank) = (row.primary, row.product, row.bank);
        if company.is_empty() && product.is_empty() {
            return Err(SkipReason::NoCompanyOrProduct);
        }

        let name = if row.program.is_empty() {
            company
        } else {
            row.program
        };
        if name.chars().count() < self.rules.min_name_len {
            return Err(SkipReason::NameTooShort);
        }

        // Products hang off a company, so nothing resolves without one
        if company.is_empty() {
            return Err(SkipReason::NoBankOrProduct);
        }
        self.companies.intern(company.to_string());

        let (product_pk, bank_pk) = if product.is_empty() {
            let fallback = (company.to_string(), company.to_string());
            (self.products.intern(fallback), None)
        } else {
            let product_pk = self
                .products
                .intern((product.to_string(), company.to_string()));
            let bank_pk = (!bank.is_empty()).then(|| {
                self.banks
                    .intern((bank.to_string(), product.to_string(), company.to_string()))
            });
            (product_pk, bank_pk)
        };

        let mut notes = Vec::new();
        if !row.notes.is_empty() {
            notes.push(row.notes.to_string());
        }
        if !row.examples.is_empty() {
            notes.push(format!("Examples: {}", row.examples));
        }
        if !bank.is_empty() && !name.contains(bank) {
            notes.push(format!("Path/Bank: {bank}"));
        }

        log::debug!(
            "Sound source '{}' (product={}, bank={:?})",
            name,
            product_pk,
            bank_pk
        );
        self.sources.push(SourceDraft {
            name: name.to_string(),
            bank: bank_pk,
            product: Some(product_pk),
            game,
            notes: notes.join(" | "),
        });
        Ok(())
    }

    fn finish(self) -> BuildOutput {
        let record = |kind: ModelKind, pk: i64, fields: Value| {
            let fields: Map<String, Value> = match fields {
                Value::Object(map) => map,
                _ => Map::new(),
            };
            FixtureRecord::new(kind.label(), pk, fields)
        };

        let game_tags = self
            .tags
            .iter()
            .map(|(name, pk)| {
                let slug = self.tag_slugs.get(name).cloned().unwrap_or_default();
                record(
                    ModelKind::GameTag,
                    pk,
                    json!({ "name": name, "slug": slug, "description": "" }),
                )
            })
            .collect();

        let companies = self
            .companies
            .iter()
            .map(|(name, pk)| record(ModelKind::Company, pk, json!({ "name": name, "notes": "" })))
            .collect();

        let products = self
            .products
            .iter()
            .filter_map(|((name, company), pk)| {
                let company = self.companies.get(company)?;
                Some(record(
                    ModelKind::Product,
                    pk,
                    json!({ "name": name, "company": company, "notes": "" }),
                ))
            })
            .collect();

        let banks = self
            .banks
            .iter()
            .filter_map(|((name, product, company), pk)| {
                let product = self.products.get(&(product.clone(), company.clone()))?;
                Some(record(
                    ModelKind::Bank,
                    pk,
                    json!({ "name": name, "product": product, "notes": "" }),
                ))
            })
            .collect();

        let games = self
            .game_drafts
            .iter()
            .map(|game| {
                record(
                    ModelKind::Game,
                    game.pk,
                    json!({
                        "title": game.title,
                        "release_date": null,
                        "release_year": game.release_year,
                        "album_artists": [],
                        "tags": [game.tag],
                        "notes": "",
                    }),
                )
            })
            .collect();

        let sound_sources = self
            .sources
            .iter()
            .zip(1..)
            .map(|(source, pk)| {
                record(
                    ModelKind::SoundSource,
                    pk,
                    json!({
                        "name": source.name,
                        "bank": source.bank,
                        "product": source.product,
                        "discoverers": [],
                        "games": [source.game],
                        "songs": [],
                        "notes": source.notes,
                    }),
                )
            })
            .collect();

        BuildOutput {
            game_tags,
            companies,
            products,
            banks,
            games,
            sound_sources,
            skipped: self.skipped,
        }
    }
}

/// Plain-text report of skipped rows, grouped by source file
pub fn render_skip_report(skipped: &[SkippedRow]) -> String {
    let rule = "=".repeat(60);
    let thin = "-".repeat(60);

    let mut by_file: BTreeMap<&str, Vec<&SkippedRow>> = BTreeMap::new();
    for item in skipped {
        by_file.entry(item.file.as_str()).or_default().push(item);
    }

    let mut out = String::new();
    let _ = writeln!(out, "SKIPPED LINES REPORT");
    let _ = writeln!(out, "{rule}\n");
    let _ = writeln!(out, "Total skipped lines: {}\n", skipped.len());
    for (file, items) in by_file {
        let _ = writeln!(out, "\nFile: {file}");
        let _ = writeln!(out, "{thin}");
        for item in items {
            let _ = writeln!(out, "  Row {}: {}", item.row, item.content);
            let _ = writeln!(out, "    Reason: {}", item.reason);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: [&str; 6] = [
        "Company/Manufacturer",
        "Product",
        "Path/Bank",
        "Program",
        "Notes",
        "Examples",
    ];

    /// Rows given as the six known columns in order
    fn sheet(name: &str, rows: &[[&str; 6]]) -> Sheet {
        Sheet {
            name: name.to_string(),
            source: format!("NEWER VGM Sound Sources - {name}.csv"),
            rows: rows
                .iter()
                .enumerate()
                .map(|(i, cells)| {
                    SheetRow::new(
                        i + 2,
                        COLUMNS
                            .iter()
                            .zip(cells.iter())
                            .map(|(k, v)| (k.to_string(), v.to_string()))
                            .collect(),
                    )
                })
                .collect(),
        }
    }

    fn field<'a>(record: &'a FixtureRecord, name: &str) -> &'a Value {
        &record.fields[name]
    }

    #[test]
    fn builds_games_and_sources() {
        let rules = ClassifierRules::default();
        let sheets = [sheet(
            "Mario",
            &[
                ["Super Mario Bros.: Special Edition (1988)", "", "", "", "", ""],
                ["Roland", "JV-1080", "Preset A", "Pizz Strings", "layered", "World 1-1"],
                ["Korg", "M1", "", "Universe", "", ""],
            ],
        )];

        let out = build(&rules, &sheets);

        assert_eq!(out.game_tags.len(), 1);
        assert_eq!(field(&out.game_tags[0], "slug"), &json!("mario"));

        assert_eq!(out.games.len(), 1);
        let game = &out.games[0];
        assert_eq!(game.model, "games.Game");
        assert_eq!(field(game, "release_year"), &json!(1988));
        assert_eq!(field(game, "release_date"), &Value::Null);
        assert_eq!(field(game, "tags"), &json!([1]));

        assert_eq!(out.sound_sources.len(), 2);
        let pizz = &out.sound_sources[0];
        assert_eq!(field(pizz, "name"), &json!("Pizz Strings"));
        assert_eq!(field(pizz, "bank"), &json!(1));
        assert_eq!(field(pizz, "product"), &json!(1));
        assert_eq!(field(pizz, "games"), &json!([1]));
        assert_eq!(
            field(pizz, "notes"),
            &json!("layered | Examples: World 1-1 | Path/Bank: Preset A")
        );

        let universe = &out.sound_sources[1];
        assert_eq!(field(universe, "bank"), &Value::Null);
        assert_eq!(field(universe, "product"), &json!(2));
        assert!(out.skipped.is_empty());
    }

    #[test]
    fn deduplicates_natural_keys() {
        let rules = ClassifierRules::default();
        let sheets = [sheet(
            "Zelda",
            &[
                ["Zelda: Ocarina of Time", "", "", "", "", ""],
                ["Roland", "JV-1080", "Orch", "Strings", "", ""],
                ["Roland", "JV-1080", "Orch", "Brass", "", ""],
                ["Roland", "D-50", "Orch", "Pad", "", ""],
                ["Yamaha", "D-50", "", "Bell", "", ""],
            ],
        )];

        let out = build(&rules, &sheets);

        assert_eq!(out.companies.len(), 2);
        // (D-50, Roland), (D-50, Yamaha), (JV-1080, Roland)
        assert_eq!(out.products.len(), 3);
        // (Orch, JV-1080, Roland), (Orch, D-50, Roland)
        assert_eq!(out.banks.len(), 2);

        let strings = &out.sound_sources[0];
        let brass = &out.sound_sources[1];
        assert_eq!(field(strings, "bank"), field(brass, "bank"));
        assert_eq!(field(strings, "product"), field(brass, "product"));
    }

    #[test]
    fn sorted_emission_keeps_first_occurrence_keys() {
        let rules = ClassifierRules::default();
        let sheets = [sheet(
            "Mario",
            &[
                ["Super Mario World (SNES)", "", "", "", "", ""],
                ["Yamaha", "DX7", "", "E.Piano", "", ""],
                ["Korg", "M1", "", "Universe", "", ""],
            ],
        )];

        let out = build(&rules, &sheets);

        let companies: Vec<_> = out
            .companies
            .iter()
            .map(|r| (field(r, "name").clone(), r.pk))
            .collect();
        assert_eq!(
            companies,
            vec![(json!("Korg"), 2), (json!("Yamaha"), 1)]
        );
    }

    #[test]
    fn company_without_product_gets_fallback_product() {
        let rules = ClassifierRules::default();
        let sheets = [sheet(
            "Kirby",
            &[
                ["Kirby's Adventure (NES)", "", "", "", "", ""],
                ["E-mu", "", "", "Choir", "", ""],
            ],
        )];

        let out = build(&rules, &sheets);

        assert_eq!(out.products.len(), 1);
        let product = &out.products[0];
        assert_eq!(field(product, "name"), &json!("E-mu"));
        assert_eq!(field(product, "company"), &json!(1));
        assert_eq!(
            field(&out.sound_sources[0], "product"),
            &json!(product.pk)
        );
    }

    #[test]
    fn never_emits_source_without_bank_or_product() {
        let rules = ClassifierRules::default();
        let sheets = [sheet(
            "Sonic",
            &[
                ["Sonic the Hedgehog (1991)", "", "", "", "", ""],
                ["", "SC-55", "", "Slap Bass", "", ""],
                ["", "", "", "Orphan", "", ""],
                ["Roland", "SC-55", "", "Fretless", "", ""],
            ],
        )];

        let out = build(&rules, &sheets);

        assert_eq!(out.sound_sources.len(), 1);
        for source in &out.sound_sources {
            assert!(
                !field(source, "bank").is_null() || !field(source, "product").is_null()
            );
        }
        let reasons: Vec<_> = out.skipped.iter().map(|s| (s.row, s.reason)).collect();
        assert_eq!(
            reasons,
            vec![
                (3, SkipReason::NoBankOrProduct),
                (4, SkipReason::NoCompanyOrProduct)
            ]
        );
        assert_eq!(out.skipped[0].content, "SC-55 | Slap Bass");
    }

    #[test]
    fn headers_and_rows_before_first_game_are_reported() {
        let rules = ClassifierRules::default();
        let sheets = [sheet(
            "Metroid",
            &[
                ["Please remember to credit", "", "", "", "", ""],
                ["Roland", "JV-1080", "", "Strings", "", ""],
                ["", "", "", "", "", ""],
                ["Super Metroid (SNES)", "", "", "", "", ""],
                ["STUFF TO FIND", "", "", "", "", ""],
                ["Korg", "M1", "", "X", "", ""],
            ],
        )];

        let out = build(&rules, &sheets);

        let reasons: Vec<_> = out.skipped.iter().map(|s| (s.row, s.reason)).collect();
        assert_eq!(
            reasons,
            vec![
                (2, SkipReason::SectionHeader),
                (3, SkipReason::BeforeFirstGame),
                (6, SkipReason::SectionHeader),
                (7, SkipReason::NameTooShort),
            ]
        );
        assert!(out.sound_sources.is_empty());
    }

    #[test]
    fn games_merge_across_sheets() {
        let rules = ClassifierRules::default();
        let sheets = [
            sheet(
                "Mario",
                &[
                    ["Super Smash Bros. Melee (GameCube)", "", "", "", "", ""],
                    ["Korg", "M1", "", "Universe", "", ""],
                ],
            ),
            sheet(
                "Zelda",
                &[
                    ["Super Smash Bros. Melee (GameCube)", "", "", "", "", ""],
                    ["Korg", "M1", "", "Lore", "", ""],
                ],
            ),
        ];

        let out = build(&rules, &sheets);

        assert_eq!(out.game_tags.len(), 2);
        assert_eq!(out.games.len(), 1);
        // Tag of the sheet the game was first seen in
        assert_eq!(field(&out.games[0], "tags"), &json!([1]));
        assert_eq!(field(&out.sound_sources[1], "games"), &json!([1]));
    }

    #[test]
    fn colliding_slugs_get_suffixes() {
        let rules = ClassifierRules::default();
        let sheets = [
            sheet("Pokémon", &[]),
            sheet("Pokemon", &[]),
            sheet("POKEMON!", &[]),
            sheet("★", &[]),
        ];

        let out = build(&rules, &sheets);

        let slugs: BTreeMap<String, String> = out
            .game_tags
            .iter()
            .map(|r| {
                (
                    field(r, "name").as_str().unwrap().to_string(),
                    field(r, "slug").as_str().unwrap().to_string(),
                )
            })
            .collect();
        assert_eq!(slugs["Pokémon"], "pokemon");
        assert_eq!(slugs["Pokemon"], "pokemon-2");
        assert_eq!(slugs["POKEMON!"], "pokemon-3");
        assert_eq!(slugs["★"], "tag-4");
    }

    #[test]
    fn release_year_falls_back_to_product_column() {
        assert_eq!(release_year("Star Fox (1993)", ""), Some(1993));
        assert_eq!(release_year("Star Fox", "(1993) SNES"), Some(1993));
        assert_eq!(release_year("Star Fox (SNES)", "Released (93)"), None);
        // Non-ASCII digits match \d but do not parse
        assert_eq!(release_year("Star Fox (١٩٩٣)", ""), None);
    }

    #[test]
    fn identical_input_gives_identical_output() {
        let rules = ClassifierRules::default();
        let sheets = [sheet(
            "F-Zero",
            &[
                ["F-Zero GX (GameCube)", "", "", "", "", ""],
                ["Roland", "XV-5080", "Preset", "Lead", "", ""],
                ["Korg", "", "", "Pad", "", ""],
                ["", "", "", "x", "", ""],
            ],
        )];

        assert_eq!(build(&rules, &sheets), build(&rules, &sheets));
    }

    #[test]
    fn skipped_content_is_truncated() {
        let rules = ClassifierRules::default();
        let long = format!("SECTION {}", "x".repeat(200));
        let sheets = [sheet("Long", &[[long.as_str(), "", "", "", "", ""]])];

        let out = build(&rules, &sheets);

        assert_eq!(out.skipped[0].content.chars().count(), 100);
    }

    #[test]
    fn skip_report_groups_by_file() {
        let skipped = vec![
            SkippedRow {
                file: "b.csv".into(),
                row: 4,
                content: "SOURCES".into(),
                reason: SkipReason::SectionHeader,
            },
            SkippedRow {
                file: "a.csv".into(),
                row: 2,
                content: "Roland".into(),
                reason: SkipReason::BeforeFirstGame,
            },
        ];

        let report = render_skip_report(&skipped);

        assert!(report.starts_with("SKIPPED LINES REPORT\n"));
        assert!(report.contains("Total skipped lines: 2\n"));
        let a = report.find("File: a.csv").unwrap();
        let b = report.find("File: b.csv").unwrap();
        assert!(a < b);
        assert!(report.contains("  Row 2: Roland\n    Reason: precedes any game title\n"));
    }
}
