use serde::{Deserialize, Serialize};

use crate::ports::sheets::SheetRow;

/// Spreadsheet column names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub primary: String,
    pub product: String,
    pub bank: String,
    pub program: String,
    pub notes: String,
    pub examples: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            primary: "Company/Manufacturer".to_string(),
            product: "Product".to_string(),
            bank: "Path/Bank".to_string(),
            program: "Program".to_string(),
            notes: "Notes".to_string(),
            examples: "Examples".to_string(),
        }
    }
}

/// Heuristics that tell game-title rows from sound-source rows.
/// Lengths are counted in characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierRules {
    /// Matched case-insensitively against the primary column
    pub section_markers: Vec<String>,
    pub title_indicators: Vec<String>,
    /// A product cell containing this (case-insensitive) holds a release date
    pub release_marker: String,
    pub min_title_len: usize,
    pub long_title_len: usize,
    pub min_title_len_with_aux: usize,
    pub aux_filled_min_len: usize,
    pub min_name_len: usize,
    /// Stripped from CSV file stems to get the tag name
    pub file_prefix: String,
    pub columns: ColumnNames,
}

impl Default for ClassifierRules {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            section_markers: strings(&[
                "STUFF TO FIND",
                "SOURCES",
                "NOTES",
                "DESCRIPTION",
                "TABLE OF CONTENTS",
                "JUMP TO:",
                "SECTION",
                "BASE GAME",
                "PLEASE REMEMBER",
                "(CLICK",
            ]),
            title_indicators: strings(&[
                ":",
                "(",
                "HD",
                "Remaster",
                "Remake",
                "Edition",
                "Wii",
                "PlayStation",
                "Xbox",
                "Nintendo",
                "PC",
                "Switch",
                "3DS",
                "GameCube",
                "Arcade",
                "SNES",
                "N64",
                "★",
            ]),
            release_marker: "(Released:".to_string(),
            min_title_len: 10,
            long_title_len: 20,
            min_title_len_with_aux: 15,
            aux_filled_min_len: 5,
            min_name_len: 2,
            file_prefix: "NEWER VGM Sound Sources - ".to_string(),
            columns: ColumnNames::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowClass {
    Blank,
    SectionHeader,
    GameTitle,
    /// Anything else; becomes a sound source if it resolves
    Entry,
}

/// The known columns of a row, trimmed
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    pub primary: &'a str,
    pub product: &'a str,
    pub bank: &'a str,
    pub program: &'a str,
    pub notes: &'a str,
    pub examples: &'a str,
}

/// Tag name for a file stem: the stem without `prefix`, or the whole stem
/// when nothing else is left
pub fn tag_name(stem: &str, prefix: &str) -> String {
    let stripped = if prefix.is_empty() {
        stem.to_string()
    } else {
        stem.replace(prefix, "")
    };
    let stripped = stripped.trim();
    if stripped.is_empty() {
        stem.to_string()
    } else {
        stripped.to_string()
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

impl ClassifierRules {
    pub fn view<'a>(&self, row: &'a SheetRow) -> RowView<'a> {
        let c = &self.columns;
        RowView {
            primary: row.get(&c.primary),
            product: row.get(&c.product),
            bank: row.get(&c.bank),
            program: row.get(&c.program),
            notes: row.get(&c.notes),
            examples: row.get(&c.examples),
        }
    }

    pub fn is_section_header(&self, primary: &str) -> bool {
        let upper = primary.to_uppercase();
        self.section_markers
            .iter()
            .any(|marker| upper.contains(&marker.to_uppercase()))
    }

    fn has_release_date(&self, product: &str) -> bool {
        !product.is_empty()
            && product
                .to_lowercase()
                .contains(&self.release_marker.to_lowercase())
    }

    pub fn classify(&self, row: &SheetRow) -> RowClass {
        if row.is_blank() {
            return RowClass::Blank;
        }
        let view = self.view(row);
        let class = self.classify_view(&view);
        log::trace!(
            "Row {} classified as {:?}: {:?}",
            row.line,
            class,
            view.primary
        );
        class
    }

    pub fn classify_view(&self, row: &RowView) -> RowClass {
        if row.primary.is_empty() {
            return RowClass::Entry;
        }
        if self.is_section_header(row.primary) {
            return RowClass::SectionHeader;
        }
        if self.is_game_title(row) {
            RowClass::GameTitle
        } else {
            RowClass::Entry
        }
    }

    fn is_game_title(&self, row: &RowView) -> bool {
        let len = char_len(row.primary);
        if len < self.min_title_len {
            return false;
        }

        let release_date = self.has_release_date(row.product);
        let aux_empty = (row.product.is_empty() || release_date)
            && row.bank.is_empty()
            && row.program.is_empty();

        if aux_empty {
            if self
                .title_indicators
                .iter()
                .any(|indicator| row.primary.contains(indicator.as_str()))
            {
                return true;
            }
            if len >= self.long_title_len {
                return true;
            }
        }

        // A release date in the product cell means none of the others count
        let aux_filled = if release_date {
            0
        } else {
            [row.product, row.bank, row.program]
                .iter()
                .filter(|cell| char_len(cell) > self.aux_filled_min_len)
                .count()
        };
        aux_filled <= 1 && len >= self.min_title_len_with_aux
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[(&str, &str)]) -> SheetRow {
        SheetRow::new(
            2,
            cells
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn title_row(primary: &str) -> SheetRow {
        row(&[("Company/Manufacturer", primary)])
    }

    #[test]
    fn title_with_indicator() {
        let rules = ClassifierRules::default();
        assert_eq!(
            rules.classify(&title_row("Super Mario Bros.: Special Edition (1988)")),
            RowClass::GameTitle
        );
        assert_eq!(
            rules.classify(&title_row("Zelda (SNES)")),
            RowClass::GameTitle
        );
    }

    #[test]
    fn short_primary_is_never_a_title() {
        let rules = ClassifierRules::default();
        assert_eq!(rules.classify(&title_row("Zelda: LA")), RowClass::Entry);
    }

    #[test]
    fn long_plain_text_is_a_title() {
        let rules = ClassifierRules::default();
        assert_eq!(
            rules.classify(&title_row("donkey kong country returns")),
            RowClass::GameTitle
        );
        // 10..20 chars, no indicator, aux empty, but under 15 either
        assert_eq!(rules.classify(&title_row("metroid prime")), RowClass::Entry);
    }

    #[test]
    fn release_date_product_counts_as_empty() {
        let rules = ClassifierRules::default();
        let r = row(&[
            ("Company/Manufacturer", "Metroid: Zero"),
            ("Product", "(Released: Feb 9, 2004)"),
        ]);
        assert_eq!(rules.classify(&r), RowClass::GameTitle);

        let r = row(&[
            ("Company/Manufacturer", "Metroid: Zero"),
            ("Product", "Nintendo R&D1"),
        ]);
        assert_eq!(rules.classify(&r), RowClass::Entry);
    }

    #[test]
    fn one_filled_aux_column_with_long_primary() {
        let rules = ClassifierRules::default();
        let r = row(&[
            ("Company/Manufacturer", "kirby star allies"),
            ("Product", "Composer credits"),
        ]);
        assert_eq!(rules.classify(&r), RowClass::GameTitle);
    }

    #[test]
    fn sound_source_rows_are_entries() {
        let rules = ClassifierRules::default();
        let r = row(&[
            ("Company/Manufacturer", "Roland"),
            ("Product", "JV-1080"),
            ("Path/Bank", "Preset A"),
            ("Program", "Pizz Strings"),
        ]);
        assert_eq!(rules.classify(&r), RowClass::Entry);

        let r = row(&[
            ("Company/Manufacturer", "Korg Incorporated"),
            ("Product", "Triton Classic"),
            ("Program", "Warm Pad"),
            ("Path/Bank", "Bank A/B"),
        ]);
        assert_eq!(rules.classify(&r), RowClass::Entry);
    }

    #[test]
    fn section_markers_are_case_insensitive() {
        let rules = ClassifierRules::default();
        assert_eq!(
            rules.classify(&title_row("Sound Sources for this game")),
            RowClass::SectionHeader
        );
        assert_eq!(
            rules.classify(&title_row("(Click here to jump)")),
            RowClass::SectionHeader
        );
    }

    #[test]
    fn blank_rows() {
        let rules = ClassifierRules::default();
        let r = row(&[("Company/Manufacturer", "  "), ("Product", "")]);
        assert_eq!(rules.classify(&r), RowClass::Blank);
        assert_eq!(rules.classify(&row(&[])), RowClass::Blank);
    }

    #[test]
    fn length_counts_characters() {
        let rules = ClassifierRules::default();
        // 9 characters, 27 bytes
        assert_eq!(rules.classify(&title_row("ゼルダの伝説ゼルダ")), RowClass::Entry);
        assert_eq!(
            rules.classify(&title_row("ゼルダの伝説 夢をみる島")),
            RowClass::Entry
        );
    }

    #[test]
    fn custom_rules() {
        let rules = ClassifierRules {
            min_title_len: 3,
            title_indicators: vec!["!".into()],
            ..ClassifierRules::default()
        };
        assert_eq!(rules.classify(&title_row("Wow!")), RowClass::GameTitle);
    }

    #[test]
    fn tag_name_from_stem() {
        let prefix = ClassifierRules::default().file_prefix;
        assert_eq!(
            tag_name("NEWER VGM Sound Sources - Zelda", &prefix),
            "Zelda"
        );
        assert_eq!(tag_name("Mario", &prefix), "Mario");
        assert_eq!(
            tag_name("NEWER VGM Sound Sources - ", &prefix),
            "NEWER VGM Sound Sources - "
        );
    }
}
