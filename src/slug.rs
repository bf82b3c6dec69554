use std::sync::LazyLock;

use regex::Regex;
use unaccent::unaccent;

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").unwrap());
static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-\s]+").unwrap());

/// URL slug restricted to `[a-z0-9_-]`. Accented letters are folded to their
/// base letter, anything else without an ASCII form is dropped.
pub fn slugify_ascii(text: &str) -> String {
    let folded: String = unaccent(text).chars().filter(char::is_ascii).collect();
    let lowered = folded.to_lowercase();
    let cleaned = NON_WORD.replace_all(lowered.trim(), "");
    let dashed = SEPARATORS.replace_all(&cleaned, "-");
    dashed.trim_matches('-').to_string()
}

/// Base slug of a game tag. Names with no ASCII form fall back to `tag-{pk}`.
pub fn tag_slug_base(name: &str, pk: i64) -> String {
    let base = slugify_ascii(name);
    if base.is_empty() {
        format!("tag-{pk}")
    } else {
        base
    }
}

/// First of `base`, `base-2`, `base-3`, ... that is not `taken`
pub fn unique_slug(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    (2u64..)
        .map(|n| format!("{base}-{n}"))
        .find(|slug| !taken(slug))
        .unwrap_or_else(|| base.to_string())
}

/// Whether `slug` is `base` itself or one of its numbered variants
pub fn is_variant_of(slug: &str, base: &str) -> bool {
    if slug == base {
        return true;
    }
    slug.strip_prefix(base)
        .and_then(|rest| rest.strip_prefix('-'))
        .is_some_and(|n| {
            !n.is_empty()
                && !n.starts_with('0')
                && n.bytes().all(|b| b.is_ascii_digit())
                && n.parse::<u64>().is_ok_and(|n| n >= 2)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_accents() {
        assert_eq!(slugify_ascii("Pokémon Ruby"), "pokemon-ruby");
        assert_eq!(slugify_ascii("Señor Año"), "senor-ano");
    }

    #[test]
    fn strips_punctuation_and_collapses_separators() {
        assert_eq!(
            slugify_ascii("Super Mario Bros.: Special Edition (1988)"),
            "super-mario-bros-special-edition-1988"
        );
        assert_eq!(slugify_ascii("  a -- b  "), "a-b");
        assert_eq!(slugify_ascii("snake_case stays"), "snake_case-stays");
    }

    #[test]
    fn non_ascii_only_input_is_empty() {
        assert_eq!(slugify_ascii("★★★"), "");
        assert_eq!(slugify_ascii("ゼルダ"), "");
    }

    #[test]
    fn tag_base_falls_back_to_pk() {
        assert_eq!(tag_slug_base("Pokémon", 1), "pokemon");
        assert_eq!(tag_slug_base("★", 3), "tag-3");
    }

    #[test]
    fn unique_slug_appends_counter() {
        let taken = ["pokemon", "pokemon-2"];
        assert_eq!(unique_slug("pokemon", |s| taken.contains(&s)), "pokemon-3");
        assert_eq!(unique_slug("zelda", |s| taken.contains(&s)), "zelda");
    }

    #[test]
    fn numbered_variants() {
        assert!(is_variant_of("pokemon", "pokemon"));
        assert!(is_variant_of("pokemon-2", "pokemon"));
        assert!(is_variant_of("pokemon-12", "pokemon"));
        assert!(!is_variant_of("pokemon-1", "pokemon"));
        assert!(!is_variant_of("pokemon-02", "pokemon"));
        assert!(!is_variant_of("pokemon-ruby", "pokemon"));
        assert!(!is_variant_of("pokemonx", "pokemon"));
    }

    #[test]
    fn trims_edge_dashes() {
        assert_eq!(slugify_ascii("-Nintendo 64-"), "nintendo-64");
    }
}
