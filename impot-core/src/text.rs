use std::sync::LazyLock;

use regex::Regex;

static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("separator pattern is valid"));

fn fold_accent(c: char) -> char {
    match c {
        'à' | 'â' | 'ä' | 'á' => 'a',
        'ç' => 'c',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'î' | 'ï' | 'í' => 'i',
        'ô' | 'ö' | 'ó' => 'o',
        'ù' | 'û' | 'ü' | 'ú' => 'u',
        'ÿ' => 'y',
        other => other,
    }
}

/// Lowercases, folds French accents and collapses every run of
/// non-alphanumeric characters into a single `_`.
///
/// `"Nombre de parts"`, `"nombre-de-parts"` and `"NOMBRE_DE_PARTS "` all
/// normalise to `"nombre_de_parts"`.
pub(crate) fn normalize_key(raw: &str) -> String {
    let folded: String = raw.trim().to_lowercase().chars().map(fold_accent).collect();
    SEPARATORS
        .replace_all(&folded, "_")
        .trim_matches('_')
        .to_string()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn normalize_key_collapses_spaces_and_case() {
        assert_eq!(normalize_key("Nombre de parts"), "nombre_de_parts");
    }

    #[test]
    fn normalize_key_folds_accents() {
        assert_eq!(normalize_key("Bénéfice Net"), "benefice_net");
        assert_eq!(normalize_key("marié(e)"), "marie_e");
    }

    #[test]
    fn normalize_key_trims_separators() {
        assert_eq!(normalize_key("  --urssaf paid--  "), "urssaf_paid");
    }

    #[test]
    fn normalize_key_keeps_canonical_names() {
        assert_eq!(normalize_key("urssaf_declared_ca"), "urssaf_declared_ca");
    }
}
