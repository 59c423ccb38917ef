//! Polish surface forms: noun declension by lexicon lookup.
//!
//! Pipeline: base form → [override?] → [lexicon lookup] → fallback.
//!
//! Polish inflection is lexical, not rule-derivable; the module consults a
//! [`NounLexicon`] keyed by `(lemma, gender, number:case)`. The embedded
//! lexicon covers a small working set and exists so the pipeline is fully
//! exercised; a dictionary-backed implementation plugs in through the same
//! trait.

use crate::linguistics::{check_override, SurfaceForm};
use crate::model::meta::{get_str, MetaMap};

pub const VALID_CASES: &[&str] = &["nom", "gen", "dat", "acc", "inst", "loc", "voc"];
pub const VALID_NUMBERS: &[&str] = &["sg", "pl"];
pub const VALID_GENDERS: &[&str] = &["m1", "m2", "m3", "f", "n"];

/// Declension lookup: `(lemma, gender, "number:case")` → surface form.
pub trait NounLexicon {
    fn lookup(&self, lemma: &str, gender: &str, key: &str) -> Option<String>;
    /// Distinct genders recorded for a lemma (for gender inference).
    fn genders(&self, lemma: &str) -> Vec<String>;

    fn lookup_any_gender(&self, lemma: &str, key: &str) -> Option<String> {
        self.genders(lemma)
            .iter()
            .find_map(|gender| self.lookup(lemma, gender, key))
    }
}

/// Embedded working-set lexicon: (lemma, gender, key, form).
struct EmbeddedLexicon;

const EMBEDDED_FORMS: &[(&str, &str, &str, &str)] = &[
    ("algorytm", "m3", "sg:gen", "algorytmu"),
    ("algorytm", "m3", "sg:dat", "algorytmowi"),
    ("algorytm", "m3", "sg:acc", "algorytm"),
    ("algorytm", "m3", "sg:inst", "algorytmem"),
    ("algorytm", "m3", "sg:loc", "algorytmie"),
    ("algorytm", "m3", "pl:nom", "algorytmy"),
    ("algorytm", "m3", "pl:gen", "algorytmów"),
    ("książka", "f", "sg:gen", "książki"),
    ("książka", "f", "sg:dat", "książce"),
    ("książka", "f", "sg:acc", "książkę"),
    ("książka", "f", "sg:inst", "książką"),
    ("książka", "f", "sg:loc", "książce"),
    ("książka", "f", "pl:nom", "książki"),
    ("książka", "f", "pl:gen", "książek"),
    ("czas", "m3", "sg:gen", "czasu"),
    ("czas", "m3", "sg:inst", "czasem"),
    ("czas", "m3", "sg:loc", "czasie"),
    ("czas", "m3", "pl:nom", "czasy"),
    ("dom", "m3", "sg:gen", "domu"),
    ("dom", "m3", "sg:loc", "domu"),
    ("dom", "m3", "pl:nom", "domy"),
    ("kot", "m2", "sg:gen", "kota"),
    ("kot", "m2", "sg:dat", "kotu"),
    ("kot", "m2", "sg:acc", "kota"),
    ("kot", "m2", "pl:nom", "koty"),
    ("okno", "n", "sg:gen", "okna"),
    ("okno", "n", "sg:loc", "oknie"),
    ("okno", "n", "pl:nom", "okna"),
    ("prawda", "f", "sg:gen", "prawdy"),
    ("prawda", "f", "sg:acc", "prawdę"),
    ("prawda", "f", "sg:loc", "prawdzie"),
    ("słowo", "n", "sg:gen", "słowa"),
    ("słowo", "n", "pl:nom", "słowa"),
    ("słowo", "n", "pl:gen", "słów"),
];

impl NounLexicon for EmbeddedLexicon {
    fn lookup(&self, lemma: &str, gender: &str, key: &str) -> Option<String> {
        EMBEDDED_FORMS
            .iter()
            .find(|(entry_lemma, entry_gender, entry_key, _)| {
                *entry_lemma == lemma && *entry_gender == gender && *entry_key == key
            })
            .map(|(_, _, _, form)| (*form).to_string())
    }

    fn genders(&self, lemma: &str) -> Vec<String> {
        let mut genders: Vec<String> = EMBEDDED_FORMS
            .iter()
            .filter(|(entry_lemma, _, _, _)| *entry_lemma == lemma)
            .map(|(_, gender, _, _)| (*gender).to_string())
            .collect();
        genders.sort();
        genders.dedup();
        genders
    }
}

/// Generates the Polish surface form using the embedded lexicon.
pub fn surface_form(base_form: &str, features: &MetaMap, properties: &MetaMap) -> SurfaceForm {
    surface_form_with(&EmbeddedLexicon, base_form, features, properties)
}

/// Generates the Polish surface form against a caller-supplied lexicon.
pub fn surface_form_with(
    lexicon: &dyn NounLexicon,
    base_form: &str,
    features: &MetaMap,
    properties: &MetaMap,
) -> SurfaceForm {
    if features.is_empty() {
        return SurfaceForm::plain(base_form, "no features; base form kept");
    }

    let number = get_str(features, "number").unwrap_or("sg");
    let case = get_str(features, "case").unwrap_or("nom");

    if !VALID_CASES.contains(&case) {
        return SurfaceForm {
            text: base_form.to_string(),
            explanation: "base form kept".to_string(),
            warnings: vec![format!("invalid case `{case}`")],
        };
    }
    if !VALID_NUMBERS.contains(&number) {
        return SurfaceForm {
            text: base_form.to_string(),
            explanation: "base form kept".to_string(),
            warnings: vec![format!("invalid number `{number}`")],
        };
    }

    if number == "sg" && case == "nom" {
        return SurfaceForm::plain(base_form, "nominative singular is the base form");
    }

    let key = format!("{number}:{case}");
    if let Some(form) = check_override(properties, &key) {
        return SurfaceForm::plain(form.clone(), format!("override `{key}` → {form}"));
    }
    if number == "sg" {
        if let Some(form) = check_override(properties, case) {
            return SurfaceForm::plain(form.clone(), format!("override `{case}` → {form}"));
        }
    }

    let mut warnings = Vec::new();
    let gender = match get_str(properties, "gender") {
        Some(gender) if VALID_GENDERS.contains(&gender) => Some(gender.to_string()),
        Some(gender) => {
            warnings.push(format!("invalid gender `{gender}` ignored"));
            None
        }
        None => None,
    };
    let gender = gender.or_else(|| {
        let inferred = lexicon.genders(base_form);
        if inferred.len() == 1 {
            inferred.into_iter().next()
        } else {
            None
        }
    });

    let found = match &gender {
        Some(gender) => lexicon.lookup(base_form, gender, &key),
        None => lexicon.lookup_any_gender(base_form, &key),
    };

    match found {
        Some(form) => SurfaceForm {
            text: form.clone(),
            explanation: match gender {
                Some(gender) => format!("lexicon `{base_form}` ({gender}) {key} → {form}"),
                None => format!("lexicon `{base_form}` {key} → {form}"),
            },
            warnings,
        },
        None => {
            warnings.push(format!("no declension for `{base_form}` {key}; base form kept"));
            SurfaceForm {
                text: base_form.to_string(),
                explanation: "lexicon miss; base form kept".to_string(),
                warnings,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::surface_form;
    use crate::model::meta::{MetaMap, MetaValue};

    fn features(pairs: &[(&str, &str)]) -> MetaMap {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), MetaValue::from(*value)))
            .collect()
    }

    #[test]
    fn nominative_singular_is_base_form() {
        let result = surface_form("algorytm", &features(&[("case", "nom")]), &MetaMap::new());
        assert_eq!(result.text, "algorytm");
    }

    #[test]
    fn lexicon_declension_with_inferred_gender() {
        let result = surface_form("algorytm", &features(&[("case", "gen")]), &MetaMap::new());
        assert_eq!(result.text, "algorytmu");
        assert!(result.warnings.is_empty());

        let plural = surface_form(
            "książka",
            &features(&[("number", "pl"), ("case", "nom")]),
            &MetaMap::new(),
        );
        assert_eq!(plural.text, "książki");
    }

    #[test]
    fn explicit_gender_narrows_lookup() {
        let mut properties = MetaMap::new();
        properties.insert("gender".into(), MetaValue::from("m2"));
        let result = surface_form("kot", &features(&[("case", "gen")]), &properties);
        assert_eq!(result.text, "kota");
    }

    #[test]
    fn override_wins_over_lexicon() {
        let mut override_map = MetaMap::new();
        override_map.insert("sg:gen".into(), MetaValue::from("CZASU"));
        let mut properties = MetaMap::new();
        properties.insert("declension_override".into(), MetaValue::Map(override_map));

        let result = surface_form("czas", &features(&[("case", "gen")]), &properties);
        assert_eq!(result.text, "CZASU");
    }

    #[test]
    fn lexicon_miss_falls_back_with_warning() {
        let result = surface_form("zamek", &features(&[("case", "gen")]), &MetaMap::new());
        assert_eq!(result.text, "zamek");
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn invalid_case_and_number_warn() {
        let result = surface_form("czas", &features(&[("case", "ergative")]), &MetaMap::new());
        assert_eq!(result.text, "czas");
        assert!(!result.warnings.is_empty());

        let result = surface_form(
            "czas",
            &features(&[("number", "dual"), ("case", "gen")]),
            &MetaMap::new(),
        );
        assert_eq!(result.text, "czas");
        assert!(!result.warnings.is_empty());
    }
}
