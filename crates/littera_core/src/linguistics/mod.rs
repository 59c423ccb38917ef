//! Surface-form generation: a narrow, deterministic contract.
//!
//! # Responsibility
//! - Dispatch `(base form, mention features, entity properties, language)`
//!   to the registered language module.
//! - Return the surface text with an explanation trail and warnings.
//!
//! # Invariants
//! - Implementations are deterministic; probabilistic guesses are not
//!   allowed.
//! - Generated forms are never stored as canonical data.
//! - An unregistered language falls back to the base form with a warning.

use crate::model::meta::MetaMap;

pub mod en;
pub mod pl;

/// Result of one surface-form generation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SurfaceForm {
    pub text: String,
    /// Human-readable trail of the rules applied.
    pub explanation: String,
    pub warnings: Vec<String>,
}

impl SurfaceForm {
    pub fn plain(text: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            explanation: explanation.into(),
            warnings: Vec::new(),
        }
    }
}

type SurfaceFn = fn(&str, &MetaMap, &MetaMap) -> SurfaceForm;

const REGISTRY: &[(&str, SurfaceFn)] = &[("en", en::surface_form), ("pl", pl::surface_form)];

/// Languages with a registered surface-form implementation.
pub fn supported_languages() -> Vec<&'static str> {
    REGISTRY.iter().map(|(language, _)| *language).collect()
}

/// Dispatches to the language module registered for `language`.
pub fn surface_form(
    language: &str,
    base_form: &str,
    features: &MetaMap,
    properties: &MetaMap,
) -> SurfaceForm {
    match REGISTRY.iter().find(|(tag, _)| *tag == language) {
        Some((_, generate)) => generate(base_form, features, properties),
        None => SurfaceForm {
            text: base_form.to_string(),
            explanation: format!("no morphology module for `{language}`; base form kept"),
            warnings: vec![format!("language `{language}` is not supported")],
        },
    }
}

/// Shared helper: reads the `declension_override` property for a form key.
///
/// The override bag maps form keys (`pl`, `sg:gen`, `past`, ...) directly
/// to surface text; it always wins over rule-based generation.
pub(crate) fn check_override(properties: &MetaMap, key: &str) -> Option<String> {
    let override_map = properties.get("declension_override")?.as_map()?;
    override_map
        .get(key)
        .and_then(|value| value.as_str())
        .map(|text| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::{supported_languages, surface_form};
    use crate::model::meta::MetaMap;

    #[test]
    fn unknown_language_keeps_base_form_with_warning() {
        let result = surface_form("grc", "logos", &MetaMap::new(), &MetaMap::new());
        assert_eq!(result.text, "logos");
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn english_and_polish_are_registered() {
        let languages = supported_languages();
        assert!(languages.contains(&"en"));
        assert!(languages.contains(&"pl"));
    }

    #[test]
    fn dispatch_is_deterministic() {
        let mut features = MetaMap::new();
        features.insert("number".into(), "pl".into());
        let first = surface_form("en", "book", &features, &MetaMap::new());
        let second = surface_form("en", "book", &features, &MetaMap::new());
        assert_eq!(first, second);
    }
}
