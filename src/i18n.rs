use std::collections::HashMap;

use fluent_templates::{
    fluent_bundle::{FluentArgs, FluentValue},
    static_loader, Loader,
};
use once_cell::sync::Lazy;
use unic_langid::LanguageIdentifier;

static_loader! {
    static LOCALES = {
        locales: "./locales",
        fallback_language: "en",
    };
}

/// Supported languages (code, human-readable name).
pub static SUPPORTED_LANGS: &[(&str, &str)] = &[("en", "English"), ("uk", "Українська")];

/// Default language identifier used as a fallback.
static DEFAULT_LANG: Lazy<LanguageIdentifier> = Lazy::new(|| "en".parse().unwrap());

/// Normalizes a language code into a LanguageIdentifier (falls back to default).
pub fn lang_from_code(code: &str) -> LanguageIdentifier {
    let normalized = code.split('-').next().unwrap_or(code).to_lowercase();
    if SUPPORTED_LANGS.iter().any(|(c, _)| *c == normalized) {
        normalized.parse().unwrap_or_else(|_| DEFAULT_LANG.clone())
    } else {
        DEFAULT_LANG.clone()
    }
}

/// Resolves the language for an inbound update from its Telegram locale hint.
pub fn lang_from_update(language_code: Option<&str>) -> LanguageIdentifier {
    language_code.map(lang_from_code).unwrap_or_else(|| DEFAULT_LANG.clone())
}

/// Returns a localized string for the given key.
pub fn t(lang: &LanguageIdentifier, key: &str) -> String {
    LOCALES
        .lookup(lang, key)
        .unwrap_or_else(|| LOCALES.lookup(&DEFAULT_LANG, key).unwrap_or_else(|| key.to_string()))
}

/// Returns a localized string with arguments for interpolation.
pub fn t_args(lang: &LanguageIdentifier, key: &str, args: &FluentArgs) -> String {
    let args_map: HashMap<String, FluentValue> = args.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();

    LOCALES.lookup_with_args(lang, key, &args_map).unwrap_or_else(|| {
        LOCALES
            .lookup_with_args(&DEFAULT_LANG, key, &args_map)
            .unwrap_or_else(|| key.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_known_translation() {
        let en = lang_from_code("en");
        let uk = lang_from_code("uk");

        assert!(!t(&en, "query.search_term").is_empty());
        assert_ne!(t(&en, "query.search_term"), t(&uk, "query.search_term"));
    }

    #[test]
    fn unknown_key_echoes_key() {
        let en = lang_from_code("en");
        assert_eq!(t(&en, "no.such_key"), "no.such_key");
    }

    #[test]
    fn normalizes_regional_variants() {
        assert_eq!(lang_from_code("en-US"), lang_from_code("en"));
        assert_eq!(lang_from_code("uk-UA"), lang_from_code("uk"));
        // unsupported falls back
        assert_eq!(lang_from_code("ja"), lang_from_code("en"));
    }

    #[test]
    fn interpolates_args() {
        let en = lang_from_code("en");
        let mut args = FluentArgs::new();
        args.set("term", "john_doe");
        let text = t_args(&en, "keyboard.remove", &args);
        assert!(text.contains("john_doe"));
    }
}
