//! Immutable ISO 639-1 language table.
//!
//! Structured extraction asks the model to report the languages it saw in a
//! document. The model's answer is free text, so it is validated against
//! this fixed code→name mapping; values matching neither a code nor a name
//! are dropped. The table is a plain static — built once, read-only, no
//! dynamic type generation.

use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// ISO 639-1 two-letter code → English language name.
static LANGUAGES: Lazy<BTreeMap<&'static str, &'static str>> = Lazy::new(|| {
    TABLE.iter().copied().collect()
});

const TABLE: &[(&str, &str)] = &[
    ("ar", "Arabic"),
    ("bg", "Bulgarian"),
    ("bn", "Bengali"),
    ("ca", "Catalan"),
    ("cs", "Czech"),
    ("da", "Danish"),
    ("de", "German"),
    ("el", "Greek"),
    ("en", "English"),
    ("es", "Spanish"),
    ("et", "Estonian"),
    ("fa", "Persian"),
    ("fi", "Finnish"),
    ("fr", "French"),
    ("he", "Hebrew"),
    ("hi", "Hindi"),
    ("hr", "Croatian"),
    ("hu", "Hungarian"),
    ("id", "Indonesian"),
    ("it", "Italian"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("lt", "Lithuanian"),
    ("lv", "Latvian"),
    ("ms", "Malay"),
    ("nl", "Dutch"),
    ("no", "Norwegian"),
    ("pl", "Polish"),
    ("pt", "Portuguese"),
    ("ro", "Romanian"),
    ("ru", "Russian"),
    ("sk", "Slovak"),
    ("sl", "Slovenian"),
    ("sr", "Serbian"),
    ("sv", "Swedish"),
    ("sw", "Swahili"),
    ("ta", "Tamil"),
    ("te", "Telugu"),
    ("th", "Thai"),
    ("tr", "Turkish"),
    ("uk", "Ukrainian"),
    ("ur", "Urdu"),
    ("vi", "Vietnamese"),
    ("zh", "Chinese"),
];

/// Look up the English name of a language code.
pub fn name_for(code: &str) -> Option<&'static str> {
    LANGUAGES.get(code.to_ascii_lowercase().as_str()).copied()
}

/// True when the value is a known code or a known English name.
pub fn is_known(value: &str) -> bool {
    normalize(value).is_some()
}

/// Normalize a code or name to the canonical English name.
///
/// Accepts either spelling because models answer with whichever they
/// prefer: `"fr"` and `"French"` both normalize to `"French"`.
pub fn normalize(value: &str) -> Option<&'static str> {
    if let Some(name) = name_for(value) {
        return Some(name);
    }
    LANGUAGES
        .values()
        .copied()
        .find(|name| name.eq_ignore_ascii_case(value.trim()))
}

/// The full table, for callers that want to enumerate it.
pub fn all() -> impl Iterator<Item = (&'static str, &'static str)> {
    LANGUAGES.iter().map(|(&code, &name)| (code, name))
}
