//! Character label vocabulary of the plate character model.
//!
//! The character model emits Latin transliterations (`KA`, `BA`, `7`, ...).
//! Display uses the Devanagari glyph for each label. Labels missing from the
//! table are shown as-is.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Labels denoting the Bagmati province (full name or abbreviation)
pub const REGIONAL_MARKERS: [&str; 2] = ["Bagmati", "BA"];

static NEPALI_LABELS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("0", "०"),
        ("1", "१"),
        ("2", "२"),
        ("3", "३"),
        ("4", "४"),
        ("5", "५"),
        ("6", "६"),
        ("7", "७"),
        ("8", "८"),
        ("9", "९"),
        ("Bagmati", "बागमती"),
        ("CHA", "च"),
        ("JA", "ज"),
        ("KA", "क"),
        ("KHA", "ख"),
        ("Pradesh", "प्रदेश"),
        ("JHA", "झ"),
        ("p", "प"),
        ("PRA", "प्र"),
        ("SA", "स"),
        ("YA", "य"),
        ("BA", "बा"),
    ])
});

/// Nepali glyph for a label, or the label itself when it has no mapping
pub fn translate(label: &str) -> &str {
    NEPALI_LABELS.get(label).copied().unwrap_or(label)
}

pub fn is_regional_marker(label: &str) -> bool {
    REGIONAL_MARKERS.contains(&label)
}

/// True if any of the labels is a regional marker
pub fn contains_regional_marker<'a, I>(labels: I) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    labels.into_iter().any(is_regional_marker)
}
