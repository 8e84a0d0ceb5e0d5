use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use pinyin::ToPinyin;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").unwrap());
static NOT_MATCHABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9A-Za-z\x{4e00}-\x{9fff}]").unwrap());

pub const FALLBACK_SLUG: &str = "sweet";

/// Profile-text keys and the sweet column they fill.
const FIELD_MAP: [(&str, SweetField); 12] = [
    ("環境", SweetField::Environment),
    ("類型", SweetField::ServiceType),
    ("長鍾", SweetField::LongDuration),
    ("長鐘", SweetField::LongDuration),
    ("短鍾", SweetField::ShortDuration),
    ("短鐘", SweetField::ShortDuration),
    ("定點長鐘", SweetField::LongPrice),
    ("定點長鍾", SweetField::LongPrice),
    ("長鐘費用", SweetField::LongPrice),
    ("定點短鐘", SweetField::ShortPrice),
    ("定點短鍾", SweetField::ShortPrice),
    ("短鐘費用", SweetField::ShortPrice),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SweetField {
    Environment,
    ServiceType,
    LongDuration,
    ShortDuration,
    LongPrice,
    ShortPrice,
}

/// One profile block parsed from a location's text files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileEntry {
    pub name: String,
    pub fields: BTreeMap<SweetField, String>,
    /// `key: value` lines whose key is not a known field.
    pub extra: BTreeMap<String, String>,
    /// Every line after the name, as written.
    pub description: String,
}

impl ProfileEntry {
    pub fn field(&self, field: SweetField) -> &str {
        self.fields.get(&field).map(String::as_str).unwrap_or_default()
    }

    pub fn int_field(&self, field: SweetField) -> Option<i64> {
        parse_int(self.field(field))
    }
}

/// Split profile text into blocks separated by blank lines. The first line of
/// a block is the name; following `key: value` lines fill the fields.
pub fn parse_entries(text: &str) -> Vec<ProfileEntry> {
    let normalized = text.replace("\r\n", "\n").replace('：', ":");
    normalized
        .split("\n\n")
        .filter_map(|block| {
            let lines: Vec<&str> = block
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect();
            let (name, rest) = lines.split_first()?;

            let mut entry = ProfileEntry {
                name: name.to_string(),
                description: rest.join("\n"),
                ..Default::default()
            };
            for line in rest {
                let Some((key, value)) = line.split_once(':') else {
                    continue;
                };
                let (key, value) = (key.trim(), value.trim().to_string());
                match FIELD_MAP.iter().find(|(known, _)| *known == key) {
                    Some((_, field)) => {
                        entry.fields.insert(*field, value);
                    }
                    None => {
                        entry.extra.insert(key.to_string(), value);
                    }
                }
            }
            Some(entry)
        })
        .collect()
}

/// First run of ASCII digits in `value`.
pub fn parse_int(value: &str) -> Option<i64> {
    DIGITS
        .find(value)
        .and_then(|m| m.as_str().parse::<i64>().ok())
}

/// NFKC-normalized, lower-cased text keeping only ASCII alphanumerics and
/// CJK ideographs. Used to compare names with file names and OCR output.
pub fn normalize_text(value: &str) -> String {
    let normalized: String = value.nfkc().collect();
    NOT_MATCHABLE.replace_all(&normalized, "").to_lowercase()
}

/// ASCII file-system name for a profile or location: pinyin for Han
/// characters, ASCII alphanumerics kept, everything else dropped.
pub fn safe_slug(name: &str) -> String {
    let normalized: String = name.nfkc().collect();
    let mut slug = String::new();
    for ch in normalized.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if let Some(syllable) = ch.to_pinyin() {
            slug.push_str(syllable.plain());
        }
    }
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}
