//! Address field parsing for carrier payloads
//!
//! The carrier wants phone numbers split into country/area/local parts and
//! street addresses split into number and name. Inputs come from people
//! typing into spreadsheets, so parsing is lenient: when a value cannot be
//! split, a placeholder is substituted and the result is marked so callers
//! can surface a warning instead of shipping silently wrong data.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::warn;

/// Area code used when a 7-digit local number has none
pub const DEFAULT_AREA_CODE: &str = "416";
/// Local number used when the input cannot be parsed at all
pub const FALLBACK_LOCAL_NUMBER: &str = "1234567";
/// Street number used when the input carries none
pub const FALLBACK_STREET_NUMBER: &str = "123";
/// Street name used when the input is empty
pub const FALLBACK_STREET_NAME: &str = "Main St";

/// Unit/number with optional letter suffix and optional range, then the name.
/// "123 Main St", "123A Main St", "123-125 Main St", "12 – 14 King St W"
static STREET_WITH_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+[A-Za-z]?)(?:\s*[-–]\s*\d+[A-Za-z]?)?\s+(.+)$").expect("valid street regex")
});

/// Number glued to the name: "123Main St"
static STREET_GLUED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\s*(.+)$").expect("valid street regex"));

static CANADIAN_POSTAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]\d[A-Z]\d[A-Z]\d$").expect("valid postal regex"));

static US_ZIP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{5}(-\d{4})?$").expect("valid zip regex"));

/// How much of a parsed value came from the input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseQuality {
    /// Every part was taken from the input
    Exact,
    /// Part of the value was filled with a default (e.g. missing area code)
    Defaulted,
    /// The input was unusable and a placeholder was substituted
    Placeholder,
}

/// Phone number split the way the carrier expects it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneNumber {
    pub country_code: String,
    pub area_code: String,
    pub phone: String,
    pub quality: ParseQuality,
}

impl PhoneNumber {
    fn new(area_code: &str, phone: &str, quality: ParseQuality) -> Self {
        PhoneNumber {
            country_code: "1".to_string(),
            area_code: area_code.to_string(),
            phone: phone.to_string(),
            quality,
        }
    }
}

/// Street address split into civic number and street name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreetAddress {
    pub number: String,
    pub name: String,
    pub quality: ParseQuality,
}

impl StreetAddress {
    fn new(number: &str, name: &str, quality: ParseQuality) -> Self {
        StreetAddress {
            number: number.to_string(),
            name: name.to_string(),
            quality,
        }
    }
}

/// Parse a North American phone number.
///
/// Non-digits are stripped first. 10 digits split 3/7, 11 digits with a
/// leading 1 drop the 1, 7 digits get the default area code. Anything else
/// yields the fallback number.
pub fn parse_phone_number(input: &str) -> PhoneNumber {
    let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();

    match digits.len() {
        10 => PhoneNumber::new(&digits[..3], &digits[3..], ParseQuality::Exact),
        11 if digits.starts_with('1') => {
            PhoneNumber::new(&digits[1..4], &digits[4..], ParseQuality::Exact)
        }
        7 => PhoneNumber::new(DEFAULT_AREA_CODE, &digits, ParseQuality::Defaulted),
        _ => {
            if !input.trim().is_empty() {
                warn!(phone = %input, "Unparseable phone number, substituting placeholder");
            }
            PhoneNumber::new(DEFAULT_AREA_CODE, FALLBACK_LOCAL_NUMBER, ParseQuality::Placeholder)
        }
    }
}

/// Split a street line into civic number and street name.
///
/// A range like "123-125" keeps only the first number. When the first token
/// carries digits but doesn't fit the patterns ("#5 Main St"), the line is
/// split on the first whitespace. A line without any leading number gets the
/// placeholder number and keeps the whole line as the name.
pub fn parse_street_address(input: &str) -> StreetAddress {
    let line = input.trim();
    if line.is_empty() {
        return StreetAddress::new(
            FALLBACK_STREET_NUMBER,
            FALLBACK_STREET_NAME,
            ParseQuality::Placeholder,
        );
    }

    if let Some(caps) = STREET_WITH_NUMBER.captures(line) {
        return StreetAddress::new(&caps[1], caps[2].trim(), ParseQuality::Exact);
    }

    if let Some(caps) = STREET_GLUED.captures(line) {
        return StreetAddress::new(&caps[1], caps[2].trim(), ParseQuality::Exact);
    }

    if let Some((first, rest)) = line.split_once(char::is_whitespace) {
        if first.chars().any(|c| c.is_ascii_digit()) {
            return StreetAddress::new(first, rest.trim(), ParseQuality::Exact);
        }
    }

    warn!(street = %line, "Street has no civic number, substituting placeholder");
    StreetAddress::new(FALLBACK_STREET_NUMBER, line, ParseQuality::Placeholder)
}

/// Normalise a postal code: uppercase, no spaces, and the canonical
/// "A1A 1A1" spacing for Canadian codes. Other shapes are returned compacted.
pub fn format_postal_code(input: &str) -> String {
    let compact = compact_postal(input);
    if CANADIAN_POSTAL.is_match(&compact) {
        format!("{} {}", &compact[..3], &compact[3..])
    } else {
        compact
    }
}

/// Uppercased ISO country code, "CA" when blank
pub fn normalize_country(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        "CA".to_string()
    } else {
        trimmed.to_uppercase()
    }
}

/// Country-aware postal code check. Unknown countries are accepted.
pub fn is_valid_postal_code(postal: &str, country: &str) -> bool {
    let compact = compact_postal(postal);
    if compact.is_empty() {
        return false;
    }

    match country.trim().to_uppercase().as_str() {
        "CA" => CANADIAN_POSTAL.is_match(&compact),
        "US" => US_ZIP.is_match(&compact),
        _ => true,
    }
}

fn compact_postal(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}
