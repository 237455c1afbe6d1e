//! Grammar for period codes, course codes, and room locations.
//!
//! A full period code looks like `L5-BCSE301P-LO-AB1-205B-ALL`: a slot
//! label, the course code, a session marker, a block code, a room
//! number, and an optional trailing audience tag, all hyphen-joined.

use regex::Regex;
use std::sync::OnceLock;

/// Full period-code shape. Matched anywhere in the cleaned text since
/// OCR tends to attach stray characters at either end.
const PERIOD_PATTERN: &str =
    r"[A-Z]{1,2}\d+-[A-Z]{4}\d{3}[A-Z]?-[A-Z]{2,3}-[A-Z]+\d+-\d{3}[A-Z]?-?[A-Z]*";

/// Course code: 4-letter subject prefix, 3 digits, optional L/E/P
/// suffix. This is the join key into the course-name table.
const COURSE_CODE_PATTERN: &str = r"[A-Z]{4}\d{3}[LEP]?";

/// Bare 4+3 course code, without any suffix.
const BASE_CODE_PATTERN: &str = r"^[A-Z]{4}\d{3}";

/// Block-plus-room location captured just before the trailing audience
/// tag, e.g. `AB1-205B` out of `...-AB1-205B-ALL`.
const LOCATION_PATTERN: &str = r"([A-Z]+\d+-\d{3}[A-Z]?)-[A-Z]*$";

/// Fallback pieces when the combined location shape is garbled.
const ROOM_PATTERN: &str = r"\b(\d{3}[A-Z]?)\b";
const BLOCK_PATTERN: &str = r"\b([A-Z]{2}\d+)\b";

fn period_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PERIOD_PATTERN).expect("period pattern compiles"))
}

fn course_code_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(COURSE_CODE_PATTERN).expect("course code pattern compiles"))
}

fn base_code_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(BASE_CODE_PATTERN).expect("base code pattern compiles"))
}

fn location_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(LOCATION_PATTERN).expect("location pattern compiles"))
}

fn room_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(ROOM_PATTERN).expect("room pattern compiles"))
}

fn block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(BLOCK_PATTERN).expect("block pattern compiles"))
}

/// Strips OCR artifacts from cell text: newlines, slashes, pipes,
/// quotes, backticks, parentheses, and all whitespace.
pub fn normalize_text(text: &str) -> String {
    text.chars()
        .filter(|c| {
            !c.is_whitespace() && !matches!(c, '/' | '|' | '\u{2018}' | '\u{2019}' | '`' | '(' | ')')
        })
        .collect()
}

/// Whether cleaned cell text contains a full period code.
pub fn is_period_code(text: &str) -> bool {
    period_regex().is_match(text)
}

/// Extracts the canonical course code, suffix included if present.
pub fn extract_course_code(text: &str) -> Option<String> {
    course_code_regex().find(text).map(|m| m.as_str().to_string())
}

/// The bare 4+3 code underneath a possibly-suffixed course code.
pub fn base_course_code(code: &str) -> Option<&str> {
    base_code_regex().find(code).map(|m| m.as_str())
}

/// Extracts the room location from a period code.
///
/// The combined block-room shape right before the trailing tag is
/// preferred; failing that, a bare room number is prefixed with a
/// separately-matched block token. `"Unknown"` when neither is found.
pub fn extract_location(text: &str) -> String {
    if let Some(caps) = location_regex().captures(text) {
        return caps[1].to_string();
    }

    if let Some(room) = room_regex().captures(text) {
        let room = room[1].to_string();
        if let Some(block) = block_regex().captures(text) {
            return format!("{}-{}", &block[1], room);
        }
        return room;
    }

    "Unknown".to_string()
}
