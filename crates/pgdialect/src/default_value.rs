//! Decoding column defaults from their catalog text.
//!
//! `pg_get_expr(adbin, adrelid)` hands back defaults as SQL expressions:
//! `'foo'::character varying`, `(-1)`, `nextval('t_id_seq'::regclass)`.
//! Literal shapes are recognized by an ordered list of patterns, first match
//! wins. Anything that isn't a recognizable literal (function calls, user
//! types, casts we don't know) decodes to `None`.

use std::sync::LazyLock;

use pgdialect_schema::PortableValue;
use regex::{Captures, Regex};

/// The literal shapes the decoder understands, in match order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralShape {
    Numeric,
    Character,
    EscapeCharacter,
    Binary,
    DateTime,
    Interval,
    Boolean,
    Geometric,
    Network,
    BitString,
    Xml,
    Array,
    ObjectIdentifier,
}

struct Recognizer {
    shape: LiteralShape,
    pattern: Regex,
    extract: fn(&Captures<'_>) -> PortableValue,
}

impl Recognizer {
    fn new(
        shape: LiteralShape,
        pattern: &str,
        extract: fn(&Captures<'_>) -> PortableValue,
    ) -> Self {
        Self {
            shape,
            pattern: Regex::new(pattern).expect("valid literal pattern"),
            extract,
        }
    }
}

fn group(caps: &Captures<'_>, idx: usize) -> String {
    caps.get(idx)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

fn string_group(caps: &Captures<'_>) -> PortableValue {
    PortableValue::String(group(caps, 1))
}

/// Patterns with two alternatives capture the number in whichever matched.
fn either_number(caps: &Captures<'_>) -> PortableValue {
    let idx = if caps.get(1).is_some() { 1 } else { 2 };
    PortableValue::Number(group(caps, idx))
}

fn escaped_group(caps: &Captures<'_>) -> PortableValue {
    PortableValue::String(unescape_octal(caps.get(1).map_or("", |m| m.as_str())))
}

fn bool_group(caps: &Captures<'_>) -> PortableValue {
    let text = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
    PortableValue::Bool(text == "true")
}

static RECOGNIZERS: LazyLock<Vec<Recognizer>> = LazyLock::new(|| {
    use LiteralShape::*;
    vec![
        Recognizer::new(
            Numeric,
            r"\A\((-?\d+(?:\.\d*)?)\)\z|\A(-?\d+(?:\.\d*)?)\z",
            either_number,
        ),
        Recognizer::new(
            Character,
            r"(?s)\A'(.*)'::(?:character varying|bpchar|text)\z",
            string_group,
        ),
        Recognizer::new(
            EscapeCharacter,
            r"(?s)\AE'(.*)'::(?:character varying|bpchar|text)\z",
            escaped_group,
        ),
        Recognizer::new(Binary, r"(?s)\A'(.*)'::bytea\z", string_group),
        Recognizer::new(
            DateTime,
            r"\A'(.+)'::(?:time(?:stamp)? with(?:out)? time zone|date)\z",
            string_group,
        ),
        Recognizer::new(Interval, r"\A'(.*)'::interval\z", string_group),
        Recognizer::new(
            Boolean,
            r"\A(true|false)\z|\A'(true|false)'(?:::boolean)?\z",
            bool_group,
        ),
        Recognizer::new(
            Geometric,
            r#"\A'(.*)'::(?:point|line|lseg|box|"?path"?|polygon|circle)\z"#,
            string_group,
        ),
        Recognizer::new(Network, r"\A'(.*)'::(?:cidr|inet|macaddr)\z", string_group),
        Recognizer::new(
            BitString,
            r#"\AB'(.*)'::"?bit(?: varying)?"?\z"#,
            string_group,
        ),
        Recognizer::new(Xml, r"(?s)\A'(.*)'::xml\z", string_group),
        Recognizer::new(Array, r#"(?s)\A'(.*)'::"?\D+"?\[\]\z"#, string_group),
        Recognizer::new(
            ObjectIdentifier,
            r"\A'(-?\d+)'::oid\z|\A(-?\d+)\z",
            either_number,
        ),
    ]
});

/// Which literal shape `raw` has, if any.
pub fn classify(raw: &str) -> Option<LiteralShape> {
    RECOGNIZERS
        .iter()
        .find(|r| r.pattern.is_match(raw))
        .map(|r| r.shape)
}

/// Decode a catalog default expression into a portable value.
///
/// ```
/// use pgdialect::default_value::decode;
/// use pgdialect_schema::PortableValue;
///
/// assert_eq!(decode(Some("(-1)")), Some(PortableValue::Number("-1".into())));
/// assert_eq!(decode(Some("'5'::bpchar")), Some(PortableValue::String("5".into())));
/// assert_eq!(decode(Some("nextval('t_id_seq'::regclass)")), None);
/// ```
pub fn decode(raw: Option<&str>) -> Option<PortableValue> {
    let raw = raw?;
    RECOGNIZERS.iter().find_map(|r| {
        r.pattern
            .captures(raw)
            .map(|caps| (r.extract)(&caps))
    })
}

/// Replace `\ddd` octal escapes with the byte they encode.
///
/// Only three-digit groups whose value fits in a byte are escapes; every
/// other backslash is kept. Byte sequences that aren't valid UTF-8 come
/// back with replacement characters.
fn unescape_octal(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\'
            && let Some(byte) = octal_byte(&bytes[i + 1..])
        {
            out.push(byte);
            i += 4;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn octal_byte(digits: &[u8]) -> Option<u8> {
    let digits = digits.get(..3)?;
    let mut value: u32 = 0;
    for d in digits {
        if !(b'0'..=b'7').contains(d) {
            return None;
        }
        value = value * 8 + u32::from(d - b'0');
    }
    u8::try_from(value).ok()
}
