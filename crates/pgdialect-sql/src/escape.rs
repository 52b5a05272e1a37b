//! Literal escaping: strings, numbers, bytea, bit strings.

use std::fmt::{self, Write};

use crate::Lit;

/// How many backslashes precede each octal group in a bytea literal.
///
/// With `standard_conforming_strings = on` (the default since 9.1) the
/// string literal keeps backslashes as-is, so one is right. Servers running
/// with it off process escapes in ordinary literals first, which needs two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinaryEscape {
    #[default]
    Standard,
    Legacy,
}

impl BinaryEscape {
    fn prefix(self) -> &'static str {
        match self {
            BinaryEscape::Standard => "\\",
            BinaryEscape::Legacy => "\\\\",
        }
    }
}

/// Render every byte as a 3-digit octal escape, no separators.
///
/// ```
/// use pgdialect_sql::{escape_binary, BinaryEscape};
/// assert_eq!(escape_binary(b"A\0", BinaryEscape::Standard), "\\101\\000");
/// ```
pub fn escape_binary(bytes: &[u8], style: BinaryEscape) -> String {
    let prefix = style.prefix();
    let mut out = String::with_capacity(bytes.len() * (prefix.len() + 3));
    for b in bytes {
        // writing to a String can't fail
        let _ = write!(out, "{prefix}{b:03o}");
    }
    out
}

/// A literal value ready to splice into SQL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EscapedLiteral(String);

impl EscapedLiteral {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn null() -> Self {
        Self("NULL".to_string())
    }

    pub fn boolean(value: bool) -> Self {
        Self(if value { "TRUE" } else { "FALSE" }.to_string())
    }

    pub fn int(value: i64) -> Self {
        Self(value.to_string())
    }

    /// Finite floats render bare; NaN and the infinities render as the
    /// quoted special values PostgreSQL accepts for float columns.
    pub fn float(value: f64) -> Self {
        if value.is_nan() {
            Self("'NaN'".to_string())
        } else if value.is_infinite() {
            let text = if value > 0.0 { "'Infinity'" } else { "'-Infinity'" };
            Self(text.to_string())
        } else {
            Self(value.to_string())
        }
    }

    /// A bare numeric literal from its text form.
    ///
    /// Text that isn't a plain decimal number is quoted instead, so the result
    /// is always safe.
    pub fn numeric_text(text: &str) -> Self {
        if is_decimal_number(text) {
            Self(text.to_string())
        } else {
            Self::string(text)
        }
    }

    /// A single-quoted string literal.
    pub fn string(value: &str) -> Self {
        Self(Lit(value).to_string())
    }

    /// A string literal preceded by a type keyword, e.g. `xml '<a/>'`.
    pub fn typed(type_name: &'static str, value: &str) -> Self {
        Self(format!("{type_name} {}", Lit(value)))
    }

    /// Escaped binary data in a plain quoted literal.
    pub fn binary(bytes: &[u8], style: BinaryEscape) -> Self {
        Self(format!("'{}'", escape_binary(bytes, style)))
    }

    /// Escaped binary data with an explicit `::bytea` cast, for contexts
    /// where the target column type isn't known.
    pub fn binary_cast(bytes: &[u8], style: BinaryEscape) -> Self {
        Self(format!("'{}'::bytea", escape_binary(bytes, style)))
    }

    /// Bit-string notation: `B'0101'` when every char is 0/1, `X'1F'` when
    /// the value is hexadecimal. Anything else has no bit-string form.
    pub fn bit_string(value: &str) -> Option<Self> {
        if value.chars().all(|c| c == '0' || c == '1') {
            Some(Self(format!("B'{value}'")))
        } else if value.chars().all(|c| c.is_ascii_hexdigit()) {
            Some(Self(format!("X'{value}'")))
        } else {
            None
        }
    }
}

impl fmt::Display for EscapedLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_decimal_number(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    let mut parts = digits.splitn(2, '.');
    let int_part = parts.next().unwrap_or_default();
    let frac_part = parts.next();
    !int_part.is_empty()
        && int_part.chars().all(|c| c.is_ascii_digit())
        && frac_part.is_none_or(|f| f.chars().all(|c| c.is_ascii_digit()))
}
