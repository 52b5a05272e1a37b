//! Identifier quoting and literal escaping for PostgreSQL.
//!
//! Everything that ends up interpolated verbatim into SQL text goes through
//! this crate. [`QuotedIdentifier`] and [`EscapedLiteral`] can only be built
//! by the functions here, so holding one means the text is safe to splice.

use std::fmt;

mod escape;
pub use escape::*;

mod naming;
pub use naming::*;

mod qualified;
pub use qualified::*;

/// A PostgreSQL string literal wrapper.
///
/// Display writes the value escaped and quoted with single quotes.
///
/// # Example
/// ```
/// use pgdialect_sql::Lit;
/// assert_eq!(format!("{}", Lit("foo")), "'foo'");
/// assert_eq!(format!("{}", Lit("it's")), "'it''s'");
/// ```
pub struct Lit<T: AsRef<str>>(pub T);

impl<T: AsRef<str>> fmt::Display for Lit<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'")?;
        for c in self.0.as_ref().chars() {
            if c == '\'' {
                write!(f, "''")?;
            } else {
                write!(f, "{}", c)?;
            }
        }
        write!(f, "'")
    }
}

/// A PostgreSQL identifier wrapper.
///
/// Display writes the value escaped and quoted with double quotes.
///
/// # Example
/// ```
/// use pgdialect_sql::Ident;
/// assert_eq!(format!("{}", Ident("user")), "\"user\"");
/// assert_eq!(format!("{}", Ident("bla\"h")), "\"bla\"\"h\"");
/// ```
pub struct Ident<T: AsRef<str>>(pub T);

impl<T: AsRef<str>> fmt::Display for Ident<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"")?;
        for c in self.0.as_ref().chars() {
            if c == '"' {
                write!(f, "\"\"")?;
            } else {
                write!(f, "{}", c)?;
            }
        }
        write!(f, "\"")
    }
}

/// An identifier (or dotted pair of identifiers) ready to splice into SQL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuotedIdentifier(String);

impl QuotedIdentifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Join two already-quoted parts as `schema.name`.
    pub fn qualify(schema: &QuotedIdentifier, name: &QuotedIdentifier) -> Self {
        Self(format!("{}.{}", schema.0, name.0))
    }
}

impl fmt::Display for QuotedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Quote a PostgreSQL identifier.
///
/// Always quotes, so reserved words like `user` or `order` are safe.
/// Doubles any embedded quotes.
pub fn quote_ident(name: &str) -> QuotedIdentifier {
    QuotedIdentifier(Ident(name).to_string())
}

/// Reverse [`quote_ident`]: strip the outer quotes and collapse `""`.
///
/// Returns `None` if `quoted` isn't a single well-formed quoted identifier.
pub fn unquote_ident(quoted: &str) -> Option<String> {
    let inner = quoted.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '"' {
            // A lone quote inside the span would have terminated it.
            if chars.next_if_eq(&'"').is_none() {
                return None;
            }
        }
        out.push(c);
    }
    Some(out)
}

#[cfg(test)]
mod tests;
