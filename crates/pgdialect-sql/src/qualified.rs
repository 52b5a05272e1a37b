//! Schema-qualified names: `table`, `schema.table`, `"My Schema"."a.b"`.

use thiserror::Error;

use crate::{QuotedIdentifier, quote_ident};

/// A qualified name that can't be split into identifier segments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentError {
    #[error("empty identifier")]
    Empty,

    #[error("unterminated quoted identifier in {name:?}")]
    Unterminated { name: String },

    #[error("empty identifier segment in {name:?}")]
    EmptySegment { name: String },

    #[error("unexpected text after quoted identifier in {name:?}")]
    TrailingText { name: String },

    #[error("too many name segments in {name:?} (expected at most schema.name)")]
    TooManySegments { name: String },
}

/// A name split into an optional schema and the object name, both unquoted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedName {
    pub schema: Option<String>,
    pub name: String,
}

impl QualifiedName {
    /// Split a possibly schema-qualified, possibly quoted name.
    ///
    /// A leading quoted span is one segment even if it contains dots;
    /// otherwise a segment runs up to the first `.`. At most two segments.
    pub fn parse(input: &str) -> Result<Self, IdentError> {
        if input.is_empty() {
            return Err(IdentError::Empty);
        }

        let (first, rest) = take_segment(input, input)?;
        let Some(rest) = after_separator(rest, input)? else {
            return Ok(Self {
                schema: None,
                name: first,
            });
        };

        let (second, rest) = take_segment(rest, input)?;
        match after_separator(rest, input)? {
            None => Ok(Self {
                schema: Some(first),
                name: second,
            }),
            Some(_) => Err(IdentError::TooManySegments {
                name: input.to_string(),
            }),
        }
    }

    /// Quote each segment independently and join them with `.`.
    pub fn quoted(&self) -> QuotedIdentifier {
        let name = quote_ident(&self.name);
        match &self.schema {
            Some(schema) => QuotedIdentifier::qualify(&quote_ident(schema), &name),
            None => name,
        }
    }
}

/// Quote a table name that may carry a schema prefix.
///
/// ```
/// use pgdialect_sql::quote_qualified_name;
/// assert_eq!(quote_qualified_name("public.users").unwrap().as_str(), "\"public\".\"users\"");
/// assert_eq!(quote_qualified_name("\"a.b\".c").unwrap().as_str(), "\"a.b\".\"c\"");
/// ```
pub fn quote_qualified_name(name: &str) -> Result<QuotedIdentifier, IdentError> {
    QualifiedName::parse(name).map(|q| q.quoted())
}

/// Take one segment off the front of `s`, returning it unquoted along with
/// whatever follows it.
fn take_segment<'a>(s: &'a str, whole: &str) -> Result<(String, &'a str), IdentError> {
    if let Some(body) = s.strip_prefix('"') {
        let mut segment = String::new();
        let mut chars = body.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if c == '"' {
                if chars.next_if(|&(_, next)| next == '"').is_some() {
                    segment.push('"');
                    continue;
                }
                if segment.is_empty() {
                    return Err(IdentError::EmptySegment {
                        name: whole.to_string(),
                    });
                }
                return Ok((segment, &body[i + 1..]));
            }
            segment.push(c);
        }
        Err(IdentError::Unterminated {
            name: whole.to_string(),
        })
    } else {
        let end = s.find('.').unwrap_or(s.len());
        if end == 0 {
            return Err(IdentError::EmptySegment {
                name: whole.to_string(),
            });
        }
        Ok((s[..end].to_string(), &s[end..]))
    }
}

/// What follows a segment must be nothing, or a `.` and another segment.
fn after_separator<'a>(rest: &'a str, whole: &str) -> Result<Option<&'a str>, IdentError> {
    if rest.is_empty() {
        return Ok(None);
    }
    match rest.strip_prefix('.') {
        Some("") => Err(IdentError::EmptySegment {
            name: whole.to_string(),
        }),
        Some(next) => Ok(Some(next)),
        None => Err(IdentError::TrailingText {
            name: whole.to_string(),
        }),
    }
}
