//! Mapping between PostgreSQL type spellings and canonical kinds.

use std::sync::LazyLock;

use pgdialect_schema::{CanonicalKind, TypeInfo};
use regex::Regex;

use crate::{AdapterConfig, Error, Result};

/// The portable, dialect-agnostic mapping a host framework applies to
/// spellings this dialect doesn't special-case.
pub trait GenericTypeResolver {
    /// `scale` is the scale already extracted for `raw`; whole-number
    /// decimals map to integers.
    fn kind(&self, raw: &str, scale: Option<u32>) -> CanonicalKind;
    fn limit(&self, raw: &str) -> Option<u32>;
    fn precision(&self, raw: &str) -> Option<u32>;
    fn scale(&self, raw: &str) -> Option<u32>;
}

/// Substring-based mapping for standard SQL spellings.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardTypeResolver;

static LIMIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d+)[^)]*\)").expect("valid limit regex"));

static NUMERIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:numeric|decimal|number)\((\d+)(?:,\s*(\d+))?\)")
        .expect("valid numeric regex")
});

impl GenericTypeResolver for StandardTypeResolver {
    fn kind(&self, raw: &str, scale: Option<u32>) -> CanonicalKind {
        let lower = raw.to_ascii_lowercase();
        let has = |needle: &str| lower.contains(needle);

        if has("int") {
            CanonicalKind::Integer
        } else if has("float") || has("double") {
            CanonicalKind::Float
        } else if has("decimal") || has("numeric") || has("number") {
            if scale == Some(0) {
                CanonicalKind::Integer
            } else {
                CanonicalKind::Decimal
            }
        } else if has("datetime") || has("timestamp") {
            CanonicalKind::DateTime
        } else if has("time") {
            CanonicalKind::Time
        } else if has("date") {
            CanonicalKind::Date
        } else if has("clob") || has("text") {
            CanonicalKind::Text
        } else if has("blob") || has("binary") {
            CanonicalKind::Binary
        } else if has("char") || has("string") {
            CanonicalKind::String
        } else if has("boolean") {
            CanonicalKind::Boolean
        } else {
            CanonicalKind::Unknown
        }
    }

    fn limit(&self, raw: &str) -> Option<u32> {
        LIMIT_RE
            .captures(raw)
            .and_then(|caps| caps.get(1)?.as_str().parse().ok())
    }

    fn precision(&self, raw: &str) -> Option<u32> {
        NUMERIC_RE
            .captures(raw)
            .and_then(|caps| caps.get(1)?.as_str().parse().ok())
    }

    fn scale(&self, raw: &str) -> Option<u32> {
        let caps = NUMERIC_RE.captures(raw)?;
        match caps.get(2) {
            Some(scale) => scale.as_str().parse().ok(),
            None => Some(0),
        }
    }
}

/// Caller-pinned type facts. Any field set here wins over what the
/// simplifier would derive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeOverrides {
    pub kind: Option<CanonicalKind>,
    pub limit: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
}

impl TypeOverrides {
    pub fn kind(kind: CanonicalKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }
}

/// PostgreSQL-specific spellings, checked in order before the generic
/// mapping. Matching is case-sensitive: the catalog always reports these
/// in lower case.
static OVERLAY: LazyLock<Vec<(Regex, CanonicalKind)>> = LazyLock::new(|| {
    use CanonicalKind::*;
    [
        (r"^(?:real|double precision)$", Float),
        (r"^money$", Decimal),
        (r"^(?:character varying|bpchar)(?:\(\d+\))?$", String),
        (r"^bytea$", Binary),
        (r"^timestamp with(?:out)? time zone$", DateTime),
        (r"^interval$", String),
        (r#"^(?:point|line|lseg|box|"?path"?|polygon|circle)$"#, String),
        (r"^(?:cidr|inet|macaddr)$", String),
        (r"^bit(?: varying)?(?:\(\d+\))?$", String),
        (r"^xml$", Xml),
        (r"^tsvector$", SearchVector),
        (r"^\D+\[\]$", String),
        (r"^oid$", Integer),
        (r"^uuid$", String),
        (r"^(?:small|big)int$", Integer),
    ]
    .into_iter()
    .map(|(pattern, kind)| (Regex::new(pattern).expect("valid overlay regex"), kind))
    .collect()
});

static BIGINT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^bigin").expect("valid bigint regex"));
static SMALLINT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^smallint").expect("valid smallint regex"));

/// Collapses type spellings into [`TypeInfo`].
#[derive(Debug, Clone)]
pub struct TypeSimplifier {
    money_precision: u32,
}

impl TypeSimplifier {
    pub fn new(config: &AdapterConfig) -> Self {
        Self {
            money_precision: config.money_precision,
        }
    }

    /// Simplify with the standard generic mapping and no overrides.
    pub fn simplify(&self, raw: &str) -> TypeInfo {
        self.simplify_with(raw, &StandardTypeResolver, &TypeOverrides::default())
    }

    pub fn simplify_with(
        &self,
        raw: &str,
        generic: &dyn GenericTypeResolver,
        overrides: &TypeOverrides,
    ) -> TypeInfo {
        let scale = if raw.starts_with("money") {
            Some(2)
        } else {
            generic.scale(raw)
        };

        let kind = OVERLAY
            .iter()
            .find(|(pattern, _)| pattern.is_match(raw))
            .map(|(_, kind)| *kind)
            .unwrap_or_else(|| generic.kind(raw, scale));

        let limit = if BIGINT_RE.is_match(raw) {
            Some(8)
        } else if SMALLINT_RE.is_match(raw) {
            Some(2)
        } else {
            generic.limit(raw)
        };

        let precision = if raw == "money" {
            Some(self.money_precision)
        } else {
            generic.precision(raw)
        };

        TypeInfo {
            kind: overrides.kind.unwrap_or(kind),
            limit: overrides.limit.or(limit),
            precision: overrides.precision.or(precision),
            scale: overrides.scale.or(scale),
        }
    }
}

/// Integer spelling for a byte limit: absent or 4 is `integer`, narrower is
/// `smallint`, wider is `bigint`.
pub fn integer_sql(limit: Option<u32>) -> &'static str {
    match limit {
        None | Some(4) => "integer",
        Some(n) if n < 4 => "smallint",
        Some(_) => "bigint",
    }
}

/// Default `character varying` length when none is given.
pub const DEFAULT_STRING_LIMIT: u32 = 255;

/// Native DDL spelling for a canonical kind with its size modifiers.
pub fn type_to_sql(
    kind: CanonicalKind,
    limit: Option<u32>,
    precision: Option<u32>,
    scale: Option<u32>,
) -> Result<String> {
    let sql = match kind {
        CanonicalKind::Integer => integer_sql(limit).to_string(),
        CanonicalKind::String => {
            format!("character varying({})", limit.unwrap_or(DEFAULT_STRING_LIMIT))
        }
        CanonicalKind::Decimal => match (precision, scale) {
            (Some(p), Some(s)) => format!("decimal({p},{s})"),
            (Some(p), None) => format!("decimal({p})"),
            (None, _) => "decimal".to_string(),
        },
        CanonicalKind::Float => "float".to_string(),
        CanonicalKind::Text => "text".to_string(),
        CanonicalKind::Binary => "bytea".to_string(),
        CanonicalKind::Boolean => "boolean".to_string(),
        CanonicalKind::Date => "date".to_string(),
        CanonicalKind::Time => "time".to_string(),
        CanonicalKind::DateTime => "timestamp".to_string(),
        CanonicalKind::Xml => "xml".to_string(),
        CanonicalKind::SearchVector => "tsvector".to_string(),
        CanonicalKind::Unknown => return Err(Error::UnsupportedType(kind)),
    };
    Ok(sql)
}

#[cfg(test)]
mod tests {
    use super::*;
    use CanonicalKind::*;

    fn simplifier() -> TypeSimplifier {
        TypeSimplifier::new(&AdapterConfig::default())
    }

    #[test]
    fn test_overlay_kinds() {
        let cases = [
            ("real", Float),
            ("double precision", Float),
            ("money", Decimal),
            ("character varying(50)", String),
            ("bpchar", String),
            ("bytea", Binary),
            ("timestamp without time zone", DateTime),
            ("timestamp with time zone", DateTime),
            ("interval", String),
            ("point", String),
            ("\"path\"", String),
            ("inet", String),
            ("macaddr", String),
            ("bit varying(8)", String),
            ("xml", Xml),
            ("tsvector", SearchVector),
            ("integer[]", String),
            ("character varying[]", String),
            ("oid", Integer),
            ("uuid", String),
            ("smallint", Integer),
            ("bigint", Integer),
        ];
        let s = simplifier();
        for (raw, kind) in cases {
            assert_eq!(s.simplify(raw).kind, kind, "kind of {raw:?}");
        }
    }

    #[test]
    fn test_generic_kinds() {
        let cases = [
            ("integer", Integer),
            ("numeric(10,2)", Decimal),
            ("numeric(10)", Integer),
            ("numeric", Decimal),
            ("text", Text),
            ("boolean", Boolean),
            ("date", Date),
            ("time without time zone", Time),
            ("timestamp(6) without time zone", DateTime),
            ("character(5)", String),
            ("my_enum", Unknown),
        ];
        let s = simplifier();
        for (raw, kind) in cases {
            assert_eq!(s.simplify(raw).kind, kind, "kind of {raw:?}");
        }
    }

    #[test]
    fn test_overlay_is_case_sensitive() {
        // upper-case spellings miss the overlay and hit the generic mapping
        assert_eq!(simplifier().simplify("BYTEA").kind, Unknown);
        assert_eq!(simplifier().simplify("XML").kind, Unknown);
    }

    #[test]
    fn test_limits() {
        let s = simplifier();
        assert_eq!(s.simplify("bigint").limit, Some(8));
        assert_eq!(s.simplify("BIGINT").limit, Some(8));
        assert_eq!(s.simplify("smallint").limit, Some(2));
        assert_eq!(s.simplify("character varying(50)").limit, Some(50));
        assert_eq!(s.simplify("integer").limit, None);
    }

    #[test]
    fn test_money() {
        let info = simplifier().simplify("money");
        assert_eq!(info.kind, Decimal);
        assert_eq!(info.precision, Some(19));
        assert_eq!(info.scale, Some(2));

        let config = AdapterConfig::default().with_money_precision(10);
        let info = TypeSimplifier::new(&config).simplify("money");
        assert_eq!(info.precision, Some(10));
    }

    #[test]
    fn test_numeric_precision_scale() {
        let info = simplifier().simplify("numeric(12,4)");
        assert_eq!((info.precision, info.scale), (Some(12), Some(4)));
        let info = simplifier().simplify("numeric(7)");
        assert_eq!((info.precision, info.scale), (Some(7), Some(0)));
    }

    #[test]
    fn test_overrides_win() {
        let overrides = TypeOverrides {
            kind: Some(Text),
            limit: Some(4),
            precision: None,
            scale: None,
        };
        let info = simplifier().simplify_with("bigint", &StandardTypeResolver, &overrides);
        assert_eq!(info.kind, Text);
        assert_eq!(info.limit, Some(4));
    }

    struct EverythingIsText;

    impl GenericTypeResolver for EverythingIsText {
        fn kind(&self, _raw: &str, _scale: Option<u32>) -> CanonicalKind {
            Text
        }
        fn limit(&self, _raw: &str) -> Option<u32> {
            None
        }
        fn precision(&self, _raw: &str) -> Option<u32> {
            None
        }
        fn scale(&self, _raw: &str) -> Option<u32> {
            None
        }
    }

    #[test]
    fn test_custom_generic_resolver() {
        let s = simplifier();
        let info = s.simplify_with("citext", &EverythingIsText, &TypeOverrides::default());
        assert_eq!(info.kind, Text);
        // overlay still runs first
        let info = s.simplify_with("bytea", &EverythingIsText, &TypeOverrides::default());
        assert_eq!(info.kind, Binary);
    }

    #[test]
    fn test_integer_sql() {
        assert_eq!(integer_sql(None), "integer");
        assert_eq!(integer_sql(Some(4)), "integer");
        assert_eq!(integer_sql(Some(2)), "smallint");
        assert_eq!(integer_sql(Some(1)), "smallint");
        assert_eq!(integer_sql(Some(8)), "bigint");
        assert_eq!(integer_sql(Some(5)), "bigint");
    }

    #[test]
    fn test_type_to_sql() {
        assert_eq!(type_to_sql(String, None, None, None).unwrap(), "character varying(255)");
        assert_eq!(type_to_sql(String, Some(20), None, None).unwrap(), "character varying(20)");
        assert_eq!(type_to_sql(Decimal, None, Some(10), Some(2)).unwrap(), "decimal(10,2)");
        assert_eq!(type_to_sql(DateTime, None, None, None).unwrap(), "timestamp");
        assert_eq!(type_to_sql(Integer, Some(8), None, None).unwrap(), "bigint");
        assert!(matches!(
            type_to_sql(Unknown, None, None, None),
            Err(Error::UnsupportedType(Unknown))
        ));
    }
}
