//! Turning runtime values into SQL literals.
//!
//! [`quote_literal`] is the PostgreSQL overlay: it only answers for value and
//! column combinations that need dialect-specific spelling. [`quote`] falls
//! back to the generic rendering for everything else.

use pgdialect_schema::{CanonicalKind, ColumnDescriptor, SqlValue};
use pgdialect_sql::{BinaryEscape, EscapedLiteral};

/// Dialect-specific quoting for a value headed into `column`.
///
/// Returns `None` when the generic rendering is correct.
pub fn quote_literal(
    value: &SqlValue,
    column: &ColumnDescriptor,
    style: BinaryEscape,
) -> Option<EscapedLiteral> {
    let raw_type = column.raw_type.as_str();
    match value {
        SqlValue::Float(f) if f.is_infinite() && column.kind == CanonicalKind::DateTime => {
            let text = if *f > 0.0 { "infinity" } else { "-infinity" };
            Some(EscapedLiteral::string(text))
        }
        SqlValue::Int(_) | SqlValue::Float(_) | SqlValue::Decimal(_)
            if raw_type.starts_with("money") =>
        {
            Some(EscapedLiteral::string(&numeric_text(value)?))
        }
        SqlValue::String(s) if raw_type == "bytea" => {
            Some(EscapedLiteral::binary(s.as_bytes(), style))
        }
        SqlValue::Bytes(b) if raw_type == "bytea" => Some(EscapedLiteral::binary(b, style)),
        SqlValue::String(s) if raw_type == "xml" => Some(EscapedLiteral::typed("xml", s)),
        SqlValue::String(s) if raw_type.starts_with("bit") => EscapedLiteral::bit_string(s),
        _ => None,
    }
}

fn numeric_text(value: &SqlValue) -> Option<String> {
    match value {
        SqlValue::Int(i) => Some(i.to_string()),
        SqlValue::Float(f) if f.is_finite() => Some(f.to_string()),
        SqlValue::Decimal(d) => Some(d.to_string()),
        _ => None,
    }
}

/// Quote `value` for SQL, consulting the column when one is known.
pub fn quote(
    value: &SqlValue,
    column: Option<&ColumnDescriptor>,
    style: BinaryEscape,
) -> EscapedLiteral {
    column
        .and_then(|column| quote_literal(value, column, style))
        .unwrap_or_else(|| quote_generic(value, style))
}

fn quote_generic(value: &SqlValue, style: BinaryEscape) -> EscapedLiteral {
    match value {
        SqlValue::Null => EscapedLiteral::null(),
        SqlValue::Bool(b) => EscapedLiteral::boolean(*b),
        SqlValue::Int(i) => EscapedLiteral::int(*i),
        SqlValue::Float(f) => EscapedLiteral::float(*f),
        SqlValue::Decimal(d) => EscapedLiteral::numeric_text(&d.to_string()),
        SqlValue::String(s) => EscapedLiteral::string(s),
        SqlValue::Bytes(b) => EscapedLiteral::binary_cast(b, style),
        SqlValue::Timestamp(ts) => {
            EscapedLiteral::string(&ts.format("%Y-%m-%d %H:%M:%S%.6f").to_string())
        }
        SqlValue::Date(d) => EscapedLiteral::string(&d.format("%Y-%m-%d").to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pgdialect_schema::TypeInfo;
    use rust_decimal::Decimal;

    use crate::{AdapterConfig, TypeSimplifier};

    fn column(raw_type: &str) -> ColumnDescriptor {
        let info: TypeInfo = TypeSimplifier::new(&AdapterConfig::default()).simplify(raw_type);
        ColumnDescriptor::new("c", raw_type, info, true)
    }

    fn q(value: impl Into<SqlValue>, raw_type: Option<&str>) -> String {
        let column = raw_type.map(column);
        quote(&value.into(), column.as_ref(), BinaryEscape::Standard).into_string()
    }

    #[test]
    fn test_datetime_infinity() {
        let col = column("timestamp without time zone");
        assert_eq!(
            quote_literal(&SqlValue::Float(f64::INFINITY), &col, BinaryEscape::Standard)
                .map(EscapedLiteral::into_string),
            Some("'infinity'".to_string())
        );
        assert_eq!(q(f64::NEG_INFINITY, Some("timestamp with time zone")), "'-infinity'");
        // finite floats aren't this overlay's business
        assert_eq!(
            quote_literal(&SqlValue::Float(1.5), &col, BinaryEscape::Standard),
            None
        );
    }

    #[test]
    fn test_datetime_infinity_default_round_trip() {
        let raw = "'infinity'::timestamp without time zone";
        let col = column("timestamp without time zone")
            .with_default(Some(raw.to_string()), crate::default_value::decode(Some(raw)));
        let value = col.default_value().unwrap();
        assert_eq!(value, SqlValue::Float(f64::INFINITY));
        assert_eq!(
            quote(&value, Some(&col), BinaryEscape::Standard).into_string(),
            "'infinity'"
        );
    }

    #[test]
    fn test_money() {
        assert_eq!(q(12, Some("money")), "'12'");
        assert_eq!(q(Decimal::new(1250, 2), Some("money")), "'12.50'");
        assert_eq!(q(12, Some("integer")), "12");
        assert_eq!(q(2.5, Some("money")), "'2.5'");
        // non-finite amounts get the generic float spelling
        assert_eq!(q(f64::INFINITY, Some("money")), "'Infinity'");
        assert_eq!(q(f64::NEG_INFINITY, Some("money")), "'-Infinity'");
        assert_eq!(q(f64::NAN, Some("money")), "'NaN'");
    }

    #[test]
    fn test_bytea() {
        assert_eq!(q(vec![0u8, 65], Some("bytea")), r"'\000\101'");
        assert_eq!(q("A", Some("bytea")), r"'\101'");
        assert_eq!(q(vec![0u8, 65], None), r"'\000\101'::bytea");

        let col = column("bytea");
        let legacy = quote(&SqlValue::Bytes(vec![1]), Some(&col), BinaryEscape::Legacy);
        assert_eq!(legacy.as_str(), r"'\\001'");
    }

    #[test]
    fn test_xml_and_bits() {
        assert_eq!(q("<a>it's</a>", Some("xml")), "xml '<a>it''s</a>'");
        assert_eq!(q("0101", Some("bit(4)")), "B'0101'");
        assert_eq!(q("1F", Some("bit varying")), "X'1F'");
        // no bit-string form: generic quoting
        assert_eq!(q("zz", Some("bit(8)")), "'zz'");
    }

    #[test]
    fn test_generic() {
        assert_eq!(q(SqlValue::Null, None), "NULL");
        assert_eq!(q(true, None), "TRUE");
        assert_eq!(q(false, Some("boolean")), "FALSE");
        assert_eq!(q(-7, None), "-7");
        assert_eq!(q(f64::NAN, None), "'NaN'");
        assert_eq!(q(f64::INFINITY, Some("double precision")), "'Infinity'");
        assert_eq!(q("O'Brien", Some("text")), "'O''Brien'");
        assert_eq!(q(Decimal::new(-314, 2), None), "-3.14");

        let ts = NaiveDate::from_ymd_opt(2011, 3, 4)
            .unwrap()
            .and_hms_micro_opt(5, 6, 7, 89)
            .unwrap();
        assert_eq!(q(SqlValue::Timestamp(ts), None), "'2011-03-04 05:06:07.000089'");
        let d = NaiveDate::from_ymd_opt(2011, 3, 4).unwrap();
        assert_eq!(q(SqlValue::Date(d), None), "'2011-03-04'");
    }
}
