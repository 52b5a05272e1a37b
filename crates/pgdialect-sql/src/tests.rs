use crate::*;
use proptest::prelude::*;

#[test]
fn test_quote_ident() {
    assert_eq!(quote_ident("users").as_str(), "\"users\"");
    assert_eq!(quote_ident("order").as_str(), "\"order\"");
    assert_eq!(quote_ident("we\"ird").as_str(), "\"we\"\"ird\"");
    assert_eq!(quote_ident("").as_str(), "\"\"");
}

#[test]
fn test_unquote_ident() {
    assert_eq!(unquote_ident("\"a\"\"b\"").as_deref(), Some("a\"b"));
    assert_eq!(unquote_ident("\"plain\"").as_deref(), Some("plain"));
    assert_eq!(unquote_ident("plain"), None);
    assert_eq!(unquote_ident("\"a\"b\""), None);
}

proptest! {
    #[test]
    fn quote_ident_round_trips(name in "[a-zA-Z0-9_\" .]{0,24}") {
        let quoted = quote_ident(&name);
        prop_assert_eq!(unquote_ident(quoted.as_str()), Some(name));
    }

    #[test]
    fn quoted_segments_survive_qualification(schema in "[a-z_\". ]{1,12}", table in "[a-z_\". ]{1,12}") {
        let input = format!("{}.{}", quote_ident(&schema), quote_ident(&table));
        let parsed = QualifiedName::parse(&input).unwrap();
        prop_assert_eq!(parsed.schema, Some(schema));
        prop_assert_eq!(parsed.name, table);
    }
}

#[test]
fn test_qualified_name_plain() {
    let q = QualifiedName::parse("users").unwrap();
    assert_eq!(q.schema, None);
    assert_eq!(q.name, "users");
    assert_eq!(q.quoted().as_str(), "\"users\"");
}

#[test]
fn test_qualified_name_with_schema() {
    let q = QualifiedName::parse("public.users").unwrap();
    assert_eq!(q.schema.as_deref(), Some("public"));
    assert_eq!(q.name, "users");
    assert_eq!(q.quoted().as_str(), "\"public\".\"users\"");
}

#[test]
fn test_qualified_name_dots_inside_quotes() {
    let q = QualifiedName::parse("\"my.schema\".\"tab.le\"").unwrap();
    assert_eq!(q.schema.as_deref(), Some("my.schema"));
    assert_eq!(q.name, "tab.le");

    let q = QualifiedName::parse("\"just.one\"").unwrap();
    assert_eq!(q.schema, None);
    assert_eq!(q.name, "just.one");

    let q = QualifiedName::parse("app.\"Mixed Case\"").unwrap();
    assert_eq!(q.quoted().as_str(), "\"app\".\"Mixed Case\"");
}

#[test]
fn test_qualified_name_doubled_quotes() {
    let q = QualifiedName::parse("\"say \"\"hi\"\"\"").unwrap();
    assert_eq!(q.name, "say \"hi\"");
    assert_eq!(q.quoted().as_str(), "\"say \"\"hi\"\"\"");
}

#[test]
fn test_qualified_name_malformed() {
    assert_eq!(QualifiedName::parse(""), Err(IdentError::Empty));
    assert!(matches!(
        QualifiedName::parse("\"open"),
        Err(IdentError::Unterminated { .. })
    ));
    assert!(matches!(
        QualifiedName::parse(".users"),
        Err(IdentError::EmptySegment { .. })
    ));
    assert!(matches!(
        QualifiedName::parse("public."),
        Err(IdentError::EmptySegment { .. })
    ));
    assert!(matches!(
        QualifiedName::parse("\"a\"b"),
        Err(IdentError::TrailingText { .. })
    ));
    assert!(matches!(
        QualifiedName::parse("a.b.c"),
        Err(IdentError::TooManySegments { .. })
    ));
}

#[test]
fn test_escape_binary() {
    assert_eq!(escape_binary(&[], BinaryEscape::Standard), "");
    assert_eq!(escape_binary(&[0, 7, 255], BinaryEscape::Standard), "\\000\\007\\377");
    assert_eq!(escape_binary(b"A", BinaryEscape::Legacy), "\\\\101");
}

#[test]
fn test_escaped_literals() {
    insta::assert_snapshot!(EscapedLiteral::string("it's"), @"'it''s'");
    insta::assert_snapshot!(EscapedLiteral::typed("xml", "<a>'</a>"), @"xml '<a>''</a>'");
    insta::assert_snapshot!(EscapedLiteral::binary(b"hi", BinaryEscape::Standard), @r"'\150\151'");
    insta::assert_snapshot!(EscapedLiteral::binary_cast(b"\x01", BinaryEscape::Standard), @r"'\001'::bytea");
    insta::assert_snapshot!(EscapedLiteral::float(f64::NEG_INFINITY), @"'-Infinity'");
    insta::assert_snapshot!(EscapedLiteral::float(1.5), @"1.5");
    insta::assert_snapshot!(EscapedLiteral::boolean(true), @"TRUE");
    insta::assert_snapshot!(EscapedLiteral::null(), @"NULL");
}

#[test]
fn test_numeric_text() {
    assert_eq!(EscapedLiteral::numeric_text("12.50").as_str(), "12.50");
    assert_eq!(EscapedLiteral::numeric_text("-3").as_str(), "-3");
    assert_eq!(EscapedLiteral::numeric_text("1; DROP").as_str(), "'1; DROP'");
    assert_eq!(EscapedLiteral::numeric_text("").as_str(), "''");
}

#[test]
fn test_bit_string() {
    assert_eq!(EscapedLiteral::bit_string("0101").unwrap().as_str(), "B'0101'");
    assert_eq!(EscapedLiteral::bit_string("1F").unwrap().as_str(), "X'1F'");
    assert_eq!(EscapedLiteral::bit_string("zz"), None);
}

#[test]
fn test_truncate_identifier() {
    assert_eq!(truncate_identifier("short", 63), "short");

    let long = "index_some_really_long_table_name_on_first_column_and_second_column";
    let truncated = truncate_identifier(long, DEFAULT_IDENTIFIER_LENGTH);
    assert!(truncated.len() <= DEFAULT_IDENTIFIER_LENGTH);
    assert!(truncated.starts_with("index_some_really_long_table_name"));
    assert_eq!(truncated, truncate_identifier(long, DEFAULT_IDENTIFIER_LENGTH));

    let other = format!("{long}_x");
    assert_ne!(truncated, truncate_identifier(&other, DEFAULT_IDENTIFIER_LENGTH));
}

#[test]
fn test_truncate_identifier_tiny_limits() {
    let long = "index_some_really_long_table_name_on_first_column";
    for max_len in 0..=12 {
        let truncated = truncate_identifier(long, max_len);
        assert!(
            truncated.len() <= max_len,
            "{truncated:?} exceeds {max_len} bytes"
        );
    }
    assert_eq!(truncate_identifier(long, 5).len(), 5);
    assert!(!truncate_identifier(long, 5).contains('_'));
    assert!(truncate_identifier(long, 12).starts_with("ind_"));
}
