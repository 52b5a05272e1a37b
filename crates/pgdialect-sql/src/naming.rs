//! Generated object names.

/// PostgreSQL's default `max_identifier_length`.
pub const DEFAULT_IDENTIFIER_LENGTH: usize = 63;

/// Conventional index name: `index_{table}_on_{col1}_and_{col2}`.
///
/// ```
/// use pgdialect_sql::index_name;
/// assert_eq!(index_name("post", &["author_id", "created_at"]), "index_post_on_author_id_and_created_at");
/// ```
pub fn index_name(table: &str, columns: &[impl AsRef<str>]) -> String {
    let cols: Vec<&str> = columns.iter().map(|c| c.as_ref()).collect();
    format!("index_{}_on_{}", table, cols.join("_and_"))
}

/// Shorten `name` to at most `max_len` bytes.
///
/// Names that already fit come back unchanged. Longer names keep a prefix
/// and get a stable hash suffix, so two long names sharing a prefix still
/// end up distinct. Limits too small for a prefix get a bare hash prefix.
pub fn truncate_identifier(name: &str, max_len: usize) -> String {
    if name.len() <= max_len {
        return name.to_string();
    }

    let hex = blake3::hash(name.as_bytes()).to_hex().to_string();
    let suffix = &hex[..8];
    // no room for a prefix and separator: the hash alone
    if max_len <= suffix.len() + 1 {
        return hex[..max_len.min(hex.len())].to_string();
    }
    let max_prefix = max_len.saturating_sub(suffix.len() + 1);

    // avoid splitting UTF-8
    let mut len = max_prefix.min(name.len());
    while len > 0 && !name.is_char_boundary(len) {
        len -= 1;
    }

    format!("{}_{}", &name[..len], suffix)
}
