use std::sync::OnceLock;

use regex::Regex;
use sha2::{Digest, Sha256};

const MAX_DB_NAME_LEN: usize = 63;

/// Database-level identifier derived from a display title.
///
/// Non-alphanumeric runs collapse to `_`, names never start with a digit,
/// and titles with nothing usable fall back to `{prefix}_{hash}`.
pub fn safe_db_name(input: &str, prefix: &str) -> String {
    let mut name = slugify(input);
    if name.is_empty() {
        name = format!("{}_{}", prefix, short_hash(input));
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name = format!("{}_{}", prefix, name);
    }
    truncate(name)
}

fn slugify(input: &str) -> String {
    let lowered = input.trim().to_lowercase();
    let collapsed = separator_re().replace_all(&lowered, "_");
    truncate(collapsed.trim_matches('_').to_string())
}

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(&digest[..4])
}

// Slugs are ASCII by construction.
fn truncate(mut name: String) -> String {
    name.truncate(MAX_DB_NAME_LEN);
    name
}

fn separator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_titles() {
        assert_eq!(safe_db_name("  Order Items ", "t"), "order_items");
        assert_eq!(safe_db_name("Table-新增", "t"), "table");
        assert_eq!(safe_db_name("__x__", "c"), "x");
    }

    #[test]
    fn prefixes_leading_digits() {
        assert_eq!(safe_db_name("2024 Sales", "t"), "t_2024_sales");
    }

    #[test]
    fn hashes_titles_without_ascii() {
        let name = safe_db_name("订单", "t");
        assert!(name.starts_with("t_"));
        assert_eq!(name.len(), 10);
        assert_eq!(name, safe_db_name("订单", "t"));
        assert_ne!(name, safe_db_name("客户", "t"));
    }

    #[test]
    fn caps_length() {
        let long = "a".repeat(100);
        assert_eq!(safe_db_name(&long, "c").len(), 63);
        let digits = "1".repeat(100);
        let name = safe_db_name(&digits, "c");
        assert_eq!(name.len(), 63);
        assert!(name.starts_with("c_1"));
    }
}
