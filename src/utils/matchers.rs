use lazy_static::lazy_static;
use regex::Regex;

pub fn contains_role_id(msg: &str) -> bool {
    ROLE_ID_MATCHER.is_match(msg)
}

/// Reads a role from either a raw id or a role mention (`<@&id>`), surrounding whitespace allowed.
pub fn get_role_id(msg: &str) -> Option<u64> {
    let msg = msg.trim();
    let captures = ROLE_ID_MATCHER
        .captures(msg)
        .or_else(|| RAW_ID_MATCHER.captures(msg))?;
    captures.get(1)?.as_str().parse().ok()
}

lazy_static! {
    static ref ROLE_ID_MATCHER: Regex = {
        Regex::new(r"^<@&([0-9]+)>$").unwrap()
    };
}

lazy_static! {
    static ref RAW_ID_MATCHER: Regex = {
        Regex::new(r"^([0-9]{1,20})$").unwrap()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_mentions_match() {
        assert!(contains_role_id("<@&123>"));
        assert!(!contains_role_id("<@123>"));
        assert!(!contains_role_id("<#123>"));
    }

    #[test]
    fn role_ids_are_read_from_mentions_and_raw_ids() {
        assert_eq!(get_role_id("<@&461948239105425408>"), Some(461948239105425408));
        assert_eq!(get_role_id(" 42 "), Some(42));
        assert_eq!(get_role_id("moderators"), None);
        assert_eq!(get_role_id("<@!42>"), None);
        // does not fit in a u64
        assert_eq!(get_role_id("99999999999999999999"), None);
    }
}
