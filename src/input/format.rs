//! Normalisation of free-text form entry into the canonical display strings
//! persisted on the profile record.

pub const DOCUMENT_DIGITS: usize = 11;
pub const PHONE_DIGITS: usize = 11;
pub const BRANCH_DIGITS: usize = 5;

pub fn digits(text: &str) -> String {
    text.chars().filter(char::is_ascii_digit).collect()
}

pub fn digit_count(text: &str) -> usize {
    text.chars().filter(char::is_ascii_digit).count()
}

/// Groups a CPF as `xxx.xxx.xxx-xx`, emitting only the separators the
/// available digits reach.
pub fn format_document_number(text: &str) -> String {
    let raw: String = digits(text).chars().take(DOCUMENT_DIGITS).collect();
    let len = raw.len();

    match len {
        0..=3 => raw,
        4..=6 => format!("{}.{}", &raw[..3], &raw[3..]),
        7..=9 => format!("{}.{}.{}", &raw[..3], &raw[3..6], &raw[6..]),
        _ => format!("{}.{}.{}-{}", &raw[..3], &raw[3..6], &raw[6..9], &raw[9..]),
    }
}

/// Groups a mobile number as `XX X XXXX-XXXX`.
pub fn format_phone(text: &str) -> String {
    let raw: String = digits(text).chars().take(PHONE_DIGITS).collect();
    let len = raw.len();

    match len {
        0..=2 => raw,
        3 => format!("{} {}", &raw[..2], &raw[2..]),
        4..=7 => format!("{} {} {}", &raw[..2], &raw[2..3], &raw[3..]),
        _ => format!("{} {} {}-{}", &raw[..2], &raw[2..3], &raw[3..7], &raw[7..]),
    }
}

/// Bank branch `DDDD-D`.
pub fn format_branch(text: &str) -> String {
    let raw: String = digits(text).chars().take(BRANCH_DIGITS).collect();

    if raw.len() > 4 {
        format!("{}-{}", &raw[..4], &raw[4..])
    } else {
        raw
    }
}

pub fn format_account(text: &str) -> String {
    digits(text)
}

/// Applies `formatter` only when the entry fits within `max_digits`, so an
/// over-long entry stays invalid instead of being silently cut to size.
pub fn format_bounded(text: &str, max_digits: usize, formatter: fn(&str) -> String) -> String {
    if digit_count(text) > max_digits {
        text.to_string()
    } else {
        formatter(text)
    }
}
