//! Reverses the base-N substitution cipher that redirector pages wrap their
//! download form in.
//!
//! The page ships a packed call of the shape
//! `("<encoded>",N,"<alphabet>",<offset>,<base>,N)`. Every token of the
//! encoded string is a base-`base` numeral spelled with the first `base`
//! characters of the alphabet; tokens are separated by `alphabet[base]`.

use super::get_regex;
use regex::Regex;
use std::sync::OnceLock;

/// Highest code unit the cipher ever produces (exclusive).
const CODE_UNIT_LIMIT: u64 = 65_536;

/// Payloads this short are matches on unrelated script fragments.
const MIN_PAYLOAD_LEN: usize = 10;

fn double_quoted_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(
        &RE,
        r#"\(\s*"([^"]+)"\s*,\s*\d+\s*,\s*"([^"]+)"\s*,\s*(\d+)\s*,\s*(\d+)\s*,\s*\d+[a-zA-Z]?\s*\)"#,
    )
}

fn single_quoted_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(
        &RE,
        r"\(\s*'([^']+)'\s*,\s*\d+\s*,\s*'([^']+)'\s*,\s*(\d+)\s*,\s*(\d+)\s*,\s*\d+[a-zA-Z]?\s*\)",
    )
}

/// Decodes `encoded` with the given cipher parameters.
///
/// Tokens that do not map to a valid code point are dropped rather than
/// reported, so a corrupted payload yields a partial string.
#[must_use]
pub fn decode(encoded: &str, alphabet: &str, offset: u32, base: u32) -> String {
    let symbols: Vec<char> = alphabet.chars().collect();
    let Ok(base_idx) = usize::try_from(base) else {
        return String::new();
    };
    let Some(&separator) = symbols.get(base_idx) else {
        return String::new();
    };
    let digits = &symbols[..base_idx];

    encoded
        .split(separator)
        .filter(|token| !token.is_empty())
        .filter_map(|token| decode_token(token, digits, u64::from(base), u64::from(offset)))
        .collect()
}

fn decode_token(token: &str, digits: &[char], base: u64, offset: u64) -> Option<char> {
    let mut value: u64 = 0;
    for c in token.chars() {
        let Some(digit) = digits.iter().position(|d| *d == c) else {
            continue;
        };
        value = value.checked_mul(base)?.checked_add(digit as u64)?;
    }

    let code = value.checked_sub(offset)?;
    if code == 0 || code >= CODE_UNIT_LIMIT {
        return None;
    }
    char::from_u32(u32::try_from(code).ok()?)
}

/// Cipher parameters lifted out of a redirector page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedPayload {
    pub encoded: String,
    pub alphabet: String,
    pub offset: u32,
    pub base: u32,
}

impl PackedPayload {
    #[must_use]
    pub fn decode(&self) -> String {
        decode(&self.encoded, &self.alphabet, self.offset, self.base)
    }
}

/// Finds the packed call in a page body, trying the double-quoted form first.
#[must_use]
pub fn find_packed_payload(body: &str) -> Option<PackedPayload> {
    let flattened: String = body.chars().filter(|c| *c != '\n' && *c != '\r').collect();

    [double_quoted_regex(), single_quoted_regex()]
        .into_iter()
        .find_map(|re| {
            re.captures_iter(&flattened).find_map(|caps| {
                let encoded = caps.get(1)?.as_str();
                if encoded.len() <= MIN_PAYLOAD_LEN {
                    return None;
                }
                Some(PackedPayload {
                    encoded: encoded.to_string(),
                    alphabet: caps.get(2)?.as_str().to_string(),
                    offset: caps.get(3)?.as_str().parse().ok()?,
                    base: caps.get(4)?.as_str().parse().ok()?,
                })
            })
        })
}

/// The form action URL and the hidden `_token` carried by a decoded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedForm {
    pub action: String,
    pub token: String,
}

#[must_use]
pub fn extract_form(decoded: &str) -> Option<DecodedForm> {
    static ACTION: OnceLock<Regex> = OnceLock::new();
    static TOKEN: OnceLock<Regex> = OnceLock::new();

    let action = get_regex(&ACTION, r#"["'](https?://[^"']+)["']"#)
        .captures(decoded)?
        .get(1)?
        .as_str();
    let token = get_regex(&TOKEN, r#"name=["']_token["'][^>]*?value=["']([^"']+)["']"#)
        .captures(decoded)?
        .get(1)?
        .as_str();
    Some(DecodedForm {
        action: action.to_string(),
        token: token.to_string(),
    })
}
