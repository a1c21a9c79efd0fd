//! Fixed-width text tokens for steps and rows
//!
//! Samples, ornaments and patterns serialise each step/row as one dense token
//! of radix digits. Exports can be packed (trailing default entries dropped)
//! and parsing treats missing or malformed tokens as defaults, so a packed
//! export always round-trips.

/// Encode `value` as `width` lowercase digits in `radix` (2-36)
pub fn encode_digits(value: u32, radix: u32, width: usize) -> String {
    let mut digits = vec!['0'; width];
    let mut rest = value;
    for slot in digits.iter_mut().rev() {
        *slot = std::char::from_digit(rest % radix, radix).unwrap_or('0');
        rest /= radix;
    }
    digits.into_iter().collect()
}

/// Decode a run of radix digits (case-insensitive)
pub fn decode_digits(text: &str, radix: u32) -> Option<u32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return None;
    }
    u32::from_str_radix(text, radix).ok()
}

/// Decode the `width` characters at `start`, or `default` if missing/malformed
pub fn field(token: &str, start: usize, width: usize, radix: u32, default: u32) -> u32 {
    token
        .get(start..start + width)
        .and_then(|text| decode_digits(text, radix))
        .unwrap_or(default)
}

/// Sign-extend the low `bits` bits of `value`
pub fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

/// A step or row that has a dense token form
pub trait Token: Default + PartialEq + Sized {
    /// Encode as a fixed-width token
    fn encode(&self) -> String;

    /// Decode a token; malformed fields fall back to defaults
    fn decode(token: &str) -> Self;
}

/// Export `items[start..start + length]` as tokens
///
/// With `pack`, a trailing run of default entries is dropped.
pub fn export_tokens<T: Token>(
    items: &[T],
    start: usize,
    length: Option<usize>,
    pack: bool,
) -> Vec<String> {
    let start = start.min(items.len());
    let end = length
        .map_or(items.len(), |len| start.saturating_add(len))
        .min(items.len());
    let mut slice = &items[start..end];
    if pack {
        let default = T::default();
        while let Some((last, rest)) = slice.split_last() {
            if *last != default {
                break;
            }
            slice = rest;
        }
    }
    slice.iter().map(Token::encode).collect()
}

/// Parse tokens into `items[start..start + length]`
///
/// `length` defaults to the rest of `items`; positions without a token are
/// reset to defaults.
pub fn parse_tokens<T: Token, S: AsRef<str>>(
    items: &mut [T],
    tokens: &[S],
    start: usize,
    length: Option<usize>,
) {
    let start = start.min(items.len());
    let end = length
        .map_or(items.len(), |len| start.saturating_add(len))
        .min(items.len());
    for (i, item) in items[start..end].iter_mut().enumerate() {
        *item = tokens
            .get(i)
            .map_or_else(T::default, |token| T::decode(token.as_ref()));
    }
}
