//! Flat JSON field extraction.
//!
//! The control API exchanges single-level `{"key":value,...}` objects only,
//! so this is a dedicated key:value tokenizer with typed getters rather
//! than a general JSON parser. Values never contain unescaped `,` or `}`.

use heapless::String;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum JsonError {
    Failed,
    MissingKey,
    InvalidType,
    InvalidInteger,
    InvalidFloat,
    InvalidBoolean,
    InvalidString,
    InvalidIpAddress,
}

impl JsonError {
    /// Stable message used verbatim in HTTP error bodies.
    pub(crate) fn message(self) -> &'static str {
        match self {
            JsonError::Failed => "JSON KO",
            JsonError::MissingKey => "JSON missing key",
            JsonError::InvalidType => "JSON invalid type",
            JsonError::InvalidInteger => "JSON invalid (int)",
            JsonError::InvalidFloat => "JSON invalid (float)",
            JsonError::InvalidBoolean => "JSON invalid (bool)",
            JsonError::InvalidString => "JSON invalid (str)",
            JsonError::InvalidIpAddress => "JSON invalid ip address",
        }
    }
}

pub(crate) type JsonResult<T> = Result<T, JsonError>;

/// Returns the raw text of the value bound to `key`: everything between
/// the `:` after the first occurrence of the quoted key (leading
/// whitespace skipped) and the next `,` or `}`.
pub(crate) fn extract_value<'a>(line: &'a str, key: &str) -> JsonResult<&'a str> {
    let start = find_quoted_key(line.as_bytes(), key.as_bytes()).ok_or(JsonError::MissingKey)?;
    let after_key = &line[start..];
    let colon = after_key.find(':').ok_or(JsonError::MissingKey)?;
    let value = after_key[colon + 1..].trim_start();
    let end = value.find([',', '}']).ok_or(JsonError::MissingKey)?;
    Ok(&value[..end])
}

/// Only `true`/`false` (case-insensitive) are booleans.
pub(crate) fn get_bool(line: &str, key: &str) -> JsonResult<bool> {
    let raw = extract_value(line, key)?;
    if raw.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(JsonError::InvalidBoolean)
    }
}

/// Optional leading `-`, then digits, nothing else. Decimal accumulation
/// wraps on overflow and `-n` maps to its two's-complement bit pattern.
pub(crate) fn get_u32(line: &str, key: &str) -> JsonResult<u32> {
    let raw = strip_optional_quotes(extract_value(line, key)?);
    if !is_strict_integer(raw) {
        return Err(JsonError::InvalidInteger);
    }
    Ok(parse_wrapping_u32(raw))
}

/// Fixed-point getter: the decimal value scaled by 1000 and truncated to
/// `u32`, so `"2.5"` decodes to `2500`. Fraction digits beyond the third
/// (below one millisecond) are dropped.
pub(crate) fn get_millis(line: &str, key: &str) -> JsonResult<u32> {
    let raw = strip_optional_quotes(extract_value(line, key)?);
    if !is_strict_float(raw) {
        return Err(JsonError::InvalidFloat);
    }
    Ok(parse_wrapping_millis(raw))
}

/// The raw value must be double-quoted; the content is copied out with
/// the quotes stripped. Content that does not fit in `N` is `Failed`.
pub(crate) fn get_str<const N: usize>(line: &str, key: &str) -> JsonResult<String<N>> {
    let raw = extract_value(line, key)?;
    let content = strip_quotes(raw).ok_or(JsonError::InvalidString)?;
    let mut out = String::new();
    out.push_str(content).map_err(|_| JsonError::Failed)?;
    Ok(out)
}

/// Quoted dotted-quad, each octet `0..=255` with no leading zeros,
/// packed with octet `a` of `a.b.c.d` in the low byte.
pub(crate) fn get_ipv4(line: &str, key: &str) -> JsonResult<u32> {
    let raw = extract_value(line, key)?;
    let content = strip_quotes(raw).ok_or(JsonError::InvalidIpAddress)?;
    parse_dotted_quad(content).ok_or(JsonError::InvalidIpAddress)
}

fn find_quoted_key(line: &[u8], key: &[u8]) -> Option<usize> {
    if key.is_empty() {
        return None;
    }
    let quoted_len = key.len() + 2;
    line.windows(quoted_len)
        .position(|window| {
            window[0] == b'"' && window[quoted_len - 1] == b'"' && &window[1..quoted_len - 1] == key
        })
        .map(|idx| idx + quoted_len)
}

fn strip_quotes(raw: &str) -> Option<&str> {
    let bytes = raw.as_bytes();
    if bytes.len() >= 2 && bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"' {
        Some(&raw[1..raw.len() - 1])
    } else {
        None
    }
}

fn strip_optional_quotes(raw: &str) -> &str {
    strip_quotes(raw).unwrap_or(raw)
}

fn is_strict_integer(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    !digits.is_empty() && digits.bytes().all(|byte| byte.is_ascii_digit())
}

fn is_strict_float(value: &str) -> bool {
    let body = value.strip_prefix('-').unwrap_or(value);
    let mut has_digit = false;
    let mut has_dot = false;
    for byte in body.bytes() {
        match byte {
            b'.' => {
                if has_dot {
                    return false;
                }
                has_dot = true;
            }
            b'0'..=b'9' => has_digit = true,
            _ => return false,
        }
    }
    has_digit
}

fn accumulate_wrapping(digits: &str) -> u32 {
    digits.bytes().fold(0u32, |acc, byte| {
        acc.wrapping_mul(10).wrapping_add((byte - b'0') as u32)
    })
}

fn parse_wrapping_u32(value: &str) -> u32 {
    match value.strip_prefix('-') {
        Some(digits) => accumulate_wrapping(digits).wrapping_neg(),
        None => accumulate_wrapping(value),
    }
}

fn parse_wrapping_millis(value: &str) -> u32 {
    let (negative, body) = match value.strip_prefix('-') {
        Some(body) => (true, body),
        None => (false, value),
    };
    let (whole, fraction) = match body.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (body, ""),
    };
    let mut scaled = accumulate_wrapping(whole).wrapping_mul(1000);
    let mut unit = 100u32;
    for byte in fraction.bytes().take(3) {
        scaled = scaled.wrapping_add((byte - b'0') as u32 * unit);
        unit /= 10;
    }
    if negative {
        scaled.wrapping_neg()
    } else {
        scaled
    }
}

fn parse_dotted_quad(text: &str) -> Option<u32> {
    let mut octets = [0u8; 4];
    let mut count = 0usize;
    for part in text.split('.') {
        if count == 4 {
            return None;
        }
        octets[count] = parse_octet(part)?;
        count += 1;
    }
    (count == 4).then(|| u32::from_le_bytes(octets))
}

fn parse_octet(part: &str) -> Option<u8> {
    if part.is_empty() || part.len() > 3 {
        return None;
    }
    if part.len() > 1 && part.starts_with('0') {
        return None;
    }
    if !part.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    let value = accumulate_wrapping(part);
    (value <= 255).then_some(value as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str =
        "{\"picture\":5,\"exposure\":2.5,\"name\":\"orion\",\"armed\":true,\"addr\":\"172.24.1.1\"}";

    #[test]
    fn extracts_raw_value_up_to_delimiter() {
        assert_eq!(extract_value(LINE, "picture"), Ok("5"));
        assert_eq!(extract_value(LINE, "addr"), Ok("\"172.24.1.1\""));
    }

    #[test]
    fn extract_skips_whitespace_after_colon() {
        assert_eq!(extract_value("{\"picture\":  7}", "picture"), Ok("7"));
    }

    #[test]
    fn extract_reports_missing_key() {
        assert_eq!(extract_value(LINE, "missing"), Err(JsonError::MissingKey));
        // A bare substring match is not a key.
        assert_eq!(extract_value("{\"pictures\":5}", "picture"), Err(JsonError::MissingKey));
    }

    #[test]
    fn extract_requires_closing_delimiter() {
        assert_eq!(extract_value("{\"picture\":5", "picture"), Err(JsonError::MissingKey));
    }

    #[test]
    fn boolean_accepts_true_false_any_case() {
        assert_eq!(get_bool(LINE, "armed"), Ok(true));
        assert_eq!(get_bool("{\"armed\":FALSE}", "armed"), Ok(false));
    }

    #[test]
    fn boolean_rejects_everything_else() {
        assert_eq!(get_bool("{\"armed\":1}", "armed"), Err(JsonError::InvalidBoolean));
        assert_eq!(get_bool("{\"armed\":yes}", "armed"), Err(JsonError::InvalidBoolean));
    }

    #[test]
    fn integer_decodes_digits_only() {
        assert_eq!(get_u32(LINE, "picture"), Ok(5));
        assert_eq!(get_u32("{\"picture\":\"12\"}", "picture"), Ok(12));
    }

    #[test]
    fn integer_rejects_mixed_text() {
        assert_eq!(get_u32("{\"picture\":5x}", "picture"), Err(JsonError::InvalidInteger));
        assert_eq!(get_u32("{\"picture\":-}", "picture"), Err(JsonError::InvalidInteger));
        assert_eq!(get_u32("{\"picture\":2.5}", "picture"), Err(JsonError::InvalidInteger));
    }

    #[test]
    fn integer_negative_wraps_like_a_cast() {
        assert_eq!(get_u32("{\"picture\":-1}", "picture"), Ok(u32::MAX));
    }

    #[test]
    fn millis_scales_by_one_thousand() {
        assert_eq!(get_millis(LINE, "exposure"), Ok(2500));
        assert_eq!(get_millis("{\"delay\":1}", "delay"), Ok(1000));
        assert_eq!(get_millis("{\"delay\":0.25}", "delay"), Ok(250));
    }

    #[test]
    fn millis_truncates_below_one_millisecond() {
        assert_eq!(get_millis("{\"delay\":0.0019}", "delay"), Ok(1));
    }

    #[test]
    fn millis_rejects_double_dot_and_bare_dot() {
        assert_eq!(get_millis("{\"delay\":1.2.3}", "delay"), Err(JsonError::InvalidFloat));
        assert_eq!(get_millis("{\"delay\":.}", "delay"), Err(JsonError::InvalidFloat));
        assert_eq!(get_millis("{\"delay\":fast}", "delay"), Err(JsonError::InvalidFloat));
    }

    #[test]
    fn string_strips_quotes() {
        let name: String<16> = get_str(LINE, "name").unwrap();
        assert_eq!(name.as_str(), "orion");
    }

    #[test]
    fn string_requires_quotes() {
        assert_eq!(get_str::<16>("{\"name\":orion}", "name"), Err(JsonError::InvalidString));
    }

    #[test]
    fn string_too_long_for_destination_fails() {
        assert_eq!(get_str::<3>(LINE, "name"), Err(JsonError::Failed));
    }

    #[test]
    fn ipv4_packs_first_octet_low() {
        assert_eq!(get_ipv4(LINE, "addr"), Ok(u32::from_le_bytes([172, 24, 1, 1])));
        assert_eq!(get_ipv4("{\"addr\":\"0.0.0.0\"}", "addr"), Ok(0));
    }

    #[test]
    fn ipv4_rejects_leading_zeros_and_range() {
        assert_eq!(get_ipv4("{\"addr\":\"172.024.1.1\"}", "addr"), Err(JsonError::InvalidIpAddress));
        assert_eq!(get_ipv4("{\"addr\":\"256.0.0.1\"}", "addr"), Err(JsonError::InvalidIpAddress));
        assert_eq!(get_ipv4("{\"addr\":\"1.2.3\"}", "addr"), Err(JsonError::InvalidIpAddress));
        assert_eq!(get_ipv4("{\"addr\":\"1.2.3.4.5\"}", "addr"), Err(JsonError::InvalidIpAddress));
        assert_eq!(get_ipv4("{\"addr\":10}", "addr"), Err(JsonError::InvalidIpAddress));
    }

    #[test]
    fn repeated_extraction_is_stateless() {
        for _ in 0..3 {
            assert_eq!(get_u32(LINE, "picture"), Ok(5));
        }
    }
}
