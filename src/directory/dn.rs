//! Distinguished Name helpers.
//!
//! # Responsibilities
//! - Normalize DNs into a stable comparison/cache key
//! - Parse DNs into RDNs (RFC 4514 escapes, multi-valued RDNs)
//! - Extract attribute values (e.g. `cn`) from any RDN position
//! - Derive role names from group DNs
//!
//! # Design Decisions
//! - Attribute types compare case-insensitively; values keep their case
//! - `normalize` is purely textual: it does not unescape `\,` or hex pairs
//!   and it lowercases values too. Cache keys depend on that exact output.

/// A single `type=value` pair inside an RDN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub attr_type: String,
    pub value: String,
}

/// One RDN; more than one attribute when the RDN is multi-valued (`cn=a+uid=b`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rdn {
    pub attributes: Vec<Attribute>,
}

/// Error produced when a DN cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DnParseError {
    #[error("attribute at position {0} has no '='")]
    MissingEquals(usize),

    #[error("empty attribute type at position {0}")]
    EmptyType(usize),

    #[error("dangling escape at end of DN")]
    DanglingEscape,

    #[error("invalid escape sequence at position {0}")]
    InvalidEscape(usize),

    #[error("unterminated quoted value")]
    UnterminatedQuote,

    #[error("unexpected character after quoted value at position {0}")]
    TrailingAfterQuote(usize),

    #[error("escaped bytes are not valid UTF-8")]
    InvalidUtf8,
}

fn is_dn_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0B' | '\x0C')
}

/// Normalize a DN for comparison and caching.
///
/// Returns `None` for empty or whitespace-only input. Otherwise trims,
/// collapses whitespace runs to one space, drops whitespace next to `,` and
/// `=`, and lowercases everything.
pub fn normalize(dn: &str) -> Option<String> {
    let trimmed = dn.trim_matches(is_dn_whitespace);
    if trimmed.is_empty() {
        return None;
    }

    let mut collapsed = String::with_capacity(trimmed.len());
    let mut in_space = false;
    for c in trimmed.chars() {
        if is_dn_whitespace(c) {
            if !in_space {
                collapsed.push(' ');
                in_space = true;
            }
        } else {
            collapsed.push(c);
            in_space = false;
        }
    }

    let chars: Vec<char> = collapsed.chars().collect();
    let mut out = String::with_capacity(chars.len());
    for (i, &c) in chars.iter().enumerate() {
        if c == ' ' {
            let next_is_sep = matches!(chars.get(i + 1), Some(',') | Some('='));
            let prev_is_sep = matches!(out.chars().last(), Some(',') | Some('='));
            if next_is_sep || prev_is_sep {
                continue;
            }
        }
        out.push(c);
    }

    Some(out.to_lowercase())
}

/// Parse a DN into its RDNs, in the order they are written (leftmost first).
pub fn parse_dn(dn: &str) -> Result<Vec<Rdn>, DnParseError> {
    let chars: Vec<char> = dn.chars().collect();
    let mut rdns = Vec::new();

    if chars.iter().all(|c| is_dn_whitespace(*c)) {
        return Ok(rdns);
    }

    let mut pos = 0;
    let mut current = Rdn { attributes: Vec::new() };

    loop {
        let (attribute, next) = parse_attribute(&chars, pos)?;
        current.attributes.push(attribute);
        pos = next;

        match chars.get(pos) {
            None => {
                rdns.push(current);
                break;
            }
            Some('+') => {
                pos += 1;
            }
            Some(',') | Some(';') => {
                rdns.push(std::mem::replace(&mut current, Rdn { attributes: Vec::new() }));
                pos += 1;
            }
            Some(_) => return Err(DnParseError::TrailingAfterQuote(pos)),
        }
    }

    Ok(rdns)
}

/// Parse one `type=value` starting at `pos`; returns the index of the
/// terminating separator (or end of input).
fn parse_attribute(chars: &[char], mut pos: usize) -> Result<(Attribute, usize), DnParseError> {
    let start = pos;
    let mut attr_type = String::new();
    loop {
        match chars.get(pos) {
            None | Some(',') | Some(';') | Some('+') => return Err(DnParseError::MissingEquals(start)),
            Some('=') => {
                pos += 1;
                break;
            }
            Some(c) => {
                attr_type.push(*c);
                pos += 1;
            }
        }
    }

    let attr_type = attr_type.trim_matches(is_dn_whitespace).to_string();
    if attr_type.is_empty() {
        return Err(DnParseError::EmptyType(start));
    }

    while matches!(chars.get(pos), Some(c) if *c == ' ') {
        pos += 1;
    }

    let (value, pos) = if chars.get(pos) == Some(&'"') {
        parse_quoted_value(chars, pos + 1)?
    } else {
        parse_plain_value(chars, pos)?
    };

    Ok((Attribute { attr_type, value }, pos))
}

fn parse_plain_value(chars: &[char], mut pos: usize) -> Result<(String, usize), DnParseError> {
    let mut bytes: Vec<u8> = Vec::new();
    // Length of `bytes` up to the last character that is not an unescaped space.
    let mut significant = 0;

    while let Some(&c) = chars.get(pos) {
        match c {
            ',' | ';' | '+' => break,
            '\\' => {
                pos = push_escape(chars, pos, &mut bytes)?;
                significant = bytes.len();
            }
            _ => {
                let mut buf = [0u8; 4];
                bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                if c != ' ' {
                    significant = bytes.len();
                }
                pos += 1;
            }
        }
    }

    bytes.truncate(significant);
    let value = String::from_utf8(bytes).map_err(|_| DnParseError::InvalidUtf8)?;
    Ok((value, pos))
}

fn parse_quoted_value(chars: &[char], mut pos: usize) -> Result<(String, usize), DnParseError> {
    let mut bytes: Vec<u8> = Vec::new();
    loop {
        match chars.get(pos) {
            None => return Err(DnParseError::UnterminatedQuote),
            Some('"') => {
                pos += 1;
                break;
            }
            Some('\\') => {
                pos = push_escape(chars, pos, &mut bytes)?;
            }
            Some(&c) => {
                let mut buf = [0u8; 4];
                bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                pos += 1;
            }
        }
    }

    while matches!(chars.get(pos), Some(c) if is_dn_whitespace(*c)) {
        pos += 1;
    }
    match chars.get(pos) {
        None | Some(',') | Some(';') | Some('+') => {}
        Some(_) => return Err(DnParseError::TrailingAfterQuote(pos)),
    }

    let value = String::from_utf8(bytes).map_err(|_| DnParseError::InvalidUtf8)?;
    Ok((value, pos))
}

/// Decode the escape at `chars[pos] == '\\'`, returning the index after it.
fn push_escape(chars: &[char], pos: usize, bytes: &mut Vec<u8>) -> Result<usize, DnParseError> {
    let first = *chars.get(pos + 1).ok_or(DnParseError::DanglingEscape)?;

    if let (Some(hi), Some(lo)) = (first.to_digit(16), chars.get(pos + 2).and_then(|c| c.to_digit(16))) {
        bytes.push((hi * 16 + lo) as u8);
        return Ok(pos + 3);
    }

    if matches!(first, ',' | '=' | '+' | '<' | '>' | '#' | ';' | '\\' | '"' | ' ') {
        bytes.push(first as u8);
        return Ok(pos + 2);
    }

    Err(DnParseError::InvalidEscape(pos))
}

/// Find the first value of `attribute_type` in any RDN of `dn`.
///
/// Returns `None` for blank input, an unparsable DN, or a missing attribute.
pub fn extract_attribute(dn: &str, attribute_type: &str) -> Option<String> {
    if dn.trim().is_empty() || attribute_type.trim().is_empty() {
        return None;
    }

    let rdns = match parse_dn(dn) {
        Ok(rdns) => rdns,
        Err(e) => {
            tracing::debug!(dn = %dn, error = %e, "Invalid DN format for attribute extraction");
            return None;
        }
    };

    rdns.into_iter()
        .flat_map(|rdn| rdn.attributes)
        .find(|a| a.attr_type.eq_ignore_ascii_case(attribute_type.trim()))
        .map(|a| a.value)
}

/// Extract the common name from a DN, wherever the `cn` RDN sits.
pub fn extract_cn(dn: &str) -> Option<String> {
    extract_attribute(dn, "cn")
}

/// Turn a group DN into a role name when its CN carries `prefix`.
pub fn extract_role_name(group_dn: &str, prefix: &str) -> Option<String> {
    extract_cn(group_dn).filter(|cn| cn.starts_with(prefix))
}

/// Append `base_dn` unless `dn` already ends with it.
pub fn ensure_full_dn(dn: &str, base_dn: &str) -> String {
    let (Some(norm_dn), Some(norm_base)) = (normalize(dn), normalize(base_dn)) else {
        return dn.to_string();
    };
    if norm_dn == norm_base || norm_dn.ends_with(&format!(",{}", norm_base)) {
        dn.to_string()
    } else {
        format!("{},{}", dn.trim(), base_dn.trim())
    }
}
