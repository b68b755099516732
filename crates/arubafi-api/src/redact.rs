//! Secret scrubbing for anything that ends up in an error or a log line.

/// Names whose values are masked wherever they appear as `name=value`,
/// `name: value` or `"name": "value"`. Longer names first, so that
/// `access_token` is matched before `token`.
const SENSITIVE_NAMES: &[&str] = &[
    "refresh_token",
    "access_token",
    "client_secret",
    "credential_1",
    "X-CSRF-Token",
    "X-BISCOTTI",
    "UIDARUBA",
    "password",
    "token",
];

/// Maximum length, in characters, of a body excerpt attached to an error.
pub(crate) const EXCERPT_CHARS: usize = 200;

const MASK: &str = "***";

/// Mask the values of every known auth name in `text`. Matching is
/// case-insensitive.
pub(crate) fn redact(text: &str) -> String {
    let lower = text.to_ascii_lowercase();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < text.len() {
        if let Some((value_start, value_end)) = match_secret(text, &lower, i) {
            out.push_str(&text[i..value_start]);
            out.push_str(MASK);
            i = value_end;
            continue;
        }
        let Some(ch) = text[i..].chars().next() else {
            break;
        };
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

/// Redacted, length-bounded excerpt of a response body.
pub(crate) fn excerpt(body: &str) -> String {
    let redacted = redact(body.trim());
    match redacted.char_indices().nth(EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}…", &redacted[..cut]),
        None => redacted,
    }
}

/// If a sensitive name starts at byte `at`, return the byte span of its value.
fn match_secret(text: &str, lower: &str, at: usize) -> Option<(usize, usize)> {
    let preceded_by_word = text[..at]
        .chars()
        .next_back()
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
    if preceded_by_word {
        return None;
    }

    let name = SENSITIVE_NAMES
        .iter()
        .find(|name| lower[at..].starts_with(&name.to_ascii_lowercase()))?;

    let bytes = text.as_bytes();
    let mut pos = at + name.len();

    // Closing quote of a JSON key, then whitespace, then the separator.
    if matches!(bytes.get(pos), Some(b'"' | b'\'')) {
        pos += 1;
    }
    pos = skip_spaces(bytes, pos);
    if !matches!(bytes.get(pos), Some(b'=' | b':')) {
        return None;
    }
    pos = skip_spaces(bytes, pos + 1);

    let quote = match bytes.get(pos) {
        Some(&q @ (b'"' | b'\'')) => {
            pos += 1;
            Some(q)
        }
        _ => None,
    };

    let start = pos;
    while let Some(&b) = bytes.get(pos) {
        let stop = match quote {
            Some(q) => b == q,
            None => matches!(b, b'&' | b',' | b';' | b'"' | b'\'' | b'<' | b'>' | b'}' | b']')
                || b.is_ascii_whitespace(),
        };
        if stop {
            break;
        }
        pos += 1;
    }
    if pos == start {
        return None;
    }
    Some((start, pos))
}

fn skip_spaces(bytes: &[u8], mut pos: usize) -> usize {
    while bytes.get(pos).is_some_and(|b| *b == b' ' || *b == b'\t') {
        pos += 1;
    }
    pos
}
