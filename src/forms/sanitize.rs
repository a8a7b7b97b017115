//! Free-text cleanup and email syntax checks.
//!
//! `sanitize` is `escape_html(normalize(..))`. The pipeline only normalizes;
//! escaping happens once, when a value is interpolated into HTML.

/// Longest address accepted by [`is_valid_email`].
pub const MAX_EMAIL_LEN: usize = 254;

/// Trim, cap at `max_len` characters, then HTML-escape.
///
/// The cap applies to the raw text, so escaping can push the result past
/// `max_len`.
pub fn sanitize(text: &str, max_len: usize) -> String {
    escape_html(&normalize(text, max_len))
}

/// Trim surrounding whitespace and keep at most `max_len` characters.
pub fn normalize(text: &str, max_len: usize) -> String {
    text.trim().chars().take(max_len).collect()
}

/// Escape the five HTML-significant characters.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Permissive `local@domain.tld` check.
///
/// Accepts one run of non-space, non-`@` characters, an `@`, and a domain
/// part with at least one dot that is neither its first nor last character.
pub fn is_valid_email(s: &str) -> bool {
    if s.len() > MAX_EMAIL_LEN {
        return false;
    }

    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };

    let plain = |part: &str| !part.is_empty() && !part.chars().any(|c| c.is_whitespace() || c == '@');
    if !plain(local) || !plain(domain) {
        return false;
    }

    // Some dot must split the domain into two non-empty halves.
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}
