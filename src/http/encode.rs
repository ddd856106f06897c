//! Text encoders used when echoing request data back to a client.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

/// Characters that are not valid anywhere in a URL and must be encoded.
///
/// Everything else in the printable ASCII range is kept as-is, including
/// reserved delimiters, so an already well-formed URL passes through untouched.
const URL_UNSAFE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Escapes the five HTML-significant characters.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
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

/// Percent-encodes a URL without double-encoding existing escapes.
///
/// A `%` that already starts a `%XX` sequence is preserved; a stray `%` becomes `%25`.
pub fn encode_url(url: &str) -> String {
    let bytes = url.as_bytes();
    let mut out = String::with_capacity(url.len());
    let mut start = 0;

    for (i, &b) in bytes.iter().enumerate() {
        if b != b'%' {
            continue;
        }

        out.extend(utf8_percent_encode(&url[start..i], URL_UNSAFE));
        let escaped = bytes.len() > i + 2
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit();
        out.push_str(if escaped { "%" } else { "%25" });
        start = i + 1;
    }

    out.extend(utf8_percent_encode(&url[start..], URL_UNSAFE));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn keeps_reserved_characters() {
        assert_eq!(encode_url("/foo/bar?x=1&y=[2]#top"), "/foo/bar?x=1&y=[2]#top");
    }

    #[test]
    fn encodes_unsafe_characters() {
        assert_eq!(encode_url("/a b/<c>"), "/a%20b/%3Cc%3E");
        assert_eq!(encode_url("/caf\u{e9}"), "/caf%C3%A9");
        assert_eq!(encode_url("/a|b^c\\d"), "/a%7Cb%5Ec%5Cd");
    }

    #[test]
    fn does_not_double_encode() {
        assert_eq!(encode_url("/a%20b"), "/a%20b");
        assert_eq!(encode_url("/100%"), "/100%25");
        assert_eq!(encode_url("/%zz"), "/%25zz");
        assert_eq!(encode_url("/%4"), "/%254");
    }
}
