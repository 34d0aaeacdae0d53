// src/utils/sanitize.rs

use std::collections::HashSet;

/// Encoded markup loses one layer per pass; deeper nesting stays escaped.
const MAX_PASSES: usize = 8;

/// Strips markup from teacher-authored text (titles, questions, options).
///
/// Quiz text is rendered as plain text on every screen, so no tags are kept
/// at all. Each pass lets ammonia parse and strip the text, then undoes its
/// output escaping so "A & B" stays readable. Passes repeat until the text
/// is stable, so entity-encoded tags such as `&lt;script&gt;` are stripped
/// like real ones instead of being decoded back into markup.
pub fn clean_text(input: &str) -> String {
    let mut cleaner = ammonia::Builder::default();
    cleaner.tags(HashSet::new());

    let mut text = input.to_string();
    for _ in 0..MAX_PASSES {
        let escaped = cleaner.clean(&text).to_string();
        let plain = unescape(&escaped);
        if plain == text {
            return plain.trim().to_string();
        }
        text = plain;
    }
    cleaner.clean(&text).to_string().trim().to_string()
}

pub fn clean_options(options: Option<Vec<String>>) -> Option<Vec<String>> {
    options.map(|opts| opts.iter().map(|o| clean_text(o)).collect())
}

/// Reverses ammonia's text escaping in one left-to-right pass, so `&amp;lt;`
/// becomes `&lt;` and never `<`.
fn unescape(text: &str) -> String {
    const ENTITIES: [(&str, char); 6] = [
        ("&amp;", '&'),
        ("&lt;", '<'),
        ("&gt;", '>'),
        ("&quot;", '"'),
        ("&#39;", '\''),
        ("&nbsp;", '\u{a0}'),
    ];

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        match ENTITIES.iter().find(|(name, _)| rest.starts_with(name)) {
            Some((name, c)) => {
                out.push(*c);
                rest = &rest[name.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripts_are_removed() {
        assert_eq!(clean_text("<script>alert(1)</script>Thủ đô?"), "Thủ đô?");
        assert_eq!(clean_text("<b>2</b> + 2"), "2 + 2");
    }

    #[test]
    fn encoded_markup_is_stripped_too() {
        assert_eq!(clean_text("&lt;script&gt;alert(1)&lt;/script&gt;"), "");
        assert_eq!(clean_text("&#60;b&#62;bold&#x3C;/b&#x3E; text"), "bold text");
        assert_eq!(clean_text("&amp;lt;script&amp;gt;alert(1)&amp;lt;/script&amp;gt;"), "");
    }

    #[test]
    fn output_is_stable() {
        for input in ["&amp;lt;b&amp;gt;x", "x < y", "Tom &amp; Jerry", "&lt;i&gt;A&lt;/i&gt; & B"] {
            let once = clean_text(input);
            assert_eq!(clean_text(&once), once, "input {:?}", input);
        }
    }

    #[test]
    fn plain_text_survives() {
        assert_eq!(clean_text("  A & B  "), "A & B");
        assert_eq!(clean_text("x < y"), "x < y");
        assert_eq!(clean_text("Tom &amp; Jerry"), "Tom & Jerry");
        assert_eq!(clean_text("a\u{a0}b"), "a\u{a0}b");
        assert_eq!(clean_text("AT&T; R&D"), "AT&T; R&D");
    }

    #[test]
    fn unescape_is_single_pass() {
        assert_eq!(unescape("&amp;lt;"), "&lt;");
        assert_eq!(unescape("&nbsp;&quot;&#39;"), "\u{a0}\"'");
        assert_eq!(unescape("&unknown; & x"), "&unknown; & x");
    }
}
