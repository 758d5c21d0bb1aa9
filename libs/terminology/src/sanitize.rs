//! Display text hygiene
//!
//! Source documents and catalogues are untrusted; anything that reaches a
//! `ResolvedTerm.display` passes through here so downstream rendering never
//! sees raw angle-bracket markup or entity soup.

use html_escape::decode_html_entities;

/// Clean a display string for presentation.
///
/// Decodes HTML entities, strips any tag-like `<...>` runs, and collapses
/// whitespace. Returns `None` when nothing displayable survives, which
/// callers treat the same as an absent display.
pub fn clean_display(raw: &str) -> Option<String> {
    let decoded = decode_html_entities(raw);
    let stripped = strip_tags(&decoded);
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for ch in input.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                // Tag boundaries act as word breaks so "<br>"-joined words
                // do not fuse together.
                out.push(' ');
            }
            '>' => {}
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_plain_text_through() {
        assert_eq!(clean_display("Kiwi fruit").as_deref(), Some("Kiwi fruit"));
    }

    #[test]
    fn strips_markup() {
        assert_eq!(
            clean_display("<b>Penicillin</b> allergy").as_deref(),
            Some("Penicillin allergy")
        );
    }

    #[test]
    fn decodes_entities() {
        assert_eq!(
            clean_display("Crohn&#39;s disease").as_deref(),
            Some("Crohn's disease")
        );
    }

    #[test]
    fn whitespace_only_is_absent() {
        assert_eq!(clean_display("   \t\n"), None);
        assert_eq!(clean_display("<br/>"), None);
    }

    #[test]
    fn collapses_internal_whitespace() {
        assert_eq!(
            clean_display("  Propensity   to\nadverse reactions ").as_deref(),
            Some("Propensity to adverse reactions")
        );
    }
}
