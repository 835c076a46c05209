//! Escaping for labels written into SVG markup and for the JSON payload
//! inlined into the interactive document.

/// Characters XML 1.0 allows in documents.
fn allowed_in_xml(c: char) -> bool {
    matches!(
        u32::from(c),
        0x09 | 0x0A | 0x0D | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x10000..=0x10FFFF
    )
}

fn escape_with(text: &str, replacement: impl Fn(char) -> Option<&'static str>) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match replacement(c) {
            Some(entity) => out.push_str(entity),
            None => out.push(c),
        }
    }
    out
}

/// Escape a member label or title for element text and attribute values.
/// Characters XML cannot carry are dropped.
pub fn escape_xml(text: &str) -> String {
    let kept: String = text.chars().filter(|&c| allowed_in_xml(c)).collect();
    escape_with(&kept, |c| match c {
        '&' => Some("&amp;"),
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '"' => Some("&quot;"),
        '\'' => Some("&apos;"),
        _ => None,
    })
}

/// Make serialized JSON safe inside an inline `<script>` element.
///
/// The result is still valid JSON and a valid JavaScript expression.
pub fn escape_script_json(json: &str) -> String {
    escape_with(json, |c| match c {
        '<' => Some("\\u003c"),
        '>' => Some("\\u003e"),
        '&' => Some("\\u0026"),
        '\u{2028}' => Some("\\u2028"),
        '\u{2029}' => Some("\\u2029"),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::{escape_script_json, escape_xml};

    #[test]
    fn labels_lose_control_characters() {
        assert_eq!(escape_xml("Ann\u{0007}a\u{000C} Lee"), "Anna Lee");
        assert_eq!(escape_xml("a\tb\nc"), "a\tb\nc");
    }

    #[test]
    fn markup_characters_become_entities() {
        assert_eq!(
            escape_xml(r#"R&D <"Ops"> 'East'"#),
            "R&amp;D &lt;&quot;Ops&quot;&gt; &apos;East&apos;"
        );
    }

    #[test]
    fn script_json_cannot_close_the_script_element() {
        let json = serde_json::to_string("</script><b>&\u{2028}").unwrap();
        let escaped = escape_script_json(&json);
        assert!(!escaped.contains("</script>"));
        assert!(!escaped.contains('\u{2028}'));
        let back: String = serde_json::from_str(&escaped).unwrap();
        assert_eq!(back, "</script><b>&\u{2028}");
    }
}
