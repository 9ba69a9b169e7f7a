use super::types::{InputModificationKind, SanitizedInput};

/// Maximum query length in characters when no configuration is given.
pub const MAX_QUERY_LENGTH: usize = 2_000;

/// Clean a raw query before any stage sees it.
///
/// Invisible characters are removed first so "sui\u{200B}cide" cannot
/// slip past the crisis lexicon.
pub fn sanitize_query(raw_query: &str, max_chars: usize) -> SanitizedInput {
    let mut modifications = Vec::new();

    let text = remove_invisible_unicode(raw_query);
    if text.len() != raw_query.len() {
        modifications.push(InputModificationKind::InvisibleUnicodeRemoved);
    }

    let before = text.len();
    let mut text = remove_control_characters(&text);
    if text.len() != before {
        modifications.push(InputModificationKind::ControlCharacterRemoved);
    }

    if text.chars().count() > max_chars {
        text = truncate_at_word_boundary(&text, max_chars);
        modifications.push(InputModificationKind::ExcessiveLengthTruncated);
    }

    SanitizedInput {
        text,
        was_modified: !modifications.is_empty(),
        modifications,
    }
}

/// Remove zero-width and invisible Unicode characters.
pub fn remove_invisible_unicode(text: &str) -> String {
    text.chars()
        .filter(|c| {
            !matches!(
                *c,
                '\u{200B}'..='\u{200F}'  // Zero-width chars
                | '\u{202A}'..='\u{202E}' // Directional formatting
                | '\u{2060}'..='\u{2064}' // Invisible operators
                | '\u{2066}'..='\u{2069}' // Directional isolates
                | '\u{FEFF}'              // BOM
                | '\u{00AD}'              // Soft hyphen
                | '\u{034F}'              // Combining grapheme joiner
                | '\u{061C}'              // Arabic letter mark
                | '\u{180E}'              // Mongolian vowel separator
            )
        })
        .collect()
}

/// Remove control characters except newline and tab.
fn remove_control_characters(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

/// Truncate to at most `max_chars` characters, backing up to whitespace.
fn truncate_at_word_boundary(text: &str, max_chars: usize) -> String {
    let cut = match text.char_indices().nth(max_chars) {
        Some((byte, _)) => byte,
        None => return text.to_string(),
    };
    let truncated = &text[..cut];
    match truncated.rfind(char::is_whitespace) {
        Some(pos) if pos > 0 => truncated[..pos].to_string(),
        _ => truncated.to_string(),
    }
}
