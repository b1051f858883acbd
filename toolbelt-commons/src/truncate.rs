//! Bounding the size of text handed back to the agent.

use std::borrow::Cow;

/// Default cap on returned text, in characters.
pub const DEFAULT_MAX_RESPONSE_CHARS: usize = 16_000;

/// Clip `text` to at most `max_chars` characters of content.
///
/// The cut lands on the last line boundary at or before the limit (or at the
/// limit itself when the first line is already too long), and a notice naming
/// the omitted character count is appended. Text within the limit is returned
/// untouched.
pub fn maybe_truncate(text: &str, max_chars: usize) -> Cow<'_, str> {
    truncate_with_dropped(text, max_chars, 0)
}

/// Like [`maybe_truncate`] for text whose tail was already discarded.
///
/// `dropped_chars` is added to the omitted count, and a non-zero value always
/// produces the notice even when `text` itself fits.
pub fn truncate_with_dropped(text: &str, max_chars: usize, dropped_chars: usize) -> Cow<'_, str> {
    let limit_byte = text.char_indices().nth(max_chars).map(|(index, _)| index);
    if limit_byte.is_none() && dropped_chars == 0 {
        return Cow::Borrowed(text);
    }

    let kept = match limit_byte {
        Some(limit_byte) => {
            let head = &text[..limit_byte];
            match head.rfind('\n') {
                Some(newline) => &head[..=newline],
                None => head,
            }
        }
        None => text,
    };

    let total_chars = text.chars().count();
    let omitted = total_chars - kept.chars().count() + dropped_chars;

    let mut clipped = String::with_capacity(kept.len() + 160);
    clipped.push_str(kept);
    if !kept.is_empty() && !kept.ends_with('\n') {
        clipped.push('\n');
    }
    clipped.push_str(&truncation_notice(omitted));
    Cow::Owned(clipped)
}

fn truncation_notice(omitted: usize) -> String {
    format!(
        "<response clipped: {omitted} characters omitted. Request a narrower view_range or filter the command output (e.g. with grep, head or tail) to see the rest.>"
    )
}
