//! Line helpers shared by view rendering and edit snippets.

use std::fmt::Write as _;

/// Split `text` into lines, reporting whether it ended with a newline.
///
/// Unlike `str::lines`, a lone `"\n"` yields one empty line and `"\r"` is kept
/// as content, so joining the lines with `'\n'` and re-appending the trailing
/// newline reproduces the input exactly.
pub fn split_lines(text: &str) -> (Vec<&str>, bool) {
    if text.is_empty() {
        return (Vec::new(), false);
    }

    let trailing_newline = text.ends_with('\n');
    let body = if trailing_newline {
        &text[..text.len() - 1]
    } else {
        text
    };
    (body.split('\n').collect(), trailing_newline)
}

/// Render lines in `cat -n` style, numbering from `first_line` (1-based).
pub fn number_lines<'a>(lines: impl IntoIterator<Item = &'a str>, first_line: usize) -> String {
    let mut rendered = String::new();
    for (offset, line) in lines.into_iter().enumerate() {
        if offset > 0 {
            rendered.push('\n');
        }
        let _ = write!(rendered, "{:>6}\t{line}", first_line + offset);
    }
    rendered
}
