// src/util.rs — Helpers for putting generated code and response bodies in logs

use std::borrow::Cow;

/// At most `max_chars` characters of `s`, with `…` appended when cut.
pub fn clip(s: &str, max_chars: usize) -> Cow<'_, str> {
    match s.char_indices().nth(max_chars) {
        None => Cow::Borrowed(s),
        Some((end, _)) => Cow::Owned(format!("{}…", &s[..end])),
    }
}

/// Multi-line text on one log line: newlines become ` ⏎ `, surrounding
/// blank space is dropped, then the result is clipped.
pub fn log_line(s: &str, max_chars: usize) -> String {
    let joined = s
        .trim()
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join(" ⏎ ");
    clip(&joined, max_chars).into_owned()
}
