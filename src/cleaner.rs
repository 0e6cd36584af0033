//! Recognizer output cleanup
//!
//! OCR on bills picks up a lot of junk: table rules, dotted leaders, stray
//! punctuation from stamps and logos. [`clean_text`] drops those lines and
//! keeps everything else in order.

/// Remove noise lines from multi-line text.
///
/// A line is dropped when, after trimming, it is empty, consists of a
/// single repeated character (`-----`, `=====`), or more than half of its
/// characters are not alphanumeric. Surviving lines are trimmed and joined
/// with `\n`. Lines end at any Unicode line terminator, not only `\n`.
pub fn clean_text(text: &str) -> String {
    text.split(is_line_break)
        .map(str::trim)
        .filter(|line| !is_noise(line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Line terminators OCR output and PDF text layers are known to contain
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Whether a trimmed line should be discarded
fn is_noise(line: &str) -> bool {
    let mut chars = line.chars();
    let Some(first) = chars.next() else {
        return true;
    };

    if chars.clone().all(|c| c == first) {
        return true;
    }

    let total = line.chars().count();
    let non_alnum = line.chars().filter(|c| !c.is_alphanumeric()).count();
    non_alnum * 2 > total
}
