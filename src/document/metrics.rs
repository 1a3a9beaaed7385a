//! Text measurement for the two standard fonts documents use.
//!
//! Widths are Helvetica / Helvetica-Bold advance widths in 1/1000 em for
//! printable ASCII. Anything else is measured as a lowercase letter.

/// Advance widths for `' '..='~'`.
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

fn char_units(c: char, bold: bool) -> u16 {
    let table = if bold { &HELVETICA_BOLD } else { &HELVETICA };
    match c {
        ' '..='~' => table[c as usize - 0x20],
        _ => table['n' as usize - 0x20],
    }
}

/// Width of `text` in points at `size`.
pub fn text_width(text: &str, size: f32, bold: bool) -> f32 {
    let units: u32 = text.chars().map(|c| u32::from(char_units(c, bold))).sum();
    units as f32 * size / 1000.0
}

/// Word-wrap `text` so every line fits in `max_width` points.
///
/// Explicit newlines are kept. Words longer than a line are broken
/// between characters.
pub fn wrap_text(text: &str, size: f32, bold: bool, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();

        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };

            if text_width(&candidate, size, bold) <= max_width {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }

            if text_width(word, size, bold) <= max_width {
                current = word.to_string();
            } else {
                for ch in word.chars() {
                    current.push(ch);
                    if text_width(&current, size, bold) > max_width && current.chars().count() > 1 {
                        current.pop();
                        lines.push(std::mem::replace(&mut current, ch.to_string()));
                    }
                }
            }
        }

        lines.push(current);
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    lines
}

/// Shorten `text` with a trailing ellipsis so it fits in `max_width`.
pub fn fit_text(text: &str, size: f32, bold: bool, max_width: f32) -> String {
    if text_width(text, size, bold) <= max_width {
        return text.to_string();
    }

    let mut fitted: String = text.to_string();
    while !fitted.is_empty() && text_width(&format!("{}...", fitted), size, bold) > max_width {
        fitted.pop();
    }
    format!("{}...", fitted.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_width_known_values() {
        // 'H' 722 + 'i' 222
        assert!((text_width("Hi", 10.0, false) - 9.44).abs() < 1e-4);
        assert!(text_width("Hi", 10.0, true) > text_width("Hi", 10.0, false));
        assert_eq!(text_width("", 12.0, false), 0.0);
    }

    #[test]
    fn test_non_ascii_is_measured() {
        assert!(text_width("Peña", 10.0, false) > 0.0);
        assert_eq!(text_width("ñ", 10.0, false), text_width("n", 10.0, false));
    }

    #[test]
    fn test_wrap_text_fits_width() {
        let text = "Vessel arrived late and the waste was weighed twice because the \
                    first scale reading was rejected by the operator on duty.";
        let lines = wrap_text(text, 9.0, false, 150.0);

        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| text_width(l, 9.0, false) <= 150.0));
        assert_eq!(lines.join(" "), text.split_whitespace().collect::<Vec<_>>().join(" "));
    }

    #[test]
    fn test_wrap_text_breaks_long_words_and_keeps_newlines() {
        let lines = wrap_text("AAAAAAAAAAAAAAAAAAAA\nok", 10.0, false, 40.0);
        assert!(lines.len() > 2);
        assert!(lines.iter().all(|l| text_width(l, 10.0, false) <= 40.0));
        assert_eq!(lines.last().map(String::as_str), Some("ok"));
    }

    #[test]
    fn test_fit_text() {
        assert_eq!(fit_text("short", 10.0, false, 100.0), "short");
        let fitted = fit_text("A very long vessel name that will not fit", 10.0, false, 60.0);
        assert!(fitted.ends_with("..."));
        assert!(text_width(&fitted, 10.0, false) <= 60.0);
    }
}
