use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Display width of a string; Polish diacritics count as one column.
pub(crate) fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Truncate to `width` display columns, ending in ".." when cut.
pub(crate) fn truncate_display(s: &str, width: usize) -> String {
    if display_width(s) <= width {
        return s.to_string();
    }
    if width < 3 {
        return s
            .chars()
            .find(|ch| ch.width().unwrap_or(0) <= width)
            .map(String::from)
            .unwrap_or_default();
    }

    let budget = width - 2;
    let mut used = 0;
    let mut end_byte = 0;
    for (i, ch) in s.char_indices() {
        let cw = ch.width().unwrap_or(0);
        if used + cw > budget {
            break;
        }
        used += cw;
        end_byte = i + ch.len_utf8();
    }
    format!("{}..", &s[..end_byte])
}

pub(crate) fn pad_right(s: &str, width: usize) -> String {
    let sw = display_width(s);
    if sw > width {
        truncate_display(s, width)
    } else {
        format!("{}{}", s, " ".repeat(width - sw))
    }
}

pub(crate) fn pad_left(s: &str, width: usize) -> String {
    let sw = display_width(s);
    if sw > width {
        truncate_display(s, width)
    } else {
        format!("{}{}", " ".repeat(width - sw), s)
    }
}

/// Render rows as an aligned plain-text table. Columns listed in
/// `right_aligned` are padded on the left; cells wider than `max_width`
/// are truncated.
pub(crate) fn render_table(headers: &[&str], rows: &[Vec<String>], right_aligned: &[usize], max_width: usize) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| display_width(h).min(max_width)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(display_width(cell).min(max_width));
        }
    }

    let line = |cells: Vec<&str>| -> String {
        let padded: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let width = widths.get(i).copied().unwrap_or(0);
                if right_aligned.contains(&i) {
                    pad_left(c, width)
                } else {
                    pad_right(c, width)
                }
            })
            .collect();
        padded.join("  ").trim_end().to_string()
    };

    let mut out = String::new();
    out.push_str(&line(headers.to_vec()));
    out.push('\n');
    out.push_str(&widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("  "));
    out.push('\n');
    for row in rows {
        out.push_str(&line(row.iter().map(String::as_str).collect()));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_of_polish_text() {
        assert_eq!(display_width("Nakrętka"), 8);
        assert_eq!(display_width(""), 0);
    }

    #[test]
    fn truncation() {
        assert_eq!(truncate_display("Podkładka", 6), "Podk..");
        assert_eq!(truncate_display("Bolt", 10), "Bolt");
        assert_eq!(truncate_display("Bolt", 1), "B");
    }

    #[test]
    fn padding() {
        assert_eq!(pad_right("ab", 4), "ab  ");
        assert_eq!(pad_left("7", 3), "  7");
    }

    #[test]
    fn renders_aligned_table() {
        let rows = vec![
            vec!["Śruba".to_string(), "60".to_string()],
            vec!["Nut".to_string(), "5".to_string()],
        ];
        let out = render_table(&["Name", "Qty"], &rows, &[1], 40);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Name   Qty");
        assert_eq!(lines[1], "-----  ---");
        assert_eq!(lines[2], "Śruba   60");
        assert_eq!(lines[3], "Nut      5");
    }
}
