/// Normalize extracted text.
///
/// Runs of spaces and tabs become one space, every line is trimmed, runs of
/// blank lines become a single paragraph break and the result is trimmed.
/// Single newlines survive. Form feeds count as blank lines.
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_break = 0usize;

    for raw_line in text.split(['\n', '\x0C']) {
        let line = collapse_spaces(raw_line.trim_end_matches('\r'));
        if line.is_empty() {
            if !out.is_empty() {
                pending_break = 2;
            }
            continue;
        }
        if !out.is_empty() {
            let breaks = pending_break.max(1);
            for _ in 0..breaks {
                out.push('\n');
            }
        }
        out.push_str(&line);
        pending_break = 0;
    }

    out
}

fn collapse_spaces(line: &str) -> String {
    line.split(|c: char| c == ' ' || c == '\t' || c == '\r' || c == '\u{a0}')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
