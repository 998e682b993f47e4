//! Output excerpts for error messages.

const MAX_LINE_CHARS: usize = 200;
const MAX_EXCERPT_BYTES: usize = 1000;

/// The last `max_lines` non-blank lines of `output`, for error messages.
///
/// certbot and PHP print the actual failure last, so the tail is kept.
/// Long lines are shortened and the excerpt is capped in size; a leading
/// `...` marks anything dropped.
pub fn sanitize_output(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().filter(|l| !l.trim().is_empty()).collect();
    let skip = lines.len().saturating_sub(max_lines);
    let mut dropped = skip > 0;

    let mut kept: Vec<String> = Vec::new();
    let mut size = 0;
    for line in lines[skip..].iter().rev() {
        let line = shorten(line.trim_end());
        if size + line.len() + 1 > MAX_EXCERPT_BYTES {
            dropped = true;
            break;
        }
        size += line.len() + 1;
        kept.push(line);
    }
    kept.reverse();

    let body = kept.join("\n");
    if dropped {
        format!("...\n{}", body)
    } else {
        body
    }
}

fn shorten(line: &str) -> String {
    match line.char_indices().nth(MAX_LINE_CHARS) {
        Some((idx, _)) => format!("{}...", &line[..idx]),
        None => line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_output_is_kept() {
        assert_eq!(sanitize_output("Hello\n\nWorld\n", 10), "Hello\nWorld");
        assert_eq!(sanitize_output("", 10), "");
    }

    #[test]
    fn test_keeps_the_tail() {
        let output = "Saving debug log\nRequesting a certificate\nChallenge failed\nSome challenges have failed.";
        assert_eq!(
            sanitize_output(output, 2),
            "...\nChallenge failed\nSome challenges have failed."
        );
    }

    #[test]
    fn test_long_lines_are_shortened() {
        let sanitized = sanitize_output(&"é".repeat(300), 10);
        assert_eq!(sanitized.chars().count(), MAX_LINE_CHARS + 3);
        assert!(sanitized.ends_with("..."));
    }

    #[test]
    fn test_total_size_is_capped() {
        let output = vec!["y".repeat(150); 20].join("\n");
        let sanitized = sanitize_output(&output, 20);
        assert!(sanitized.len() <= MAX_EXCERPT_BYTES + 4);
        assert!(sanitized.starts_with("...\n"));
        assert!(sanitized.ends_with(&"y".repeat(150)));
    }
}
