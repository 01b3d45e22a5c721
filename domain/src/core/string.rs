//! String utilities for the domain layer.

/// Truncate a string to a maximum length with ellipsis (UTF-8 safe)
///
/// Uses byte length for max_len but ensures truncation occurs at valid
/// UTF-8 character boundaries.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let target = max_len.saturating_sub(3);
        let mut end = target.min(s.len());
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}

/// Sanitize free text before it is persisted.
///
/// Line breaks and tabs collapse to a single space, every other control
/// character is dropped, and the result is capped at `max_chars` characters.
/// This is an extra guard only; repositories must still use typed access.
pub fn sanitize_free_text(s: &str, max_chars: usize) -> String {
    let mut out = String::with_capacity(s.len().min(max_chars * 4));
    let mut last_space = false;

    for c in s.chars() {
        let c = match c {
            '\n' | '\r' | '\t' => ' ',
            c if c.is_control() => continue,
            c => c,
        };
        if c == ' ' {
            if last_space {
                continue;
            }
            last_space = true;
        } else {
            last_space = false;
        }
        out.push(c);
    }

    let trimmed = out.trim();
    trimmed.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_ascii() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 8), "hello...");
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate("日本語テスト", 30), "日本語テスト");
        // 3 bytes per char: target 12 -> 4 chars
        assert_eq!(truncate("日本語テスト文字列", 15), "日本語テ...");
    }

    #[test]
    fn test_sanitize_strips_control_characters() {
        let dirty = "max rounds\u{0007} exceeded\u{001b}[31m";
        assert_eq!(sanitize_free_text(dirty, 100), "max rounds exceeded[31m");
    }

    #[test]
    fn test_sanitize_collapses_whitespace_controls() {
        assert_eq!(sanitize_free_text("a\n\nb\tc\r\n", 100), "a b c");
    }

    #[test]
    fn test_sanitize_caps_length_on_char_boundary() {
        let text = "é".repeat(10);
        assert_eq!(sanitize_free_text(&text, 4), "éééé");
    }
}
