//! Table formatting utilities for CLI output.

/// Truncates a string to a maximum length, adding "..." if needed.
///
/// ```rust
/// use modelrelay_cli::presentation::truncate_string;
///
/// assert_eq!(truncate_string("grok-4", 10), "grok-4");
/// assert_eq!(truncate_string("grok-code-fast-1", 9), "grok-c...");
/// ```
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Print a horizontal separator line.
pub fn print_separator(width: usize) {
    println!("{}", "-".repeat(width));
}
