//! Utility functions for formatting and command display.
//!
//! Duration formatting for reports and POSIX shell escaping for the
//! printable form of planned commands.

/// Formats whole seconds as HH:MM:SS (e.g., 3725 -> "01:02:05").
#[must_use]
pub fn seconds_to_time(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds / 60) % 60;
    let secs = seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

/// Formats a duration as HH:MM:SS with the fractional part appended when it
/// is non-zero (e.g., 5400.123 -> "01:30:00.123").
#[must_use]
pub fn format_duration(seconds: f64) -> String {
    if seconds < 0.0 || !seconds.is_finite() {
        return "??:??:??".to_string();
    }

    let mut time = seconds_to_time(seconds as u64);
    let text = seconds.to_string();
    if let Some((_, fraction)) = text.split_once('.') {
        if !fraction.chars().all(|c| c == '0') {
            time.push('.');
            time.push_str(fraction);
        }
    }
    time
}

/// Escapes one argument for a POSIX shell. Safe characters pass through,
/// everything else is backslash-escaped.
#[must_use]
pub fn escape_arg(arg: &str) -> String {
    if arg.is_empty() {
        return "\"\"".to_string();
    }

    let mut escaped = String::with_capacity(arg.len() + 8);
    for c in arg.chars() {
        match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '_' | '-' | '.' | ',' | ':' | '/' | '@' => {
                escaped.push(c)
            }
            '\n' => escaped.push_str("'\n'"),
            _ => {
                escaped.push('\\');
                escaped.push(c);
            }
        }
    }
    escaped
}

/// Joins escaped arguments with single spaces.
#[must_use]
pub fn escape_command<S: AsRef<str>>(args: &[S]) -> String {
    args.iter()
        .map(|arg| escape_arg(arg.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}
