//! ANSI text decoration
//!
//! Each message kind gets its own 24-bit foreground color. Decoration is a
//! pure function of the text and the kind.

use crate::message::MessageKind;

/// Resets the terminal color
pub const RESET: &str = "\x1b[0m";

/// Build the escape sequence that starts a 24-bit foreground color
pub fn rgb(r: u8, g: u8, b: u8) -> String {
    format!("\x1b[38;2;{};{};{}m", r, g, b)
}

pub fn orange() -> String {
    rgb(255, 94, 0)
}

pub fn red() -> String {
    rgb(255, 0, 0)
}

pub fn blue() -> String {
    rgb(0, 60, 255)
}

/// Decorate a message body according to its kind
///
/// Chat bodies are blue and end with a line break, notices are orange,
/// errors are red and log requests are left as they are. An empty body
/// stays empty so it can still be recognized and dropped downstream.
pub fn decorate(text: &str, kind: MessageKind) -> String {
    if text.is_empty() {
        return String::new();
    }

    match kind {
        MessageKind::Chat => format!("{}{}{}\n", blue(), text, RESET),
        MessageKind::Notice => format!("{}{}{}", orange(), text, RESET),
        MessageKind::Error => format!("{}{}{}", red(), text, RESET),
        MessageKind::LogRequest => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_sequence() {
        assert_eq!(rgb(1, 2, 3), "\x1b[38;2;1;2;3m");
    }

    #[test]
    fn test_chat_gets_trailing_newline() {
        let text = decorate("hi", MessageKind::Chat);
        assert!(text.starts_with(&blue()));
        assert!(text.ends_with("\x1b[0m\n"));
    }

    #[test]
    fn test_notice_and_error_colors() {
        assert_eq!(decorate("x", MessageKind::Notice), format!("{}x{}", orange(), RESET));
        assert_eq!(decorate("x", MessageKind::Error), format!("{}x{}", red(), RESET));
    }

    #[test]
    fn test_log_request_unchanged() {
        assert_eq!(decorate("Read the log file", MessageKind::LogRequest), "Read the log file");
    }

    #[test]
    fn test_empty_body_stays_empty() {
        assert_eq!(decorate("", MessageKind::Chat), "");
        assert_eq!(decorate("", MessageKind::Error), "");
    }
}
