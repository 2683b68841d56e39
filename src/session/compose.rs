// src/session/compose.rs
//! Multi-line message composition. A single ENTER inserts a line break, a
//! double ENTER sends; `reload`, `clear` and `quit` (or their one-letter
//! forms) act as commands only when typed as the first line of an entry.

/// A completed entry produced by the composer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Reload,
    Clear,
    Quit,
    Send(String),
}

#[derive(Debug, Default)]
pub struct Composer {
    lines: Vec<String>,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while no line of the current entry has been accepted, i.e. the
    /// next line is eligible to be a command.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Feed one raw input line (no trailing newline). Returns a completed
    /// entry when this line finishes one, otherwise the composer keeps
    /// accumulating.
    pub fn push_line(&mut self, raw: &str) -> Option<Entry> {
        if self.lines.is_empty() {
            match raw.trim().to_ascii_lowercase().as_str() {
                "r" | "reload" => return Some(Entry::Reload),
                "c" | "clear" => return Some(Entry::Clear),
                "q" | "quit" => return Some(Entry::Quit),
                _ => {}
            }
        }

        if raw.is_empty() {
            if self.lines.last().is_some_and(|prev| prev.is_empty()) {
                // Double blank: drop the trailing blank and emit.
                self.lines.pop();
                let body = self.lines.join("\n").trim().to_string();
                self.lines.clear();
                if body.is_empty() {
                    // All-whitespace entry: discard, composition restarts.
                    return None;
                }
                return Some(Entry::Send(body));
            }
        }

        self.lines.push(raw.to_string());
        None
    }

    /// Throw away a partially composed entry (send failure, clear, quit).
    pub fn abort(&mut self) {
        self.lines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(composer: &mut Composer, lines: &[&str]) -> Vec<Entry> {
        lines
            .iter()
            .filter_map(|line| composer.push_line(line))
            .collect()
    }

    #[test]
    fn double_blank_sends_single_line() {
        let mut c = Composer::new();
        let entries = feed(&mut c, &["hello", "", ""]);
        assert_eq!(entries, vec![Entry::Send("hello".into())]);
        assert!(c.is_empty());
    }

    #[test]
    fn single_blank_is_a_line_break() {
        let mut c = Composer::new();
        let entries = feed(&mut c, &["hello", "", "world", "", ""]);
        assert_eq!(entries, vec![Entry::Send("hello\n\nworld".into())]);
    }

    #[test]
    fn first_line_command_never_becomes_content() {
        for (token, expected) in [
            ("r", Entry::Reload),
            ("reload", Entry::Reload),
            ("c", Entry::Clear),
            ("CLEAR", Entry::Clear),
            ("q", Entry::Quit),
            ("Quit", Entry::Quit),
        ] {
            let mut c = Composer::new();
            assert_eq!(c.push_line(token), Some(expected));
            assert!(c.is_empty());
        }
    }

    #[test]
    fn command_token_after_first_line_is_content() {
        let mut c = Composer::new();
        let entries = feed(&mut c, &["hello", "quit", "", ""]);
        assert_eq!(entries, vec![Entry::Send("hello\nquit".into())]);
    }

    #[test]
    fn command_token_after_blank_first_line_is_content() {
        // A lone blank line starts an entry, so a command on line two is
        // already mid-composition.
        let mut c = Composer::new();
        let entries = feed(&mut c, &["", "reload", "", ""]);
        assert_eq!(entries, vec![Entry::Send("reload".into())]);
    }

    #[test]
    fn whitespace_only_entry_is_discarded() {
        let mut c = Composer::new();
        assert!(feed(&mut c, &["   ", "", ""]).is_empty());
        assert!(c.is_empty());

        // Composition restarts cleanly afterwards.
        let entries = feed(&mut c, &["next", "", ""]);
        assert_eq!(entries, vec![Entry::Send("next".into())]);
    }

    #[test]
    fn two_leading_blanks_reset_without_sending() {
        let mut c = Composer::new();
        assert!(feed(&mut c, &["", ""]).is_empty());
        assert!(c.is_empty());
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let mut c = Composer::new();
        let entries = feed(&mut c, &["  padded  ", "", ""]);
        assert_eq!(entries, vec![Entry::Send("padded".into())]);
    }

    #[test]
    fn abort_discards_partial_entry() {
        let mut c = Composer::new();
        c.push_line("half-typed");
        c.abort();
        assert!(c.is_empty());
        assert_eq!(c.push_line("q"), Some(Entry::Quit));
    }
}
