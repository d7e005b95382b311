// calico-upgrade/src/utils/feedback.rs
use std::io::{self, Stdout, Write};
use tracing::warn;

const LINE_WIDTH: usize = 80;

/// Line-oriented operator output.
pub trait Feedback {
    fn separator(&mut self);
    fn msg(&mut self, text: &str);
    fn bullet(&mut self, text: &str);
    fn new_line(&mut self);
}

/// Writes feedback to a terminal-like stream, word-wrapped at 80 columns.
pub struct Console<W: Write> {
    out: W,
}

impl Console<Stdout> {
    pub fn stdout() -> Self {
        Console::new(io::stdout())
    }
}

impl<W: Write> Console<W> {
    pub fn new(out: W) -> Self {
        Console { out }
    }

    /// Output is best effort: a closed or failing stream is logged, not fatal.
    fn write_lines(&mut self, lines: &[String]) {
        let result = lines
            .iter()
            .try_for_each(|line| writeln!(self.out, "{}", line))
            .and_then(|()| self.out.flush());
        if let Err(e) = result {
            warn!(error = %e, "failed to write operator feedback");
        }
    }
}

impl<W: Write> Feedback for Console<W> {
    fn separator(&mut self) {
        self.write_lines(&["-".repeat(LINE_WIDTH)]);
    }

    fn msg(&mut self, text: &str) {
        self.write_lines(&wrap(text, "", ""));
    }

    fn bullet(&mut self, text: &str) {
        self.write_lines(&wrap(text, "- ", "  "));
    }

    fn new_line(&mut self) {
        self.write_lines(&[String::new()]);
    }
}

/// Greedy word wrap. `first` prefixes the first line and `rest` every
/// continuation line. A word longer than the width gets a line of its own.
fn wrap(text: &str, first: &str, rest: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::from(first);
    let mut has_words = false;

    for (i, paragraph) in text.split('\n').enumerate() {
        if i > 0 {
            lines.push(std::mem::replace(&mut line, rest.to_string()));
            has_words = false;
        }
        for word in paragraph.split_whitespace() {
            if has_words && line.chars().count() + 1 + word.chars().count() > LINE_WIDTH {
                lines.push(std::mem::replace(&mut line, rest.to_string()));
                has_words = false;
            }
            if has_words {
                line.push(' ');
            }
            line.push_str(word);
            has_words = true;
        }
    }

    lines.push(line);
    lines
}

#[cfg(test)]
pub(crate) mod recording {
    use super::Feedback;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Line {
        Separator,
        Msg(String),
        Bullet(String),
        NewLine,
    }

    /// Feedback sink that keeps every call for later assertions.
    #[derive(Debug, Default)]
    pub struct Recorder {
        pub lines: Vec<Line>,
    }

    impl Recorder {
        pub fn count_msg(&self, text: &str) -> usize {
            self.lines
                .iter()
                .filter(|line| matches!(line, Line::Msg(m) if m == text))
                .count()
        }

        pub fn has_bullet_containing(&self, needle: &str) -> bool {
            self.lines
                .iter()
                .any(|line| matches!(line, Line::Bullet(b) if b.contains(needle)))
        }
    }

    impl Feedback for Recorder {
        fn separator(&mut self) {
            self.lines.push(Line::Separator);
        }

        fn msg(&mut self, text: &str) {
            self.lines.push(Line::Msg(text.to_string()));
        }

        fn bullet(&mut self, text: &str) {
            self.lines.push(Line::Bullet(text.to_string()));
        }

        fn new_line(&mut self) {
            self.lines.push(Line::NewLine);
        }
    }
}
