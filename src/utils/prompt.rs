// calico-upgrade/src/utils/prompt.rs
use std::io::{self, BufRead, StdinLock, Stdout, Write};

/// Blocking yes/no confirmation from the operator.
pub trait Confirm {
    /// Returns `Ok(true)` only on an explicit "yes", in any letter case.
    fn confirm_proceed(&mut self) -> io::Result<bool>;
}

pub struct TerminalPrompt<R: BufRead, W: Write> {
    input: R,
    output: W,
}

impl TerminalPrompt<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        TerminalPrompt::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        TerminalPrompt { input, output }
    }
}

impl<R: BufRead, W: Write> Confirm for TerminalPrompt<R, W> {
    fn confirm_proceed(&mut self) -> io::Result<bool> {
        write!(self.output, "Type \"yes\" to proceed (any other input cancels): ")?;
        self.output.flush()?;

        let mut input = String::new();
        self.input.read_line(&mut input)?;
        Ok(input.trim().eq_ignore_ascii_case("yes"))
    }
}
