use crate::error::Result;
use crate::traits::{Decision, DecisionSource};
use log::warn;
use std::io::{BufRead, Write};

/// Asks the operator about each link on a line-oriented console.
pub struct ConsolePrompt<R, W> {
    input: R,
    output: W,
}

impl ConsolePrompt<std::io::StdinLock<'static>, std::io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsolePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> DecisionSource for ConsolePrompt<R, W> {
    fn decide(&mut self, link: &str) -> Result<Decision> {
        loop {
            write!(self.output, "Unsub from {}? (y/n) ", link)?;
            self.output.flush()?;

            let mut answer = String::new();
            if self.input.read_line(&mut answer)? == 0 {
                // Nothing left to read, so nobody can confirm anything
                writeln!(self.output)?;
                warn!("Input closed, declining {}", link);
                return Ok(Decision::Decline);
            }

            match answer.trim().to_lowercase().as_str() {
                "y" => return Ok(Decision::Accept),
                "n" => return Ok(Decision::Decline),
                _ => writeln!(self.output, "Invalid input provided. Try again.")?,
            }
        }
    }
}

/// Declines every link without asking. Used for dry runs.
pub struct DeclineAll;

impl DecisionSource for DeclineAll {
    fn decide(&mut self, _link: &str) -> Result<Decision> {
        Ok(Decision::Decline)
    }
}
