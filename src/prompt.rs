//! Interactive console adapter.
//!
//! Parsing lives in [`crate::range`]; this module only owns the re-prompt
//! loops, so it works over any `BufRead`/`Write` pair.

use std::io::{self, BufRead, Write};

use crate::range::{parse_range, ValueRange};

pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl Prompter<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, question: &str) -> io::Result<String> {
        write!(self.output, "{question}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed while waiting for an answer",
            ));
        }
        Ok(line.trim().to_string())
    }

    /// Ask for a `min,max` range until the answer parses.
    ///
    /// When `required` is false a blank answer means "no constraint".
    pub fn range(&mut self, label: &str, required: bool) -> io::Result<Option<ValueRange>> {
        let hint = if required { "" } else { ", blank to skip" };
        loop {
            let answer = self.ask(&format!("{label} range as 'min,max'{hint}: "))?;
            if answer.is_empty() && !required {
                return Ok(None);
            }
            match parse_range(&answer) {
                Ok(range) => return Ok(Some(range)),
                Err(e) => writeln!(self.output, "Invalid {label} range: {e}")?,
            }
        }
    }

    /// Yes/no question; anything other than `y`/`yes` is a no.
    pub fn confirm(&mut self, question: &str) -> io::Result<bool> {
        let answer = self.ask(&format!("{question} (y/n) "))?;
        Ok(matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
    }
}
