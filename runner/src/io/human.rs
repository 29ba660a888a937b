//! Human-in-the-loop input for the `ask_human` tool.

use std::io::{BufRead, Write};

use anyhow::{Context, Result, bail};

/// Source of answers to questions the agent asks the user.
pub trait Human {
    fn ask(&mut self, question: &str) -> Result<String>;
}

/// Interactive human on a terminal: prints the question, reads one line.
pub struct ConsoleHuman<R, W> {
    input: R,
    output: W,
}

impl ConsoleHuman<std::io::StdinLock<'static>, std::io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsoleHuman<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Human for ConsoleHuman<R, W> {
    fn ask(&mut self, question: &str) -> Result<String> {
        write!(self.output, "\nAgent asks: {question}\nYour answer: ").context("write question")?;
        self.output.flush().context("flush question")?;

        // Terminals in legacy code pages send non-UTF-8 bytes; keep the answer.
        let mut line = Vec::new();
        let read = self
            .input
            .read_until(b'\n', &mut line)
            .context("read answer")?;
        if read == 0 {
            bail!("input closed while waiting for an answer");
        }
        let answer = String::from_utf8_lossy(&line);
        Ok(answer.trim_end_matches(['\r', '\n']).to_string())
    }
}
