//! Operator interaction: console output and blocking prompts.
//!
//! The workflow never reads stdin directly; it asks an [`Operator`] and
//! validates the answer itself, so tests can script every decision.
use crate::transcript::Transcript;
use anyhow::{Context, Result};
use std::io::{BufRead, Write};

/// Decision provider and message sink for a run.
pub trait Operator {
    /// Show a message to the operator.
    fn notify(&mut self, message: &str);

    /// Show `prompt` and block for one line of input (without the newline).
    ///
    /// End of input yields an empty answer.
    fn ask(&mut self, prompt: &str) -> Result<String>;
}

/// Console operator over arbitrary reader/writer, mirrored into the transcript.
pub struct TerminalOperator<R, W> {
    input: R,
    output: W,
    transcript: Option<Transcript>,
}

impl<R: BufRead, W: Write> TerminalOperator<R, W> {
    pub fn new(input: R, output: W, transcript: Option<Transcript>) -> Self {
        Self {
            input,
            output,
            transcript,
        }
    }

    fn record(&self, line: &str) {
        if let Some(transcript) = &self.transcript {
            transcript.record(line);
        }
    }
}

impl<R: BufRead, W: Write> Operator for TerminalOperator<R, W> {
    fn notify(&mut self, message: &str) {
        let _ = writeln!(self.output, "{message}");
        let _ = self.output.flush();
        self.record(message);
    }

    fn ask(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{prompt}: ").context("write prompt")?;
        self.output.flush().context("flush prompt")?;
        let mut raw = Vec::new();
        self.input
            .read_until(b'\n', &mut raw)
            .context("read operator input")?;
        // Undecodable bytes stay in the answer and fail validation downstream.
        let line = String::from_utf8_lossy(&raw);
        let answer = line.trim_end_matches(['\r', '\n']).to_string();
        self.record(&format!("{prompt}: {answer}"));
        Ok(answer)
    }
}

/// True for a case-insensitive `y` or `yes`.
pub fn is_affirmative(answer: &str) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}
