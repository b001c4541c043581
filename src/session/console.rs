use crate::error::Result;
use crate::label::LabelFormat;
use crate::session::{Outcome, Prompter, SessionReport, Task};

use std::io::{self, BufRead, Stdout, Write};

/// Line-oriented prompter over any reader/writer pair (stdin/stdout in the CLI).
pub struct ConsolePrompter<I, O> {
    input: I,
    output: O,
}

impl ConsolePrompter<io::StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<I: BufRead, O: Write> ConsolePrompter<I, O> {
    pub fn new(input: I, output: O) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> O {
        self.output
    }
}

impl<I: BufRead, O: Write> Prompter for ConsolePrompter<I, O> {
    fn instructions(&mut self, text: &str) -> Result<()> {
        if !text.is_empty() {
            writeln!(self.output, "{}", text.trim_end())?;
            writeln!(self.output)?;
        }
        Ok(())
    }

    fn present(&mut self, task: &Task) -> Result<()> {
        writeln!(self.output, "TEXT TO ANNOTATE:")?;
        for (column, text) in &task.fields {
            writeln!(self.output, "\t{}:{}", column, text)?;
        }
        Ok(())
    }

    fn read_entry(&mut self, format: &LabelFormat) -> Result<String> {
        write!(
            self.output,
            "\nEnter Your Annotation ({})[Press Enter to quit the session]:",
            format
        )?;
        self.output.flush()?;

        // End of input reads as the empty entry and ends the session.
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        let entry = line.strip_suffix('\n').unwrap_or(&line);
        let entry = entry.strip_suffix('\r').unwrap_or(entry);
        Ok(entry.to_string())
    }

    fn invalid(&mut self, format: &LabelFormat) -> Result<()> {
        writeln!(
            self.output,
            "Invalid label. Please note the correct label format: {}",
            format
        )?;
        Ok(())
    }

    fn finished(&mut self, report: &SessionReport) -> Result<()> {
        match report.outcome {
            Outcome::Exhausted => writeln!(
                self.output,
                "You completed your part of the labeling process! Thank you! :)"
            )?,
            Outcome::Exited => writeln!(
                self.output,
                "Session closed after {} annotation(s). See you soon.",
                report.committed
            )?,
        }
        Ok(())
    }
}
