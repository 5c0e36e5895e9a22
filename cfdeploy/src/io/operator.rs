//! Operator-facing output and confirmation prompts.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};

pub trait Operator {
    /// Print a line for the operator.
    fn say(&self, line: &str);

    /// Ask the operator to confirm `prompt`. `false` aborts the command.
    fn confirm(&self, prompt: &str) -> Result<bool>;
}

/// Operator on the controlling terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalOperator {
    /// Answer every confirmation with yes.
    pub non_interactive: bool,
}

impl Operator for TerminalOperator {
    fn say(&self, line: &str) {
        println!("{line}");
    }

    fn confirm(&self, prompt: &str) -> Result<bool> {
        if self.non_interactive {
            return Ok(true);
        }
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        confirm_with(prompt, &mut stdin.lock(), &mut stdout)
    }
}

/// Prompt on `output` and read one answer line from `input`. Only `yes`
/// confirms.
pub fn confirm_with<R: BufRead, W: Write>(prompt: &str, input: &mut R, output: &mut W) -> Result<bool> {
    write!(output, "{prompt}? (type 'yes' to continue): ").context("write prompt")?;
    output.flush().context("flush prompt")?;
    let mut answer = String::new();
    input.read_line(&mut answer).context("read confirmation")?;
    Ok(answer.trim() == "yes")
}
