//! Line-oriented prompts used by the interactive commands.

use std::io::{self, BufRead, Write};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("invalid answer `{0}`, expected y or n")]
    InvalidAnswer(String),
}

/// Asks questions on `output` and reads answers from `input`.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Prints `question` and returns the trimmed answer. EOF reads as empty.
    pub fn line(&mut self, question: &str) -> io::Result<String> {
        write!(self.output, "{question}")?;
        self.output.flush()?;

        let mut answer = String::new();
        self.input.read_line(&mut answer)?;
        Ok(answer.trim().to_string())
    }

    /// Like [`Prompter::line`], with an empty answer meaning "skip".
    pub fn optional(&mut self, question: &str) -> io::Result<Option<String>> {
        let answer = self.line(question)?;
        Ok((!answer.is_empty()).then_some(answer))
    }

    /// Asks a y/n question. Anything else is an error.
    pub fn confirm(&mut self, question: &str) -> Result<bool, PromptError> {
        let answer = self.line(&format!("{question} (y/n) "))?;
        match answer.as_str() {
            "y" | "Y" => Ok(true),
            "n" | "N" => Ok(false),
            _ => Err(PromptError::InvalidAnswer(answer)),
        }
    }

    /// The answer source, for readers that consume more than one line.
    pub fn input(&mut self) -> &mut R {
        &mut self.input
    }

    /// Where prompts are written, for messages between questions.
    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn line_trims_answer_and_echoes_question() {
        let mut prompter = prompter("  fix sink \n");

        let answer = prompter.line("Task: ").unwrap();

        assert_eq!(answer, "fix sink");
        assert_eq!(String::from_utf8(prompter.output().clone()).unwrap(), "Task: ");
    }

    #[test]
    fn optional_maps_empty_to_none() {
        let mut prompter = prompter("\n2024-06-20\n");

        assert_eq!(prompter.optional("Due: ").unwrap(), None);
        assert_eq!(
            prompter.optional("Due: ").unwrap(),
            Some("2024-06-20".to_string())
        );
    }

    #[test]
    fn confirm_accepts_y_and_n() {
        let mut prompter = prompter("y\nn\n");

        assert!(prompter.confirm("Continue?").unwrap());
        assert!(!prompter.confirm("Continue?").unwrap());
    }

    #[test]
    fn confirm_rejects_other_answers() {
        let mut prompter = prompter("maybe\n");

        let err = prompter.confirm("Continue?").unwrap_err();

        assert!(matches!(err, PromptError::InvalidAnswer(ref a) if a == "maybe"));
    }

    #[test]
    fn eof_reads_as_empty_answer() {
        let mut prompter = prompter("");
        assert_eq!(prompter.line("Task: ").unwrap(), "");
    }
}
