//! Operator console
//!
//! The human at the track is part of the protocol: they reset the timer,
//! power-cycle it when the link fails, and decide when to stop racing.

use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};

use crate::protocol::ProtocolError;

/// Conversation with the race operator
pub trait Operator {
    /// Show an informational message
    fn notice(&mut self, message: &str) -> Result<(), ProtocolError>;

    /// Show a prompt and block until the operator confirms.
    ///
    /// Returns [`ProtocolError::OperatorClosed`] when input is gone, which is
    /// the only way out of an otherwise endless recovery.
    fn acknowledge(&mut self, prompt: &str) -> Result<(), ProtocolError>;

    /// Ask whether to run another race
    fn continue_racing(&mut self) -> Result<bool, ProtocolError>;
}

impl<T: Operator + ?Sized> Operator for &mut T {
    fn notice(&mut self, message: &str) -> Result<(), ProtocolError> {
        (**self).notice(message)
    }

    fn acknowledge(&mut self, prompt: &str) -> Result<(), ProtocolError> {
        (**self).acknowledge(prompt)
    }

    fn continue_racing(&mut self) -> Result<bool, ProtocolError> {
        (**self).continue_racing()
    }
}

/// Operator on a text console
pub struct ConsoleOperator<R, W> {
    input: R,
    output: W,
}

impl ConsoleOperator<BufReader<Stdin>, Stdout> {
    /// Operator on the process's stdin/stdout
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsoleOperator<R, W> {
    /// Create an operator reading replies from `input` and writing to `output`
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Consume the operator, returning its output
    pub fn into_output(self) -> W {
        self.output
    }

    /// Read one reply line; `None` when input is closed
    fn reply(&mut self) -> Result<Option<String>, ProtocolError> {
        let mut line = String::new();
        match self.input.read_line(&mut line)? {
            0 => Ok(None),
            _ => Ok(Some(line)),
        }
    }
}

impl<R: BufRead, W: Write> Operator for ConsoleOperator<R, W> {
    fn notice(&mut self, message: &str) -> Result<(), ProtocolError> {
        writeln!(self.output, "{}", message)?;
        self.output.flush()?;
        Ok(())
    }

    fn acknowledge(&mut self, prompt: &str) -> Result<(), ProtocolError> {
        self.notice(prompt)?;
        match self.reply()? {
            Some(_) => Ok(()),
            None => Err(ProtocolError::OperatorClosed),
        }
    }

    fn continue_racing(&mut self) -> Result<bool, ProtocolError> {
        self.notice("Press enter to continue, X to exit.")?;
        Ok(match self.reply()? {
            Some(reply) => !reply.contains(['x', 'X']),
            None => false,
        })
    }
}
