use std::io::{self, BufRead, StdinLock, Stdout, Write};

use url::Url;

use crate::error::{Error, Result};

/// Obtains an authorization code from the user for a consent URL.
pub trait AuthCodePrompt {
    fn prompt(&mut self, auth_url: &Url) -> Result<String>;
}

/// Prints the consent URL to `output` and reads the code from `input`.
pub struct ConsolePrompt<R, W> {
    input: R,
    output: W,
}

impl ConsolePrompt<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsolePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// First whitespace-separated word, skipping blank lines.
    fn read_code(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            if let Some(word) = line.split_whitespace().next() {
                return Ok(Some(word.to_string()));
            }
        }
    }
}

impl<R: BufRead, W: Write> AuthCodePrompt for ConsolePrompt<R, W> {
    fn prompt(&mut self, auth_url: &Url) -> Result<String> {
        let show = |out: &mut W| -> io::Result<()> {
            writeln!(
                out,
                "Go to the following link in your browser then type the authorization code: \n{}",
                auth_url
            )?;
            out.flush()
        };
        show(&mut self.output).map_err(|e| Error::io("unable to show authorization link", e))?;

        match self.read_code() {
            Ok(Some(code)) => Ok(code),
            Ok(None) => Err(Error::Auth(
                "unable to read authorization code: input closed".to_string(),
            )),
            Err(e) => Err(Error::io("unable to read authorization code", e)),
        }
    }
}
