use std::fmt;
use std::io;
use nix::errno::Errno;
use crate::config::ConfigError;
use crate::executor::ExecError;
use crate::history::HistoryError;
use crate::lexer::LexError;
use crate::parser::ParseError;

/// Anything that can end a line early or keep the shell from starting.
#[derive(Debug)]
pub enum ShellError {
    Io(io::Error),
    Sys(Errno),
    Config(ConfigError),
    History(HistoryError),
    Lex(LexError),
    Parse(ParseError),
    Exec(ExecError),
}

impl fmt::Display for ShellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShellError::Io(e) => write!(f, "IO error: {}", e),
            ShellError::Sys(e) => write!(f, "system error: {}", e.desc()),
            ShellError::Config(e) => write!(f, "config: {}", e),
            ShellError::History(e) => write!(f, "{}", e),
            ShellError::Lex(e) => write!(f, "Lexing error: {}", e),
            ShellError::Parse(e) => write!(f, "Parsing error: {}", e),
            ShellError::Exec(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ShellError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ShellError::Io(e) => Some(e),
            ShellError::Sys(e) => Some(e),
            ShellError::Config(e) => Some(e),
            ShellError::History(e) => Some(e),
            ShellError::Lex(e) => Some(e),
            ShellError::Parse(e) => Some(e),
            ShellError::Exec(e) => Some(e),
        }
    }
}

impl From<io::Error> for ShellError {
    fn from(e: io::Error) -> Self {
        ShellError::Io(e)
    }
}

impl From<Errno> for ShellError {
    fn from(e: Errno) -> Self {
        ShellError::Sys(e)
    }
}

impl From<ConfigError> for ShellError {
    fn from(e: ConfigError) -> Self {
        ShellError::Config(e)
    }
}

impl From<HistoryError> for ShellError {
    fn from(e: HistoryError) -> Self {
        ShellError::History(e)
    }
}

impl From<LexError> for ShellError {
    fn from(e: LexError) -> Self {
        ShellError::Lex(e)
    }
}

impl From<ParseError> for ShellError {
    fn from(e: ParseError) -> Self {
        ShellError::Parse(e)
    }
}

impl From<ExecError> for ShellError {
    fn from(e: ExecError) -> Self {
        ShellError::Exec(e)
    }
}
