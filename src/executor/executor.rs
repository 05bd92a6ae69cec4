use std::{io, fmt};
use nix::errno::Errno;
use crate::ast::CommandUnit;
use crate::context::ShellContext;
use crate::jobs::JobError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecOutcome {
    /// The unit ran to completion with this status.
    Code(i32),
    /// The unit was launched in the background as this job.
    Background(usize),
    /// The foreground unit stopped and was registered as this job.
    Stopped(usize),
    /// `exit` was requested.
    Exit(i32),
}

pub type ExecStatus = Result<ExecOutcome, ExecError>;

#[derive(Debug)]
pub enum ExecError {
    Io(io::Error),
    Sys(Errno),
    Fork(Errno),
    Pipe(Errno),
    NulByte(String),
    NoSuchBuiltin(String),
    Job(JobError),
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecError::Io(e) => write!(f, "IO error: {}", e),
            ExecError::Sys(e) => write!(f, "system error: {}", e.desc()),
            ExecError::Fork(e) => write!(f, "fork: {}", e.desc()),
            ExecError::Pipe(e) => write!(f, "pipe: {}", e.desc()),
            ExecError::NulByte(arg) => write!(f, "argument contains a nul byte: {:?}", arg),
            ExecError::NoSuchBuiltin(name) => write!(f, "No such builtin command: {}", name),
            ExecError::Job(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ExecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExecError::Io(e) => Some(e),
            ExecError::Sys(e) | ExecError::Fork(e) | ExecError::Pipe(e) => Some(e),
            ExecError::Job(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ExecError {
    fn from(e: io::Error) -> Self {
        ExecError::Io(e)
    }
}

impl From<Errno> for ExecError {
    fn from(e: Errno) -> Self {
        ExecError::Sys(e)
    }
}

impl From<JobError> for ExecError {
    fn from(e: JobError) -> Self {
        ExecError::Job(e)
    }
}

/// Runs one command-unit to completion, into the background, or until
/// it stops.
pub trait Executor {
    fn exec(&mut self, unit: &CommandUnit, ctx: &mut ShellContext) -> ExecStatus;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigLoader;
    use crate::lexer::Lexer;
    use crate::parser;

    /// Records what it was asked to run instead of running it.
    struct TestExecutor {
        pub log: Vec<String>,
    }

    impl Executor for TestExecutor {
        fn exec(&mut self, unit: &CommandUnit, _ctx: &mut ShellContext) -> ExecStatus {
            self.log.push(unit.display.clone());
            match unit.stages[0].program() {
                "exit" => Ok(ExecOutcome::Exit(0)),
                _ => Ok(ExecOutcome::Code(0)),
            }
        }
    }

    fn run_line(exec: &mut TestExecutor, line: &str) -> Option<i32> {
        let mut ctx = ShellContext::non_interactive(&ConfigLoader::default_config());
        let tokens = Lexer::tokenize(line).unwrap();
        for unit in parser::parse_line(&tokens).unwrap() {
            if let Ok(ExecOutcome::Exit(code)) = exec.exec(&unit, &mut ctx) {
                return Some(code);
            }
        }
        None
    }

    #[test]
    fn test_units_dispatched_in_order() {
        let mut exec = TestExecutor { log: vec![] };
        assert_eq!(run_line(&mut exec, "echo a ; ls | wc ;; sleep 1 &"), None);
        assert_eq!(exec.log, vec!["echo a", "ls | wc", "sleep 1 &"]);
    }

    #[test]
    fn test_exit_stops_the_line() {
        let mut exec = TestExecutor { log: vec![] };
        assert_eq!(run_line(&mut exec, "echo a ; exit ; echo b"), Some(0));
        assert_eq!(exec.log, vec!["echo a", "exit"]);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(ExecError::Fork(Errno::EAGAIN).to_string(), format!("fork: {}", Errno::EAGAIN.desc()));
        assert_eq!(
            ExecError::NoSuchBuiltin("zz".into()).to_string(),
            "No such builtin command: zz"
        );
    }
}
