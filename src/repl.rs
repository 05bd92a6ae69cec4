//! The read-evaluate loop.

use crate::context::ShellContext;
use crate::error::ShellError;
use crate::executor::{ExecOutcome, Executor};
use crate::io::InputHandler;
use crate::lexer::Lexer;
use crate::parser;
use crate::prompt::ShellPrompt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Exit(i32),
}

pub struct Repl<E: Executor> {
    executor: E,
    ctx: ShellContext,
    prompt: ShellPrompt,
    input: InputHandler,
}

impl<E: Executor> Repl<E> {
    pub fn new(executor: E, ctx: ShellContext, prompt: ShellPrompt, input: InputHandler) -> Self {
        Self { executor, ctx, prompt, input }
    }

    pub fn context(&self) -> &ShellContext {
        &self.ctx
    }

    /// Reads and runs lines until `exit` or end of input and returns the
    /// shell's exit status.
    pub fn run(&mut self) -> i32 {
        loop {
            self.ctx.report_jobs();
            self.prompt.show_prompt();

            let line = match self.input.read_line() {
                Ok(Some(line)) => line,
                Ok(None) => {
                    println!("Shell exited.");
                    return 0;
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    eprintln!("jcsh: {}", ShellError::from(e));
                    return 1;
                }
            };

            if let Control::Exit(code) = self.eval_line(&line) {
                return code;
            }
        }
    }

    /// Runs one raw line. Errors are reported here and only end the line.
    pub fn eval_line(&mut self, line: &str) -> Control {
        match self.try_eval(line) {
            Ok(control) => control,
            Err(e) => {
                eprintln!("jcsh: {}", e);
                Control::Continue
            }
        }
    }

    fn try_eval(&mut self, line: &str) -> Result<Control, ShellError> {
        let line = match self.ctx.history.expand(line)? {
            Some(recalled) => {
                println!("{}", recalled);
                recalled
            }
            None => line.to_string(),
        };
        if line.trim().is_empty() {
            return Ok(Control::Continue);
        }
        self.ctx.history.add(&line);

        // The whole line must parse before any of it runs.
        let tokens = Lexer::tokenize(&line)?;
        let units = parser::parse_line(&tokens)?;

        for unit in &units {
            tracing::debug!(unit = %unit, "dispatching");
            let outcome = self.executor.exec(unit, &mut self.ctx);
            self.ctx.report_jobs();
            match outcome {
                Ok(ExecOutcome::Exit(code)) => return Ok(Control::Exit(code)),
                Ok(_) => {}
                Err(e) => eprintln!("jcsh: {}", e),
            }
        }
        Ok(Control::Continue)
    }
}
