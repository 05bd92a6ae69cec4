use std::collections::HashMap;

use crate::context::ShellContext;
use crate::jobs::{JobError, JobNotice, JobState};
use super::executor::{ExecError, ExecOutcome, ExecStatus};

pub trait BuiltinCommand {
    fn name(&self) -> &'static str;
    fn run(&self, args: &[String], ctx: &mut ShellContext) -> ExecStatus;
}

pub struct BuiltinManager {
    commands: HashMap<String, Box<dyn BuiltinCommand>>,
}

impl Default for BuiltinManager {
    fn default() -> Self {
        Self::new()
    }
}

impl BuiltinManager {
    pub fn new() -> Self {
        let mut mgr = BuiltinManager {
            commands: HashMap::new(),
        };
        mgr.register(Box::new(HelpCommand));
        mgr.register(Box::new(CdCommand));
        mgr.register(Box::new(ExitCommand));
        mgr.register(Box::new(JobsCommand));
        mgr.register(Box::new(HistoryCommand));
        mgr.register(Box::new(FgCommand));
        mgr
    }

    pub fn register(&mut self, cmd: Box<dyn BuiltinCommand>) {
        self.commands.insert(cmd.name().to_string(), cmd);
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn execute(&self, name: &str, args: &[String], ctx: &mut ShellContext) -> ExecStatus {
        match self.commands.get(name) {
            Some(cmd) => {
                tracing::debug!(builtin = name, "running builtin");
                cmd.run(args, ctx)
            }
            None => Err(ExecError::NoSuchBuiltin(name.to_string())),
        }
    }
}

pub struct HelpCommand;

impl BuiltinCommand for HelpCommand {
    fn name(&self) -> &'static str {
        "help"
    }
    fn run(&self, _args: &[String], _ctx: &mut ShellContext) -> ExecStatus {
        println!("Built-in commands:");
        println!("  cd <dir>      : change directory");
        println!("  exit [code]   : exit the shell");
        println!("  help          : show this help");
        println!("  jobs          : list background and stopped jobs");
        println!("  history       : show command history, recall with !n");
        println!("  fg <job_id>   : resume a job in the foreground");
        println!("Operators: cmd1 ; cmd2, a | b, < in, > out, >> out, trailing &");
        Ok(ExecOutcome::Code(0))
    }
}

pub struct CdCommand;

impl BuiltinCommand for CdCommand {
    fn name(&self) -> &'static str {
        "cd"
    }
    fn run(&self, args: &[String], _ctx: &mut ShellContext) -> ExecStatus {
        let Some(target) = args.first() else {
            eprintln!("cd: expected argument");
            return Ok(ExecOutcome::Code(1));
        };
        match std::env::set_current_dir(target) {
            Ok(()) => Ok(ExecOutcome::Code(0)),
            Err(e) => {
                eprintln!("cd: {}: {}", target, e);
                Ok(ExecOutcome::Code(1))
            }
        }
    }
}

pub struct ExitCommand;

impl BuiltinCommand for ExitCommand {
    fn name(&self) -> &'static str {
        "exit"
    }
    fn run(&self, args: &[String], _ctx: &mut ShellContext) -> ExecStatus {
        let code = match args.first() {
            None => 0,
            Some(arg) => match arg.parse() {
                Ok(code) => code,
                Err(_) => {
                    eprintln!("exit: {}: numeric argument required", arg);
                    2
                }
            },
        };
        println!("Exiting shell...");
        Ok(ExecOutcome::Exit(code))
    }
}

pub struct JobsCommand;

impl BuiltinCommand for JobsCommand {
    fn name(&self) -> &'static str {
        "jobs"
    }
    fn run(&self, _args: &[String], ctx: &mut ShellContext) -> ExecStatus {
        ctx.report_jobs();
        for job in ctx.jobs.list() {
            println!("{}", job);
        }
        Ok(ExecOutcome::Code(0))
    }
}

pub struct HistoryCommand;

impl BuiltinCommand for HistoryCommand {
    fn name(&self) -> &'static str {
        "history"
    }
    fn run(&self, _args: &[String], ctx: &mut ShellContext) -> ExecStatus {
        for line in ctx.history.render() {
            println!("{}", line);
        }
        Ok(ExecOutcome::Code(0))
    }
}

pub struct FgCommand;

impl FgCommand {
    fn resume(&self, arg: &str, ctx: &mut ShellContext) -> Result<ExecOutcome, JobError> {
        // Anything that is not a position cannot name a job.
        let id = arg.parse::<usize>().map_err(|_| JobError::NoSuchJob(arg.to_string()))?;
        let display = ctx
            .jobs
            .get(id)
            .filter(|job| job.state() != JobState::Done)
            .map(|job| job.display().to_string())
            .ok_or_else(|| JobError::NoSuchJob(arg.to_string()))?;

        println!("{}", display);
        match ctx.jobs.resume(id, &ctx.terminal, &ctx.foreground)? {
            JobState::Stopped => {
                println!("\n{}", JobNotice { id, state: JobState::Stopped, display });
                Ok(ExecOutcome::Stopped(id))
            }
            _ => Ok(ExecOutcome::Code(0)),
        }
    }
}

impl BuiltinCommand for FgCommand {
    fn name(&self) -> &'static str {
        "fg"
    }
    fn run(&self, args: &[String], ctx: &mut ShellContext) -> ExecStatus {
        let Some(arg) = args.first() else {
            eprintln!("Usage: fg <job_id>");
            return Ok(ExecOutcome::Code(1));
        };
        match self.resume(arg, ctx) {
            Ok(outcome) => Ok(outcome),
            Err(e @ JobError::NoSuchJob(_)) => {
                eprintln!("fg: {}", e);
                Ok(ExecOutcome::Code(1))
            }
            Err(e) => Err(e.into()),
        }
    }
}
