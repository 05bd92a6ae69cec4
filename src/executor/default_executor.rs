use crate::ast::CommandUnit;
use crate::context::ShellContext;
use crate::jobs::{JobError, JobNotice, JobState};
use super::executor::{Executor, ExecOutcome, ExecStatus};
use super::builtins::BuiltinManager;
use super::path_resolver::PathResolver;
use super::pipeline;
use super::process_group::{run_in_foreground, GroupStatus};

pub struct DefaultExecutor {
    builtins: BuiltinManager,
    resolver: PathResolver,
}

impl Default for DefaultExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor for DefaultExecutor {
    fn exec(&mut self, unit: &CommandUnit, ctx: &mut ShellContext) -> ExecStatus {
        if let Some(stage) = unit.simple_stage() {
            if self.builtins.is_builtin(stage.program()) {
                return self.builtins.execute(stage.program(), stage.args(), ctx);
            }
        }
        if unit.background {
            self.exec_background(unit, ctx)
        } else {
            self.exec_foreground(unit, ctx)
        }
    }
}

impl DefaultExecutor {
    pub fn new() -> Self {
        Self::with_resolver(PathResolver::new())
    }

    pub fn with_resolver(resolver: PathResolver) -> Self {
        Self { builtins: BuiltinManager::new(), resolver }
    }

    fn exec_background(&mut self, unit: &CommandUnit, ctx: &mut ShellContext) -> ExecStatus {
        // Refuse before forking so no group runs unsupervised.
        if !ctx.jobs.has_room() {
            return Err(JobError::TableFull.into());
        }
        let group = pipeline::spawn(unit, &self.resolver, None)?;
        let pgid = group.pgid();
        let id = ctx.jobs.register(group, &unit.display, JobState::Running)?;
        println!("[{}] {}", id, pgid);
        Ok(ExecOutcome::Background(id))
    }

    fn exec_foreground(&mut self, unit: &CommandUnit, ctx: &mut ShellContext) -> ExecStatus {
        let mut group = pipeline::spawn(unit, &self.resolver, Some(&ctx.terminal))?;
        let mut status = run_in_foreground(&mut group, &ctx.terminal, &ctx.foreground, false)?;
        loop {
            match status {
                GroupStatus::Exited(code) => return Ok(ExecOutcome::Code(code)),
                GroupStatus::Stopped(sig) if ctx.jobs.has_room() => {
                    tracing::debug!(pgid = group.pgid().as_raw(), ?sig, "foreground unit stopped");
                    let id = ctx.jobs.register(group, &unit.display, JobState::Stopped)?;
                    let notice = JobNotice { id, state: JobState::Stopped, display: unit.display.clone() };
                    println!("\n{}", notice);
                    return Ok(ExecOutcome::Stopped(id));
                }
                GroupStatus::Stopped(_) => {
                    eprintln!("jcsh: {}, cannot suspend", JobError::TableFull);
                    status = run_in_foreground(&mut group, &ctx.terminal, &ctx.foreground, true)?;
                }
                GroupStatus::Running | GroupStatus::Continued => {
                    status = run_in_foreground(&mut group, &ctx.terminal, &ctx.foreground, false)?;
                }
            }
        }
    }
}
