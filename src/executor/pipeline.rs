//! Forks one process per pipeline stage and wires them together.
//!
//! Everything that allocates (argv, paths, program lookup) happens before
//! the first fork. A child only rearranges descriptors, opens its
//! redirection files and replaces its image.

use std::ffi::{CStr, CString};
use std::io::Write;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use nix::errno::Errno;
use nix::fcntl::{self, OFlag};
use nix::sys::stat::Mode;
use nix::unistd::{self, ForkResult};
use crate::ast::{CommandUnit, OutputMode, PipelineStage};
use crate::signals;
use super::executor::ExecError;
use super::path_resolver::PathResolver;
use super::process_group::{GroupBuilder, ProcessGroup, Terminal};

/// Exit status when the program cannot be found.
pub const EXIT_NOT_FOUND: i32 = 127;
/// Exit status when the program exists but cannot be executed.
pub const EXIT_NOT_EXECUTABLE: i32 = 126;
/// Exit status when a redirection file cannot be opened.
pub const EXIT_REDIRECT_FAILED: i32 = 1;

fn to_cstring(bytes: &[u8]) -> Result<CString, ExecError> {
    CString::new(bytes).map_err(|_| ExecError::NulByte(String::from_utf8_lossy(bytes).into_owned()))
}

fn path_cstring(path: &Path) -> Result<CString, ExecError> {
    to_cstring(path.as_os_str().as_bytes())
}

struct PreparedStage {
    name: CString,
    argv: Vec<CString>,
    program: Option<CString>,
}

impl PreparedStage {
    fn prepare(stage: &PipelineStage, resolver: &PathResolver) -> Result<Self, ExecError> {
        let argv = stage
            .argv()
            .iter()
            .map(|arg| to_cstring(arg.as_bytes()))
            .collect::<Result<Vec<_>, _>>()?;
        let program = match resolver.resolve(stage.program()) {
            Some(path) => Some(path_cstring(&path)?),
            None => None,
        };
        Ok(Self { name: argv[0].clone(), argv, program })
    }
}

struct Redirections {
    stdin: Option<CString>,
    stdout: Option<(CString, OFlag)>,
}

impl Redirections {
    fn prepare(unit: &CommandUnit) -> Result<Self, ExecError> {
        let stdin = unit.stdin.as_deref().map(path_cstring).transpose()?;
        let stdout = match &unit.stdout {
            Some(redirect) => {
                let mode = match redirect.mode {
                    OutputMode::Truncate => OFlag::O_TRUNC,
                    OutputMode::Append => OFlag::O_APPEND,
                };
                Some((path_cstring(&redirect.path)?, OFlag::O_WRONLY | OFlag::O_CREAT | mode))
            }
            None => None,
        };
        Ok(Self { stdin, stdout })
    }
}

/// The N-1 pipes of an N-stage pipeline, as (read, write) pairs.
struct Pipes {
    ends: Vec<(OwnedFd, OwnedFd)>,
}

impl Pipes {
    fn open(count: usize) -> Result<Self, ExecError> {
        let mut ends = Vec::with_capacity(count);
        for _ in 0..count {
            // Already-created pipes are closed by drop on failure. The
            // copies dup2'd onto stdin/stdout do not inherit O_CLOEXEC.
            ends.push(unistd::pipe2(OFlag::O_CLOEXEC).map_err(ExecError::Pipe)?);
        }
        Ok(Self { ends })
    }

    fn read_end(&self, i: usize) -> RawFd {
        self.ends[i].0.as_raw_fd()
    }

    fn write_end(&self, i: usize) -> RawFd {
        self.ends[i].1.as_raw_fd()
    }

    /// Closes every end. Unused write ends left open keep readers from
    /// ever seeing end-of-file.
    fn close_all(&mut self) {
        self.ends.clear();
    }
}

fn write_stderr(bytes: &[u8]) {
    // SAFETY: write(2) on a borrowed buffer.
    unsafe {
        libc::write(libc::STDERR_FILENO, bytes.as_ptr().cast(), bytes.len());
    }
}

/// Reports from inside a doomed child and leaves without running any of
/// the parent's exit handlers or flushing its copied buffers.
fn child_fail(subject: &CStr, reason: &str, code: i32) -> ! {
    write_stderr(b"jcsh: ");
    write_stderr(subject.to_bytes());
    write_stderr(b": ");
    write_stderr(reason.as_bytes());
    write_stderr(b"\n");
    // SAFETY: _exit never returns and touches no shared state.
    unsafe { libc::_exit(code) }
}

fn redirect_fd(path: &CStr, flags: OFlag, target: RawFd) {
    let mode = Mode::from_bits_truncate(0o644);
    let fd = match fcntl::open(path, flags, mode) {
        Ok(fd) => fd,
        Err(e) => child_fail(path, e.desc(), EXIT_REDIRECT_FAILED),
    };
    if let Err(e) = unistd::dup2(fd, target) {
        child_fail(path, e.desc(), EXIT_REDIRECT_FAILED);
    }
    let _ = unistd::close(fd);
}

fn exec_stage(stage: &PreparedStage, index: usize, count: usize, pipes: &mut Pipes, redirects: &Redirections) -> ! {
    signals::reset_for_child();

    let result: Result<(), Errno> = (|| {
        if index > 0 {
            unistd::dup2(pipes.read_end(index - 1), libc::STDIN_FILENO)?;
        }
        if index + 1 < count {
            unistd::dup2(pipes.write_end(index), libc::STDOUT_FILENO)?;
        }
        Ok(())
    })();
    pipes.close_all();
    if let Err(e) = result {
        child_fail(&stage.name, e.desc(), EXIT_NOT_EXECUTABLE);
    }

    if index == 0 {
        if let Some(path) = &redirects.stdin {
            redirect_fd(path, OFlag::O_RDONLY, libc::STDIN_FILENO);
        }
    }
    if index + 1 == count {
        if let Some((path, flags)) = &redirects.stdout {
            redirect_fd(path, *flags, libc::STDOUT_FILENO);
        }
    }

    match &stage.program {
        None => child_fail(&stage.name, "command not found", EXIT_NOT_FOUND),
        Some(program) => {
            let err = match unistd::execv(program, stage.argv.as_slice()) {
                Ok(never) => match never {},
                Err(e) => e,
            };
            child_fail(&stage.name, err.desc(), EXIT_NOT_EXECUTABLE)
        }
    }
}

/// Starts every stage of `unit` in one new process group and returns
/// without waiting. The parent holds no pipe descriptor afterwards.
///
/// With a `terminal` the group is a foreground launch and takes the
/// terminal from inside each child as well.
pub fn spawn(
    unit: &CommandUnit,
    resolver: &PathResolver,
    terminal: Option<&Terminal>,
) -> Result<ProcessGroup, ExecError> {
    let stages = unit
        .stages
        .iter()
        .map(|stage| PreparedStage::prepare(stage, resolver))
        .collect::<Result<Vec<_>, _>>()?;
    let redirects = Redirections::prepare(unit)?;
    let count = stages.len();
    let mut pipes = Pipes::open(count.saturating_sub(1))?;

    // Buffered output would otherwise be written once per process.
    let _ = std::io::stdout().flush();

    let mut builder = GroupBuilder::new(count).with_terminal(terminal.and_then(Terminal::handoff_fd));
    for (index, stage) in stages.iter().enumerate() {
        match builder.fork_member() {
            Ok(ForkResult::Child) => exec_stage(stage, index, count, &mut pipes, &redirects),
            Ok(ForkResult::Parent { child }) => {
                tracing::debug!(
                    pid = child.as_raw(),
                    pgid = builder.pgid().map(|p| p.as_raw()),
                    stage = index,
                    program = %unit.stages[index].program(),
                    "stage spawned"
                );
            }
            Err(e) => {
                pipes.close_all();
                builder.abandon();
                return Err(ExecError::Fork(e));
            }
        }
    }
    pipes.close_all();

    builder.build().ok_or(ExecError::Fork(Errno::ECHILD))
}
