use std::os::unix::io::RawFd;
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{self, ForkResult, Pid};
use crate::signals::ForegroundGroup;

/// The controlling terminal as seen from the shell.
///
/// A non-interactive terminal (input is a file or pipe, or tests) never
/// calls `tcsetpgrp`.
#[derive(Debug)]
pub struct Terminal {
    fd: RawFd,
    shell_pgid: Pid,
    interactive: bool,
}

impl Terminal {
    pub fn detect() -> Self {
        let fd = libc::STDIN_FILENO;
        // SAFETY: isatty only inspects the descriptor.
        let interactive = unsafe { libc::isatty(fd) } == 1;
        Self { fd, shell_pgid: unistd::getpgrp(), interactive }
    }

    pub fn non_interactive() -> Self {
        Self { fd: libc::STDIN_FILENO, shell_pgid: unistd::getpgrp(), interactive: false }
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn shell_pgid(&self) -> Pid {
        self.shell_pgid
    }

    /// Descriptor a new foreground group should take over, if any.
    pub fn handoff_fd(&self) -> Option<RawFd> {
        self.interactive.then_some(self.fd)
    }

    fn foreground(&self) -> nix::Result<Pid> {
        // SAFETY: plain ioctl wrapper on a descriptor we do not own.
        Errno::result(unsafe { libc::tcgetpgrp(self.fd) }).map(Pid::from_raw)
    }

    fn set_foreground(&self, pgid: Pid) -> nix::Result<()> {
        // SAFETY: as above.
        Errno::result(unsafe { libc::tcsetpgrp(self.fd, pgid.as_raw()) }).map(drop)
    }

    /// Blocks (by stopping ourselves) until the shell is started in the
    /// foreground. Must run before SIGTTIN is ignored.
    pub fn wait_until_foreground(&self) -> nix::Result<()> {
        if !self.interactive {
            return Ok(());
        }
        loop {
            let pgrp = unistd::getpgrp();
            if self.foreground()? == pgrp {
                return Ok(());
            }
            signal::killpg(pgrp, Signal::SIGTTIN)?;
        }
    }

    /// Puts the shell in its own process group and takes the terminal.
    pub fn claim(&mut self) -> nix::Result<()> {
        if !self.interactive {
            return Ok(());
        }
        let pid = unistd::getpid();
        match unistd::setpgid(pid, pid) {
            // A session leader already leads its group.
            Ok(()) | Err(Errno::EPERM) => {}
            Err(e) => return Err(e),
        }
        self.shell_pgid = unistd::getpgrp();
        self.set_foreground(self.shell_pgid)?;
        tracing::debug!(pgid = self.shell_pgid.as_raw(), "terminal claimed");
        Ok(())
    }

    pub fn give_to(&self, pgid: Pid) -> nix::Result<()> {
        if self.interactive {
            self.set_foreground(pgid)?;
        }
        Ok(())
    }

    pub fn reclaim(&self) -> nix::Result<()> {
        self.give_to(self.shell_pgid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupStatus {
    Running,
    Stopped(Signal),
    /// A stopped member was continued by someone else. Only reported by
    /// non-blocking waits.
    Continued,
    /// Exit status of the representative process, `128 + n` if it was
    /// killed by signal `n`.
    Exited(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Member {
    pid: Pid,
    status: Option<WaitStatus>,
}

impl Member {
    fn finished(&self) -> bool {
        matches!(self.status, Some(WaitStatus::Exited(..)) | Some(WaitStatus::Signaled(..)))
    }
}

/// All processes of one command-unit, grouped under the first stage.
#[derive(Debug)]
pub struct ProcessGroup {
    pgid: Pid,
    members: Vec<Member>,
}

impl ProcessGroup {
    pub fn pgid(&self) -> Pid {
        self.pgid
    }

    /// The last stage; its exit status is the unit's status.
    pub fn representative(&self) -> Pid {
        self.members.last().map_or(self.pgid, |m| m.pid)
    }

    pub fn pids(&self) -> Vec<Pid> {
        self.members.iter().map(|m| m.pid).collect()
    }

    pub fn is_finished(&self) -> bool {
        self.members.iter().all(Member::finished)
    }

    fn exit_code(&self) -> i32 {
        match self.members.last().and_then(|m| m.status) {
            Some(WaitStatus::Exited(_, code)) => code,
            Some(WaitStatus::Signaled(_, sig, _)) => 128 + sig as i32,
            _ => 0,
        }
    }

    fn record(&mut self, status: WaitStatus) {
        if let Some(pid) = status.pid() {
            if let Some(member) = self.members.iter_mut().find(|m| m.pid == pid) {
                member.status = Some(status);
            }
        }
    }

    /// Collects state changes of any member.
    ///
    /// Blocking mode returns once every member has exited or one of them
    /// stopped. Non-blocking mode drains what is pending and reports
    /// `Running` if the group is still alive, or `Continued` when a member
    /// was continued.
    pub fn wait(&mut self, block: bool) -> nix::Result<GroupStatus> {
        let mut flags = WaitPidFlag::WUNTRACED;
        if !block {
            flags |= WaitPidFlag::WNOHANG | WaitPidFlag::WCONTINUED;
        }
        let target = Pid::from_raw(-self.pgid.as_raw());

        while !self.is_finished() {
            match waitpid(target, Some(flags)) {
                Ok(WaitStatus::StillAlive) => return Ok(GroupStatus::Running),
                Ok(status @ WaitStatus::Stopped(_, sig)) => {
                    self.record(status);
                    tracing::debug!(pgid = self.pgid.as_raw(), ?sig, "group stopped");
                    return Ok(GroupStatus::Stopped(sig));
                }
                Ok(status @ WaitStatus::Continued(_)) => {
                    self.record(status);
                    tracing::debug!(pgid = self.pgid.as_raw(), "group continued");
                    return Ok(GroupStatus::Continued);
                }
                Ok(status) => self.record(status),
                Err(Errno::EINTR) => continue,
                Err(Errno::ECHILD) => {
                    // Nothing left to wait for; whatever was not seen is gone.
                    for member in self.members.iter_mut().filter(|m| !m.finished()) {
                        member.status = Some(WaitStatus::Exited(member.pid, 0));
                    }
                }
                Err(e) => return Err(e),
            }
        }
        tracing::debug!(pgid = self.pgid.as_raw(), code = self.exit_code(), "group finished");
        Ok(GroupStatus::Exited(self.exit_code()))
    }

    /// Consumes stop and continue reports still queued from members other
    /// than the one `wait` returned for.
    fn drain_stops(&mut self) {
        while let Ok(GroupStatus::Stopped(_) | GroupStatus::Continued) = self.wait(false) {}
    }

    pub fn signal(&self, sig: Signal) -> nix::Result<()> {
        signal::killpg(self.pgid, sig)
    }
}

/// Forks the processes of one group. The first fork founds the group and
/// every later fork joins it; `setpgid` is issued on both sides of each
/// fork so the membership holds whichever side runs first.
#[derive(Debug)]
pub struct GroupBuilder {
    pgid: Option<Pid>,
    members: Vec<Member>,
    terminal: Option<RawFd>,
}

impl GroupBuilder {
    pub fn new(size_hint: usize) -> Self {
        Self { pgid: None, members: Vec::with_capacity(size_hint), terminal: None }
    }

    /// Makes every member hand `fd` to the group right after joining it,
    /// so a stage that reads the terminal before the parent's own handoff
    /// is not stopped by SIGTTIN.
    pub fn with_terminal(mut self, fd: Option<RawFd>) -> Self {
        self.terminal = fd;
        self
    }

    pub fn pgid(&self) -> Option<Pid> {
        self.pgid
    }

    pub fn fork_member(&mut self) -> nix::Result<ForkResult> {
        // SAFETY: the child only rearranges descriptors, resets signal
        // dispositions and replaces its image or calls _exit.
        let result = unsafe { unistd::fork() }?;
        match result {
            ForkResult::Parent { child } => {
                let pgid = *self.pgid.get_or_insert(child);
                // EACCES: the child already exec'd after joining itself.
                // ESRCH: it already exited.
                match unistd::setpgid(child, pgid) {
                    Ok(()) | Err(Errno::EACCES) | Err(Errno::ESRCH) => {}
                    Err(e) => tracing::warn!(child = child.as_raw(), error = %e, "setpgid failed"),
                }
                self.members.push(Member { pid: child, status: None });
            }
            ForkResult::Child => {
                let pgid = self.pgid.unwrap_or_else(unistd::getpid);
                let _ = unistd::setpgid(Pid::from_raw(0), pgid);
                if let Some(fd) = self.terminal {
                    // SIGTTOU is still ignored until the stage resets its
                    // dispositions, so this works from a background group.
                    // SAFETY: plain ioctl wrapper.
                    unsafe { libc::tcsetpgrp(fd, pgid.as_raw()) };
                }
            }
        }
        Ok(result)
    }

    /// Kills and reaps whatever was started; used when a later fork fails.
    pub fn abandon(self) {
        if let Some(pgid) = self.pgid {
            let _ = signal::killpg(pgid, Signal::SIGKILL);
            for member in &self.members {
                let _ = waitpid(member.pid, None);
            }
        }
    }

    pub fn build(self) -> Option<ProcessGroup> {
        let pgid = self.pgid?;
        Some(ProcessGroup { pgid, members: self.members })
    }
}

/// Hands the terminal to `group`, waits for it to exit or stop and takes
/// the terminal back. With `resume` set the group is sent SIGCONT after
/// it owns the terminal; a group that already finished is only collected.
pub fn run_in_foreground(
    group: &mut ProcessGroup,
    terminal: &Terminal,
    foreground: &ForegroundGroup,
    resume: bool,
) -> nix::Result<GroupStatus> {
    if resume {
        group.drain_stops();
        if group.is_finished() {
            tracing::debug!(pgid = group.pgid().as_raw(), "group finished before resume");
            return Ok(GroupStatus::Exited(group.exit_code()));
        }
    }

    let pgid = group.pgid();
    foreground.set(pgid);
    if let Err(e) = terminal.give_to(pgid) {
        tracing::warn!(pgid = pgid.as_raw(), error = %e, "could not hand over terminal");
    }

    let status = if resume {
        match group.signal(Signal::SIGCONT) {
            // Exited since the drain; the wait below collects it.
            Ok(()) | Err(Errno::ESRCH) => group.wait(true),
            Err(e) => Err(e),
        }
    } else {
        group.wait(true)
    };

    if let Err(e) = terminal.reclaim() {
        tracing::warn!(error = %e, "could not reclaim terminal");
    }
    foreground.clear();
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn spawn_sh(script: &str) -> ProcessGroup {
        let argv = [
            CString::new("sh").unwrap(),
            CString::new("-c").unwrap(),
            CString::new(script).unwrap(),
        ];
        let path = CString::new("/bin/sh").unwrap();
        let mut builder = GroupBuilder::new(1);
        match builder.fork_member().unwrap() {
            ForkResult::Child => {
                let _ = unistd::execv(&path, &argv[..]);
                unsafe { libc::_exit(127) }
            }
            ForkResult::Parent { .. } => builder.build().unwrap(),
        }
    }

    #[test]
    fn test_first_member_leads_group() {
        let mut group = spawn_sh("exit 0");
        assert_eq!(group.pgid(), group.representative());
        assert_ne!(group.pgid(), unistd::getpgrp());
        assert_eq!(group.wait(true), Ok(GroupStatus::Exited(0)));
    }

    #[test]
    fn test_exit_code_reported() {
        let mut group = spawn_sh("exit 7");
        assert_eq!(group.wait(true), Ok(GroupStatus::Exited(7)));
        assert!(group.is_finished());
    }

    #[test]
    fn test_signal_death_maps_to_128_plus() {
        let mut group = spawn_sh("kill -TERM $$");
        assert_eq!(group.wait(true), Ok(GroupStatus::Exited(128 + 15)));
    }

    #[test]
    fn test_nonblocking_wait_on_live_group() {
        let mut group = spawn_sh("sleep 5");
        assert_eq!(group.wait(false), Ok(GroupStatus::Running));
        group.signal(Signal::SIGKILL).unwrap();
        assert_eq!(group.wait(true), Ok(GroupStatus::Exited(128 + 9)));
    }

    #[test]
    fn test_foreground_stop_then_resume() {
        let terminal = Terminal::non_interactive();
        let fg = ForegroundGroup::detached();
        let mut group = spawn_sh("kill -STOP $$; exit 4");

        let status = run_in_foreground(&mut group, &terminal, &fg, false).unwrap();
        assert_eq!(status, GroupStatus::Stopped(Signal::SIGSTOP));
        assert_eq!(fg.get(), None);
        assert!(!group.is_finished());

        let status = run_in_foreground(&mut group, &terminal, &fg, true).unwrap();
        assert_eq!(status, GroupStatus::Exited(4));
        assert_eq!(fg.get(), None);
    }

    #[test]
    fn test_non_interactive_terminal_is_inert() {
        let mut terminal = Terminal::non_interactive();
        assert!(!terminal.is_interactive());
        assert!(terminal.claim().is_ok());
        assert!(terminal.give_to(Pid::from_raw(1)).is_ok());
        assert!(terminal.reclaim().is_ok());
        assert!(terminal.wait_until_foreground().is_ok());
    }
}
