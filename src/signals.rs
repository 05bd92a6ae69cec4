//! Shell-side handling of Ctrl-C and Ctrl-Z.
//!
//! The handlers only read the foreground group cell and send a signal.
//! Job state is never touched here; stops are observed by the wait in
//! the main loop.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicI32, Ordering};
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::unistd::Pid;

static FOREGROUND_PGID: AtomicI32 = AtomicI32::new(0);
static PROMPT: OnceLock<Box<[u8]>> = OnceLock::new();

const INTERRUPT_NOTICE: &[u8] = b"\nUse 'exit' to quit.\n";

/// Process group currently owning the terminal; empty means the shell.
#[derive(Debug, Clone, Copy)]
pub struct ForegroundGroup {
    cell: &'static AtomicI32,
}

impl ForegroundGroup {
    /// The cell read by the installed signal handlers.
    pub fn shared() -> Self {
        Self { cell: &FOREGROUND_PGID }
    }

    /// A private cell no handler looks at.
    pub fn detached() -> Self {
        Self { cell: Box::leak(Box::new(AtomicI32::new(0))) }
    }

    pub fn set(&self, pgid: Pid) {
        self.cell.store(pgid.as_raw(), Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.cell.store(0, Ordering::SeqCst);
    }

    pub fn get(&self) -> Option<Pid> {
        match self.cell.load(Ordering::SeqCst) {
            0 => None,
            pgid => Some(Pid::from_raw(pgid)),
        }
    }

    /// Sends `sig` to the whole foreground group. Returns false when the
    /// shell itself is in the foreground and nothing was sent.
    pub fn forward(&self, sig: Signal) -> bool {
        match self.get() {
            Some(pgid) => {
                let _ = signal::killpg(pgid, sig);
                true
            }
            None => false,
        }
    }
}

fn write_raw(bytes: &[u8]) {
    // SAFETY: write(2) is async-signal-safe and the buffer outlives the call.
    unsafe {
        libc::write(libc::STDOUT_FILENO, bytes.as_ptr().cast(), bytes.len());
    }
}

extern "C" fn on_interrupt(_: libc::c_int) {
    if !ForegroundGroup::shared().forward(Signal::SIGINT) {
        write_raw(INTERRUPT_NOTICE);
        if let Some(prompt) = PROMPT.get() {
            write_raw(prompt);
        }
    }
}

extern "C" fn on_stop(_: libc::c_int) {
    if !ForegroundGroup::shared().forward(Signal::SIGTSTP) {
        write_raw(b"\n");
        if let Some(prompt) = PROMPT.get() {
            write_raw(prompt);
        }
    }
}

/// Installs the shell's dispositions: terminal stop signals and SIGQUIT
/// are ignored, SIGINT and SIGTSTP are forwarded to the foreground group.
pub fn install_shell_handlers(prompt: &str) -> nix::Result<()> {
    let _ = PROMPT.set(prompt.as_bytes().into());

    let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
    let interrupt = SigAction::new(SigHandler::Handler(on_interrupt), SaFlags::SA_RESTART, SigSet::empty());
    let stop = SigAction::new(SigHandler::Handler(on_stop), SaFlags::SA_RESTART, SigSet::empty());

    // SAFETY: the handlers only perform async-signal-safe work.
    unsafe {
        signal::sigaction(Signal::SIGQUIT, &ignore)?;
        signal::sigaction(Signal::SIGTTOU, &ignore)?;
        signal::sigaction(Signal::SIGTTIN, &ignore)?;
        signal::sigaction(Signal::SIGINT, &interrupt)?;
        signal::sigaction(Signal::SIGTSTP, &stop)?;
    }
    tracing::debug!("shell signal handlers installed");
    Ok(())
}

/// Restores default dispositions in a forked stage before exec.
/// Ignored dispositions survive exec, so this must run in every child.
/// SIGPIPE is included because the Rust runtime ignores it.
pub fn reset_for_child() {
    let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());

    // SAFETY: installing SIG_DFL has no handler code to run.
    unsafe {
        for sig in [Signal::SIGINT, Signal::SIGTSTP, Signal::SIGQUIT, Signal::SIGTTIN, Signal::SIGTTOU, Signal::SIGPIPE] {
            let _ = signal::sigaction(sig, &default);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::CommandExt;
    use std::process::Command;
    use nix::sys::wait::{waitpid, WaitStatus};

    #[test]
    fn test_foreground_cell() {
        let fg = ForegroundGroup::detached();
        assert_eq!(fg.get(), None);
        fg.set(Pid::from_raw(4242));
        assert_eq!(fg.get(), Some(Pid::from_raw(4242)));
        fg.clear();
        assert_eq!(fg.get(), None);
    }

    #[test]
    fn test_forward_without_foreground_sends_nothing() {
        let fg = ForegroundGroup::detached();
        assert!(!fg.forward(Signal::SIGINT));
    }

    #[test]
    fn test_forward_reaches_whole_group() {
        let child = Command::new("sleep").arg("10").process_group(0).spawn().unwrap();
        let pid = Pid::from_raw(child.id() as i32);

        let fg = ForegroundGroup::detached();
        fg.set(pid);
        assert!(fg.forward(Signal::SIGTERM));

        let status = waitpid(pid, None).unwrap();
        assert_eq!(status, WaitStatus::Signaled(pid, Signal::SIGTERM, false));
    }

    // The only test touching the process-wide dispositions and the shared
    // cell; every case runs in sequence here.
    #[test]
    fn test_installed_handlers_use_shared_cell() {
        install_shell_handlers("jcsh> ").unwrap();
        let shared = ForegroundGroup::shared();

        let child = Command::new("sleep").arg("10").process_group(0).spawn().unwrap();
        let pid = Pid::from_raw(child.id() as i32);
        shared.set(pid);
        signal::raise(Signal::SIGINT).unwrap();
        shared.clear();
        assert_eq!(waitpid(pid, None).unwrap(), WaitStatus::Signaled(pid, Signal::SIGINT, false));

        // Nothing in the foreground: the shell absorbs both.
        signal::raise(Signal::SIGINT).unwrap();
        signal::raise(Signal::SIGTSTP).unwrap();
        assert_eq!(shared.get(), None);

        let child = Command::new("sleep").arg("10").process_group(0).spawn().unwrap();
        let pid = Pid::from_raw(child.id() as i32);
        shared.set(pid);
        signal::raise(Signal::SIGTSTP).unwrap();
        shared.clear();
        let status = waitpid(pid, Some(nix::sys::wait::WaitPidFlag::WUNTRACED)).unwrap();
        assert_eq!(status, WaitStatus::Stopped(pid, Signal::SIGTSTP));
        signal::kill(pid, Signal::SIGKILL).unwrap();
        let _ = waitpid(pid, None);
    }

    #[test]
    fn test_stop_is_forwarded_not_applied_to_caller() {
        let child = Command::new("sleep").arg("10").process_group(0).spawn().unwrap();
        let pid = Pid::from_raw(child.id() as i32);

        let fg = ForegroundGroup::detached();
        fg.set(pid);
        assert!(fg.forward(Signal::SIGSTOP));
        let status = waitpid(pid, Some(nix::sys::wait::WaitPidFlag::WUNTRACED)).unwrap();
        assert_eq!(status, WaitStatus::Stopped(pid, Signal::SIGSTOP));

        signal::kill(pid, Signal::SIGKILL).unwrap();
        let _ = waitpid(pid, None);
    }
}
