use crate::config::Config;
use crate::executor::Terminal;
use crate::history::HistoryManager;
use crate::jobs::JobTable;
use crate::signals::ForegroundGroup;

/// Everything the read loop, the executor and the built-ins share.
pub struct ShellContext {
    pub jobs: JobTable,
    pub history: HistoryManager,
    pub terminal: Terminal,
    pub foreground: ForegroundGroup,
}

impl ShellContext {
    pub fn new(config: &Config, terminal: Terminal, foreground: ForegroundGroup) -> Self {
        Self {
            jobs: JobTable::new(config.max_jobs),
            history: HistoryManager::new(config.history_max),
            terminal,
            foreground,
        }
    }

    /// A context that never touches the controlling terminal or the cell
    /// the signal handlers read.
    pub fn non_interactive(config: &Config) -> Self {
        Self::new(config, Terminal::non_interactive(), ForegroundGroup::detached())
    }

    /// Reaps finished or stopped jobs and prints one line per change.
    pub fn report_jobs(&mut self) -> usize {
        let notices = self.jobs.reap();
        for notice in &notices {
            println!("{}", notice);
        }
        notices.len()
    }
}
