//! Registry of background and stopped jobs.
//!
//! Positions are handed out from 1 upwards and never reused or shifted,
//! so a job keeps the number it was announced with for the whole session.
//! Finished jobs stay behind as inert `Done` entries.

use std::fmt;
use nix::errno::Errno;
use crate::executor::{run_in_foreground, GroupStatus, ProcessGroup, Terminal};
use crate::signals::ForegroundGroup;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    Stopped,
    Done,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Running => f.pad("Running"),
            JobState::Stopped => f.pad("Stopped"),
            JobState::Done => f.pad("Done"),
        }
    }
}

#[derive(Debug)]
pub struct Job {
    id: usize,
    group: ProcessGroup,
    display: String,
    state: JobState,
}

impl Job {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn pgid(&self) -> nix::unistd::Pid {
        self.group.pgid()
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    fn is_live(&self) -> bool {
        self.state != JobState::Done
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {:<8} {}", self.id, self.state, self.display)
    }
}

/// A one-time state change found by `reap`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobNotice {
    pub id: usize,
    pub state: JobState,
    pub display: String,
}

impl fmt::Display for JobNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]+ {}  {}", self.id, self.state, self.display)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    TableFull,
    NoSuchJob(String),
    Wait(Errno),
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobError::TableFull => write!(f, "job table full"),
            JobError::NoSuchJob(id) => write!(f, "{}: no such job", id),
            JobError::Wait(e) => write!(f, "wait: {}", e.desc()),
        }
    }
}

impl std::error::Error for JobError {}

#[derive(Debug)]
pub struct JobTable {
    jobs: Vec<Job>,
    capacity: usize,
}

impl JobTable {
    pub fn new(capacity: usize) -> Self {
        Self { jobs: Vec::new(), capacity }
    }

    pub fn live_count(&self) -> usize {
        self.jobs.iter().filter(|job| job.is_live()).count()
    }

    pub fn has_room(&self) -> bool {
        self.live_count() < self.capacity
    }

    /// Adds a job and returns its 1-based position.
    pub fn register(&mut self, group: ProcessGroup, display: &str, state: JobState) -> Result<usize, JobError> {
        if !self.has_room() {
            return Err(JobError::TableFull);
        }
        let id = self.jobs.len() + 1;
        tracing::debug!(id, pgid = group.pgid().as_raw(), %state, "job registered");
        self.jobs.push(Job { id, group, display: display.to_string(), state });
        Ok(id)
    }

    pub fn get(&self, id: usize) -> Option<&Job> {
        id.checked_sub(1).and_then(|idx| self.jobs.get(idx))
    }

    /// Polls every live job without blocking. Each job that finished, or
    /// was stopped or continued behind our back, is reported once per change.
    pub fn reap(&mut self) -> Vec<JobNotice> {
        let mut notices = Vec::new();
        for job in self.jobs.iter_mut().filter(|job| job.is_live()) {
            let state = match job.group.wait(false) {
                Ok(GroupStatus::Running) => continue,
                Ok(GroupStatus::Stopped(_)) => JobState::Stopped,
                Ok(GroupStatus::Continued) => JobState::Running,
                Ok(GroupStatus::Exited(_)) => JobState::Done,
                Err(e) => {
                    tracing::warn!(id = job.id, error = %e, "reap failed");
                    continue;
                }
            };
            if state == job.state {
                continue;
            }
            tracing::debug!(id = job.id, from = %job.state, to = %state, "job changed state");
            job.state = state;
            notices.push(JobNotice { id: job.id, state, display: job.display.clone() });
        }
        notices
    }

    /// Live jobs in registration order.
    pub fn list(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter().filter(|job| job.is_live())
    }

    /// Brings a job to the foreground, continues it and waits until it
    /// exits or stops again.
    pub fn resume(
        &mut self,
        id: usize,
        terminal: &Terminal,
        foreground: &ForegroundGroup,
    ) -> Result<JobState, JobError> {
        let job = id
            .checked_sub(1)
            .and_then(|idx| self.jobs.get_mut(idx))
            .filter(|job| job.is_live())
            .ok_or_else(|| JobError::NoSuchJob(id.to_string()))?;

        job.state = JobState::Running;
        let status = run_in_foreground(&mut job.group, terminal, foreground, true)
            .map_err(JobError::Wait)?;
        job.state = match status {
            GroupStatus::Stopped(_) => JobState::Stopped,
            GroupStatus::Exited(_) => JobState::Done,
            GroupStatus::Running | GroupStatus::Continued => JobState::Running,
        };
        tracing::debug!(id, state = %job.state, "job resumed");
        Ok(job.state)
    }
}
