use std::fmt;
use std::path::PathBuf;

/// One program invocation; `argv[0]` is the program name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineStage {
    argv: Vec<String>,
}

impl PipelineStage {
    /// Returns `None` for an empty argument vector.
    pub fn new(argv: Vec<String>) -> Option<Self> {
        if argv.is_empty() {
            None
        } else {
            Some(PipelineStage { argv })
        }
    }

    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Truncate,
    Append,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRedirect {
    pub path: PathBuf,
    pub mode: OutputMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandUnit {
    pub stages: Vec<PipelineStage>,
    pub background: bool,
    /// Standard input of the first stage.
    pub stdin: Option<PathBuf>,
    /// Standard output of the last stage.
    pub stdout: Option<OutputRedirect>,
    /// The unit as typed, used for job listings.
    pub display: String,
}

impl CommandUnit {
    pub fn has_redirects(&self) -> bool {
        self.stdin.is_some() || self.stdout.is_some()
    }

    /// A unit built-ins may handle: one stage, no redirection, foreground.
    pub fn simple_stage(&self) -> Option<&PipelineStage> {
        match self.stages.as_slice() {
            [stage] if !self.background && !self.has_redirects() => Some(stage),
            _ => None,
        }
    }
}

impl fmt::Display for CommandUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display)
    }
}
