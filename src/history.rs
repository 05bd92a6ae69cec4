use std::fmt;

/// Bounded in-memory list of previously issued lines.
pub struct HistoryManager {
    entries: Vec<String>,
    max_len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    NoSuchEntry(String),
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryError::NoSuchEntry(n) => write!(f, "No such command in history: {}", n),
        }
    }
}

impl std::error::Error for HistoryError {}

impl HistoryManager {
    pub fn new(max_len: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_len: max_len.max(1),
        }
    }

    // Add a command to history
    pub fn add(&mut self, line: &str) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }
        // Do not add if it's the same as the previous entry
        if self.entries.last().is_some_and(|last| last == trimmed) {
            return;
        }
        self.entries.push(trimmed.to_string());
        // Remove oldest entries if exceeding the limit
        if self.entries.len() > self.max_len {
            self.entries.remove(0);
        }
    }

    pub fn list(&self) -> &[String] {
        &self.entries
    }

    /// 1-based lookup, as shown by `history`.
    pub fn get(&self, n: usize) -> Option<&str> {
        n.checked_sub(1)
            .and_then(|idx| self.entries.get(idx))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves a `!n` recall. Returns `Ok(None)` when the line is not a
    /// recall, so it should be used as typed.
    pub fn expand(&self, line: &str) -> Result<Option<String>, HistoryError> {
        let Some(rest) = line.trim().strip_prefix('!') else {
            return Ok(None);
        };
        rest.parse::<usize>()
            .ok()
            .and_then(|n| self.get(n))
            .map(|entry| Some(entry.to_string()))
            .ok_or_else(|| HistoryError::NoSuchEntry(rest.to_string()))
    }

    /// Lines as printed by the `history` built-in.
    pub fn render(&self) -> Vec<String> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, line)| format!("{}  {}", i + 1, line))
            .collect()
    }
}
