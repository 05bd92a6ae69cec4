use std::io::{self, Write};

pub struct ShellPrompt {
    text: String,
}

impl ShellPrompt {
    pub fn new(text: &str) -> Self {
        ShellPrompt { text: text.to_string() }
    }

    pub fn show_prompt(&self) {
        let mut out = io::stdout().lock();
        let _ = out.write_all(self.text.as_bytes());
        let _ = out.flush();
    }
}
