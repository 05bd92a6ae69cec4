use std::io::{self, BufRead};

/// Source of raw command lines.
pub struct InputHandler {
    reader: Box<dyn BufRead>,
}

impl InputHandler {
    pub fn stdin() -> Self {
        Self::from_reader(io::stdin().lock())
    }

    pub fn from_reader<R: BufRead + 'static>(reader: R) -> Self {
        Self { reader: Box::new(reader) }
    }

    /// Reads one line without its terminator. `None` at end of input.
    pub fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut buf = String::new();
        let bytes_read = self.reader.read_line(&mut buf)?;
        if bytes_read == 0 {
            // EOF (e.g., Ctrl-D)
            println!();
            return Ok(None);
        }
        Ok(Some(buf.trim_end_matches(['\n', '\r']).to_string()))
    }
}
