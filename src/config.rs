use std::{ io, fmt };
use std::io::{ BufRead, BufReader };
use std::fs::File;
use std::path::{ Path, PathBuf };

pub const DEFAULT_PROMPT: &str = "jcsh> ";
pub const HISTORY_SIZE: usize = 100;
pub const MAX_JOBS: usize = 20;
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Environment variable naming an alternative rc file.
pub const CONFIG_ENV: &str = "JCSH_CONFIG";
const RC_FILE: &str = ".jcshrc";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub prompt: String,
    pub history_max: usize,
    pub max_jobs: usize,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        ConfigLoader::default_config()
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn default_config() -> Config {
        Config {
            prompt: DEFAULT_PROMPT.to_string(),
            history_max: HISTORY_SIZE,
            max_jobs: MAX_JOBS,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }

    /// `$JCSH_CONFIG`, else `$HOME/.jcshrc`.
    pub fn default_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        std::env::var_os("HOME").map(|home| Path::new(&home).join(RC_FILE))
    }

    /// Loads the rc file if there is one. A missing file is not an error.
    pub fn load() -> Result<Config, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from_file(path),
            _ => Ok(Self::default_config()),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let file = File::open(path).map_err(ConfigError::Io)?;
        let mut src = String::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(ConfigError::Io)?;
            src.push_str(&line);
            src.push('\n');
        }
        Self::load_from_str(&src)
    }

    pub fn load_from_str(src: &str) -> Result<Config, ConfigError> {
        let mut config = Self::default_config();

        for (lineno, line) in src.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::Parse(format!("Line {}: No '=' found: {}", lineno + 1, line)));
            };
            let key = key.trim();

            match key {
                // The prompt keeps its trailing whitespace.
                "prompt" => config.prompt = value.trim_start().to_string(),
                "history_max" => config.history_max = parse_count(value, lineno, line)?,
                "max_jobs" => config.max_jobs = parse_count(value, lineno, line)?,
                "log" => config.log_filter = value.trim().to_string(),
                _ => return Err(ConfigError::Parse(format!("Line {}: Unknown key: {}", lineno + 1, key))),
            }
        }

        Ok(config)
    }
}

fn parse_count(value: &str, lineno: usize, line: &str) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::Parse(format!("Line {}: Invalid count: {}", lineno + 1, line))),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_source_gives_defaults() {
        let config = ConfigLoader::load_from_str("").unwrap();
        assert_eq!(config, ConfigLoader::default_config());
        assert_eq!(config.max_jobs, MAX_JOBS);
        assert_eq!(config.history_max, HISTORY_SIZE);
    }

    #[test]
    fn test_all_keys() {
        let src = "# comment\n\nprompt=my> \nhistory_max = 5\nmax_jobs=3\nlog=jcsh=debug\n";
        let config = ConfigLoader::load_from_str(src).unwrap();
        assert_eq!(config.prompt, "my> ");
        assert_eq!(config.history_max, 5);
        assert_eq!(config.max_jobs, 3);
        assert_eq!(config.log_filter, "jcsh=debug");
    }

    #[test]
    fn test_unknown_key() {
        let err = ConfigLoader::load_from_str("colour=red").unwrap_err();
        assert!(err.to_string().contains("Unknown key: colour"));
    }

    #[test]
    fn test_missing_equals() {
        let err = ConfigLoader::load_from_str("prompt=a\nnonsense").unwrap_err();
        assert!(err.to_string().contains("Line 2"));
    }

    #[test]
    fn test_invalid_count() {
        assert!(ConfigLoader::load_from_str("max_jobs=0").is_err());
        assert!(ConfigLoader::load_from_str("history_max=lots").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_jobs=7").unwrap();
        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(config.max_jobs, 7);
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigLoader::load_from_file(dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
