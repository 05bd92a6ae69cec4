use std::env;
use std::ffi::OsString;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

/// Looks a program name up the way `execvp` would: names containing a
/// slash are taken as paths, anything else is searched in `PATH`, where
/// entries without an execute bit are skipped.
#[derive(Debug, Clone, Default)]
pub struct PathResolver {
    search_path: Option<String>,
}

impl PathResolver {
    pub fn new() -> Self {
        Self { search_path: None }
    }

    /// Resolves against a fixed search path instead of `$PATH`.
    pub fn with_search_path(path: &str) -> Self {
        Self { search_path: Some(path.to_string()) }
    }

    pub fn resolve(&self, command: &str) -> Option<PathBuf> {
        if command.is_empty() {
            return None;
        }
        if command.contains('/') {
            let path = Path::new(command);
            return path.is_file().then(|| path.to_path_buf());
        }

        let paths = match &self.search_path {
            Some(p) => OsString::from(p),
            None => env::var_os("PATH")?,
        };
        env::split_paths(&paths)
            .map(|dir| dir.join(command))
            .find(|full_path| is_executable(full_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_program(path: &Path) {
        fs::write(path, "#!/bin/sh\n").unwrap();
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_resolve_from_search_path() {
        let dir = tempfile::tempdir().unwrap();
        write_program(&dir.path().join("tool"));
        let resolver = PathResolver::with_search_path(dir.path().to_str().unwrap());
        assert_eq!(resolver.resolve("tool"), Some(dir.path().join("tool")));
        assert_eq!(resolver.resolve("missing"), None);
    }

    #[test]
    fn test_first_match_wins() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        write_program(&first.path().join("tool"));
        write_program(&second.path().join("tool"));
        let search = format!("{}:{}", first.path().display(), second.path().display());
        let resolver = PathResolver::with_search_path(&search);
        assert_eq!(resolver.resolve("tool"), Some(first.path().join("tool")));
    }

    #[test]
    fn test_non_executable_match_is_skipped() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::write(first.path().join("tool"), "plain data").unwrap();
        write_program(&second.path().join("tool"));
        let search = format!("{}:{}", first.path().display(), second.path().display());
        let resolver = PathResolver::with_search_path(&search);
        assert_eq!(resolver.resolve("tool"), Some(second.path().join("tool")));

        let only_plain = PathResolver::with_search_path(first.path().to_str().unwrap());
        assert_eq!(only_plain.resolve("tool"), None);
    }

    #[test]
    fn test_directories_are_not_programs() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("tool")).unwrap();
        let resolver = PathResolver::with_search_path(dir.path().to_str().unwrap());
        assert_eq!(resolver.resolve("tool"), None);
    }

    #[test]
    fn test_slash_means_path() {
        let resolver = PathResolver::with_search_path("");
        assert_eq!(resolver.resolve("/bin/sh"), Some(PathBuf::from("/bin/sh")));
        assert_eq!(resolver.resolve("./definitely-not-here"), None);
        assert_eq!(resolver.resolve(""), None);
    }
}
