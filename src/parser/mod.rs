mod unit;

pub use unit::UnitParser;

use std::fmt;
use crate::ast::CommandUnit;
use crate::lexer::Token;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    EmptyStage {
        pos: usize,
    },
    MissingRedirectTarget {
        op: String,
    },
    MisplacedRedirect {
        op: String,
        stage: usize,
    },
    UnexpectedToken {
        found: String,
        pos: usize,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::EmptyStage { pos } => {
                write!(f, "Empty command in pipeline at position {}", pos)
            }
            ParseError::MissingRedirectTarget { op } => {
                write!(f, "No file specified after '{}'", op)
            }
            ParseError::MisplacedRedirect { op, stage } => {
                write!(f, "Redirection '{}' not allowed on pipeline stage {}", op, stage + 1)
            }
            ParseError::UnexpectedToken { found, pos } => {
                write!(f, "Unexpected token '{}' at position {}", found, pos)
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Partitions a token sequence on `;` into command-units.
///
/// Order is preserved and empty units (`;;`, leading or trailing `;`) are
/// dropped.
pub fn split_units(tokens: &[Token]) -> Vec<&[Token]> {
    tokens
        .split(|t| *t == Token::Semicolon)
        .filter(|unit| !unit.is_empty())
        .collect()
}

/// Builds a `CommandUnit` from the tokens of one `;`-delimited segment.
pub fn parse_unit(tokens: &[Token]) -> Result<CommandUnit, ParseError> {
    UnitParser::new(tokens).parse()
}

/// Splits and parses a whole line. Parsing stops at the first bad unit.
pub fn parse_line(tokens: &[Token]) -> Result<Vec<CommandUnit>, ParseError> {
    split_units(tokens).into_iter().map(parse_unit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{OutputMode, OutputRedirect};
    use crate::lexer::Lexer;
    use std::path::PathBuf;

    fn lex(src: &str) -> Vec<Token> {
        Lexer::tokenize(src).unwrap()
    }

    fn argvs(unit: &CommandUnit) -> Vec<Vec<&str>> {
        unit.stages
            .iter()
            .map(|s| s.argv().iter().map(String::as_str).collect())
            .collect()
    }

    #[test]
    fn test_split_units_preserves_order() {
        let tokens = lex("echo a ; echo b c;ls");
        let units = split_units(&tokens);
        assert_eq!(units.len(), 3);
        assert_eq!(units[0], &lex("echo a")[..]);
        assert_eq!(units[1], &lex("echo b c")[..]);
        assert_eq!(units[2], &lex("ls")[..]);
    }

    #[test]
    fn test_split_units_skips_empty() {
        let tokens = lex("; ; echo a ;; ;");
        let units = split_units(&tokens);
        assert_eq!(units, vec![&lex("echo a")[..]]);
        assert!(split_units(&lex(";;;")).is_empty());
    }

    #[test]
    fn test_simple_command() {
        let unit = parse_unit(&lex("grep -n foo bar.txt")).unwrap();
        assert_eq!(argvs(&unit), vec![vec!["grep", "-n", "foo", "bar.txt"]]);
        assert!(!unit.background);
        assert!(!unit.has_redirects());
        assert_eq!(unit.display, "grep -n foo bar.txt");
    }

    #[test]
    fn test_pipeline_stages() {
        let unit = parse_unit(&lex("cat f | grep x | wc -l")).unwrap();
        assert_eq!(
            argvs(&unit),
            vec![vec!["cat", "f"], vec!["grep", "x"], vec!["wc", "-l"]]
        );
    }

    #[test]
    fn test_redirects_are_stripped_from_argv() {
        let unit = parse_unit(&lex("sort < in.txt -r > out.txt")).unwrap();
        assert_eq!(argvs(&unit), vec![vec!["sort", "-r"]]);
        assert_eq!(unit.stdin, Some(PathBuf::from("in.txt")));
        assert_eq!(
            unit.stdout,
            Some(OutputRedirect { path: PathBuf::from("out.txt"), mode: OutputMode::Truncate })
        );
    }

    #[test]
    fn test_append_redirect() {
        let unit = parse_unit(&lex("echo hi >> log.txt")).unwrap();
        assert_eq!(unit.stdout.unwrap().mode, OutputMode::Append);
    }

    #[test]
    fn test_last_redirect_wins() {
        let unit = parse_unit(&lex("echo hi > a > b")).unwrap();
        assert_eq!(unit.stdout.unwrap().path, PathBuf::from("b"));
    }

    #[test]
    fn test_pipeline_redirects_on_outer_stages() {
        let unit = parse_unit(&lex("cat < in | tr a b | wc >> out")).unwrap();
        assert_eq!(unit.stdin, Some(PathBuf::from("in")));
        assert_eq!(unit.stdout.unwrap().path, PathBuf::from("out"));
        assert_eq!(unit.stages.len(), 3);
    }

    #[test]
    fn test_redirect_on_inner_stage_is_error() {
        assert_eq!(
            parse_unit(&lex("cat | wc < in")),
            Err(ParseError::MisplacedRedirect { op: "<".to_string(), stage: 1 })
        );
        assert_eq!(
            parse_unit(&lex("cat > out | wc")),
            Err(ParseError::MisplacedRedirect { op: ">".to_string(), stage: 0 })
        );
    }

    #[test]
    fn test_missing_redirect_target() {
        assert_eq!(
            parse_unit(&lex("cat <")),
            Err(ParseError::MissingRedirectTarget { op: "<".to_string() })
        );
        assert_eq!(
            parse_unit(&lex("echo > | wc")),
            Err(ParseError::MissingRedirectTarget { op: ">".to_string() })
        );
    }

    #[test]
    fn test_background_marker() {
        let unit = parse_unit(&lex("sleep 5 &")).unwrap();
        assert!(unit.background);
        assert_eq!(argvs(&unit), vec![vec!["sleep", "5"]]);
        assert_eq!(unit.display, "sleep 5 &");
    }

    #[test]
    fn test_background_must_be_trailing() {
        assert_eq!(
            parse_unit(&lex("sleep & 5")),
            Err(ParseError::UnexpectedToken { found: "&".to_string(), pos: 1 })
        );
    }

    #[test]
    fn test_empty_stage_is_error() {
        assert_eq!(parse_unit(&lex("| wc")), Err(ParseError::EmptyStage { pos: 0 }));
        assert_eq!(parse_unit(&lex("ls |")), Err(ParseError::EmptyStage { pos: 2 }));
        assert_eq!(parse_unit(&lex("&")), Err(ParseError::EmptyStage { pos: 1 }));
    }

    #[test]
    fn test_parse_line_sequence() {
        let units = parse_line(&lex("echo a > f ; cat f | wc -c ; sleep 1 &")).unwrap();
        assert_eq!(units.len(), 3);
        assert!(units[0].stdout.is_some());
        assert_eq!(units[1].stages.len(), 2);
        assert!(units[2].background);
    }

    #[test]
    fn test_parsing_does_not_touch_tokens() {
        let tokens = lex("cat < in | wc > out");
        let before = tokens.clone();
        let _ = parse_unit(&tokens).unwrap();
        assert_eq!(tokens, before);
    }
}
