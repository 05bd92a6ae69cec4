use std::path::PathBuf;
use crate::ast::{CommandUnit, OutputMode, OutputRedirect, PipelineStage};
use crate::lexer::Token;
use super::ParseError;

struct PendingRedirect {
    op: &'static str,
    stage: usize,
    target: String,
}

/// Filter pass over one command-unit: control tokens and their operands
/// are pulled out and the remaining words become per-stage argv.
pub struct UnitParser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> UnitParser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn next(&mut self) -> Option<&'a Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect_target(&mut self, op: &str) -> Result<String, ParseError> {
        match self.tokens.get(self.pos) {
            Some(Token::Word(s)) => {
                self.pos += 1;
                Ok(s.clone())
            }
            _ => Err(ParseError::MissingRedirectTarget { op: op.to_string() }),
        }
    }

    pub fn parse(mut self) -> Result<CommandUnit, ParseError> {
        let mut stages = Vec::new();
        let mut argv: Vec<String> = Vec::new();
        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        let mut background = false;

        while let Some(tok) = self.next() {
            let at = self.pos - 1;
            match tok {
                Token::Word(s) => argv.push(s.clone()),
                Token::Pipe => {
                    let stage = PipelineStage::new(std::mem::take(&mut argv))
                        .ok_or(ParseError::EmptyStage { pos: at })?;
                    stages.push(stage);
                }
                Token::RedirectIn => {
                    let target = self.expect_target("<")?;
                    inputs.push(PendingRedirect { op: "<", stage: stages.len(), target });
                }
                Token::RedirectOut => {
                    let target = self.expect_target(">")?;
                    outputs.push((OutputMode::Truncate, PendingRedirect { op: ">", stage: stages.len(), target }));
                }
                Token::RedirectAppend => {
                    let target = self.expect_target(">>")?;
                    outputs.push((OutputMode::Append, PendingRedirect { op: ">>", stage: stages.len(), target }));
                }
                Token::Background if at == self.tokens.len() - 1 => background = true,
                Token::Background | Token::Semicolon => {
                    return Err(ParseError::UnexpectedToken { found: tok.to_string(), pos: at });
                }
            }
        }

        let last = PipelineStage::new(argv)
            .ok_or(ParseError::EmptyStage { pos: self.tokens.len() })?;
        stages.push(last);
        let last_stage = stages.len() - 1;

        if let Some(bad) = inputs.iter().find(|r| r.stage != 0) {
            return Err(ParseError::MisplacedRedirect { op: bad.op.to_string(), stage: bad.stage });
        }
        if let Some((_, bad)) = outputs.iter().find(|(_, r)| r.stage != last_stage) {
            return Err(ParseError::MisplacedRedirect { op: bad.op.to_string(), stage: bad.stage });
        }

        let display = self
            .tokens
            .iter()
            .map(Token::to_string)
            .collect::<Vec<_>>()
            .join(" ");

        Ok(CommandUnit {
            stages,
            background,
            stdin: inputs.pop().map(|r| PathBuf::from(r.target)),
            stdout: outputs.pop().map(|(mode, r)| OutputRedirect { path: PathBuf::from(r.target), mode }),
            display,
        })
    }
}
