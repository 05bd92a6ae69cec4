mod token;

pub use token::Token;

use std::fmt;

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum LexError {
    UnterminatedQuote(char, usize),
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::UnterminatedQuote(c, pos) => {
                write!(f, "Unterminated quote '{}' starting at position {}", c, pos)
            }
        }
    }
}

impl std::error::Error for LexError {}

pub struct Lexer;

impl Lexer {
    /// Splits one input line into words and control operators.
    ///
    /// Operators are recognised with or without surrounding whitespace
    /// (`a|b` and `a | b` are the same). Quoted text is always part of a
    /// word, so `'|'` is an argument and not a pipe.
    pub fn tokenize(line: &str) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        let mut chars = line.char_indices().peekable();
        let mut buf = String::new();
        // A quoted empty string ("") is still a word.
        let mut quoted = false;

        fn flush(buf: &mut String, quoted: &mut bool, tokens: &mut Vec<Token>) {
            if !buf.is_empty() || *quoted {
                tokens.push(Token::Word(std::mem::take(buf)));
                *quoted = false;
            }
        }

        while let Some(&(pos, ch)) = chars.peek() {
            match ch {
                ' ' | '\t' | '\n' | '\r' => {
                    flush(&mut buf, &mut quoted, &mut tokens);
                    chars.next();
                }
                '|' => {
                    flush(&mut buf, &mut quoted, &mut tokens);
                    chars.next();
                    tokens.push(Token::Pipe);
                }
                ';' => {
                    flush(&mut buf, &mut quoted, &mut tokens);
                    chars.next();
                    tokens.push(Token::Semicolon);
                }
                '&' => {
                    flush(&mut buf, &mut quoted, &mut tokens);
                    chars.next();
                    tokens.push(Token::Background);
                }
                '<' => {
                    flush(&mut buf, &mut quoted, &mut tokens);
                    chars.next();
                    tokens.push(Token::RedirectIn);
                }
                '>' => {
                    flush(&mut buf, &mut quoted, &mut tokens);
                    chars.next();
                    if matches!(chars.peek(), Some(&(_, '>'))) {
                        chars.next();
                        tokens.push(Token::RedirectAppend);
                    } else {
                        tokens.push(Token::RedirectOut);
                    }
                }
                '"' | '\'' => {
                    let quote = ch;
                    chars.next();
                    quoted = true;
                    let mut closed = false;
                    for (_, nc) in chars.by_ref() {
                        if nc == quote {
                            closed = true;
                            break;
                        }
                        buf.push(nc);
                    }
                    if !closed {
                        return Err(LexError::UnterminatedQuote(quote, pos));
                    }
                }
                _ => {
                    buf.push(ch);
                    chars.next();
                }
            }
        }
        flush(&mut buf, &mut quoted, &mut tokens);

        Ok(tokens)
    }
}
