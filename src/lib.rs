pub mod ast;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod history;
pub mod io;
pub mod jobs;
pub mod lexer;
pub mod logging;
pub mod parser;
pub mod prompt;
pub mod repl;
pub mod signals;
