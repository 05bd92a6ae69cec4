use std::process;
use jcsh::config::{Config, ConfigLoader};
use jcsh::context::ShellContext;
use jcsh::error::ShellError;
use jcsh::executor::{DefaultExecutor, Terminal};
use jcsh::io::InputHandler;
use jcsh::logging;
use jcsh::prompt::ShellPrompt;
use jcsh::repl::Repl;
use jcsh::signals::{self, ForegroundGroup};

fn main() {
    let config = match ConfigLoader::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("jcsh: {}", ShellError::from(e));
            ConfigLoader::default_config()
        }
    };
    logging::init(&config.log_filter);

    let code = match run(config) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("jcsh: {}", e);
            1
        }
    };
    process::exit(code);
}

fn run(config: Config) -> Result<i32, ShellError> {
    let mut terminal = Terminal::detect();
    terminal.wait_until_foreground()?;
    signals::install_shell_handlers(&config.prompt)?;
    terminal.claim()?;
    tracing::info!(interactive = terminal.is_interactive(), pgid = terminal.shell_pgid().as_raw(), "shell started");

    let ctx = ShellContext::new(&config, terminal, ForegroundGroup::shared());
    let mut repl = Repl::new(
        DefaultExecutor::new(),
        ctx,
        ShellPrompt::new(&config.prompt),
        InputHandler::stdin(),
    );
    Ok(repl.run())
}
