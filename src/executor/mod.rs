mod executor;
mod default_executor;
mod builtins;
mod path_resolver;
mod pipeline;
mod process_group;

pub use executor::{Executor, ExecError, ExecOutcome, ExecStatus};
pub use default_executor::DefaultExecutor;
pub use builtins::{BuiltinCommand, BuiltinManager};
pub use path_resolver::PathResolver;
pub use pipeline::{spawn as spawn_pipeline, EXIT_NOT_EXECUTABLE, EXIT_NOT_FOUND, EXIT_REDIRECT_FAILED};
pub use process_group::{run_in_foreground, GroupBuilder, GroupStatus, ProcessGroup, Terminal};
