mod engine;
mod sql;
mod types;

pub use engine::{
    escape_php_single_quoted, remove_setup_script, write_setup_script, SetupScriptError,
    SetupScriptGenerator,
};
pub use sql::{relative_migration_path, split_statements};
pub use types::{SetupScriptContext, SETUP_SCRIPT_TEMPLATE};
