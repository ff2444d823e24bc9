use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;

/// Dispatch a parsed command to its handler module.
pub fn dispatch(command: &Commands, flags: &GlobalFlags) -> anyhow::Result<()> {
    match command {
        Commands::Generate(args) => commands::generate::handle(args, flags),
        Commands::CheckRules(args) => commands::check_rules::handle(args, flags),
        Commands::DumpAst(args) => commands::dump_ast::handle(args),
    }
}
