use anyhow::Context;

use crate::cli::root_commands::DumpAstArgs;
use crate::inputs;

pub fn handle(args: &DumpAstArgs) -> anyhow::Result<()> {
    let tree = inputs::load_tree(&args.header, false)?;
    let json = if args.compact {
        serde_json::to_string(&tree)
    } else {
        tree.to_json()
    }
    .context("failed to serialize declaration tree")?;
    println!("{json}");
    Ok(())
}
