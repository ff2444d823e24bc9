//! Input discovery and loading: headers, header directories, JSON tree dumps.

use std::path::{Path, PathBuf};

use anyhow::Context;
use ignore::WalkBuilder;
use sipgen_model::AstNode;
use tracing::debug;

/// Expand directories into the headers below them; files pass through.
///
/// Directory walks respect `.gitignore` and `.sipgenignore` and are sorted,
/// so output order does not depend on the filesystem.
pub fn expand(inputs: &[PathBuf], json_ast: bool) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            files.push(input.clone());
            continue;
        }
        let mut found = Vec::new();
        for entry in WalkBuilder::new(input)
            .add_custom_ignore_filename(".sipgenignore")
            .build()
        {
            let entry = entry.with_context(|| format!("failed to walk {}", input.display()))?;
            let path = entry.path();
            let wanted = if json_ast {
                path.extension().is_some_and(|ext| ext == "json")
            } else {
                sipgen_parser::is_header(path)
            };
            if wanted && entry.file_type().is_some_and(|t| t.is_file()) {
                found.push(path.to_path_buf());
            }
        }
        found.sort();
        debug!(dir = %input.display(), files = found.len(), "expanded input directory");
        files.extend(found);
    }
    Ok(files)
}

/// Parse a header, or deserialize a JSON tree dump.
pub fn load_tree(path: &Path, json_ast: bool) -> anyhow::Result<AstNode> {
    if json_ast {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        AstNode::from_json(&text)
            .with_context(|| format!("invalid declaration tree in {}", path.display()))
    } else {
        sipgen_parser::parse_file(path).with_context(|| format!("failed to parse {}", path.display()))
    }
}

/// Header name for `%TypeHeaderCode`: the file name, or `<stem>.h` for dumps.
pub fn header_name(path: &Path, json_ast: bool) -> String {
    let name = if json_ast {
        path.file_stem()
            .map(|stem| format!("{}.h", stem.to_string_lossy()))
    } else {
        path.file_name().map(|name| name.to_string_lossy().into_owned())
    };
    name.unwrap_or_default()
}
