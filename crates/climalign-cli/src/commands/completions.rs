//! `climalign completions`: shell completion script generation, grounded on
//! `gat-cli`'s use of `clap_complete`.

use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use clap_complete::{generate, Shell};

use crate::cli::build_cli_command;

pub fn generate_completions(shell: Shell, out: Option<&Path>) -> Result<()> {
    let mut command = build_cli_command();
    let name = command.get_name().to_string();
    match out {
        Some(path) => {
            let mut file = std::fs::File::create(path)
                .with_context(|| format!("creating completions file '{}'", path.display()))?;
            generate(shell, &mut command, name, &mut file);
        }
        None => {
            generate(shell, &mut command, name, &mut io::stdout());
        }
    }
    Ok(())
}
