//! Handlers for `climalign runs list/describe/resume`.

use std::env;
use std::path::Path;
use std::process::Command;

use anyhow::{anyhow, Result};

use crate::cli::RunFormat;
use crate::manifest::ManifestEntry;
use crate::runs::{discover_runs, resolve_manifest, summaries};

pub fn list(root: &Path, format: RunFormat) -> Result<()> {
    let records = discover_runs(root)?;
    match format {
        RunFormat::Plain => {
            for record in &records {
                println!(
                    "{}  {}  {}  {}",
                    record.manifest.run_id, record.manifest.timestamp, record.manifest.command, record.path.display()
                );
            }
        }
        RunFormat::Json => {
            let summary = summaries(&records);
            serde_json::to_writer_pretty(std::io::stdout(), &summary)?;
            println!();
        }
    }
    Ok(())
}

pub fn describe(target: &str, root: &Path, format: RunFormat) -> Result<()> {
    let record = resolve_manifest(root, target)?;
    match format {
        RunFormat::Plain => describe_manifest(&record.manifest),
        RunFormat::Json => {
            serde_json::to_writer_pretty(std::io::stdout(), &record.manifest)?;
            println!();
        }
    }
    Ok(())
}

pub fn resume(root: &Path, manifest_target: &str, execute: bool) -> Result<()> {
    let record = resolve_manifest(root, manifest_target)?;
    describe_manifest(&record.manifest);
    if execute {
        resume_manifest(&record.manifest)?;
        println!("Manifest {} resumed", record.manifest.run_id);
    } else {
        println!("Manifest {} ready (not executed)", record.manifest.run_id);
    }
    Ok(())
}

fn describe_manifest(manifest: &ManifestEntry) {
    println!(
        "Run {} (cmd: `{}` @ v{} from {})",
        manifest.run_id, manifest.command, manifest.version, manifest.timestamp
    );
    if !manifest.params.is_empty() {
        println!("Parameters:");
        for param in &manifest.params {
            println!("  {} = {}", param.name, param.value);
        }
    }
    if !manifest.outputs.is_empty() {
        println!("Outputs:");
        for output in &manifest.outputs {
            println!("  {output}");
        }
    }
}

/// Re-invokes this binary with the recorded command and parameters, the way
/// `gat_cli::main::resume_manifest` does.
fn resume_manifest(manifest: &ManifestEntry) -> Result<()> {
    let mut args: Vec<String> = manifest.command.split_whitespace().map(String::from).collect();
    for param in &manifest.params {
        args.push(format!("--{}", param.name));
        args.push(param.value.clone());
    }
    let exe = env::current_exe()?;
    let status = Command::new(exe).args(&args).status()?;
    if !status.success() {
        return Err(anyhow!("resumed run failed with {status}"));
    }
    Ok(())
}
