use clap::Args;
use miette::{Context, IntoDiagnostic, Result};
use std::{collections::HashMap, path::PathBuf};
use tracing::info;
use walkdir::WalkDir;

use league_manifest::ReleaseManifest;
use league_raf::{NullSizeSink, RafArchive, Replacement, UnsupportedMeshCodec};

#[derive(Args)]
pub struct PatchArgs {
    /// An input RAF index file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// A release manifest whose recorded sizes are kept in sync
    #[arg(short, long, value_name = "FILE")]
    manifest: Option<PathBuf>,

    /// Replace the entry whose short name is NAME with the content of FILE
    #[arg(short, long = "replace", value_name = "NAME=FILE", value_parser = parse_replace)]
    replace: Vec<(String, PathBuf)>,

    /// A directory whose files replace entries matching their file name
    #[arg(short, long, value_name = "DIR")]
    dir: Option<PathBuf>,
}

fn parse_replace(value: &str) -> std::result::Result<(String, PathBuf), String> {
    match value.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => {
            Ok((name.to_lowercase(), PathBuf::from(path)))
        }
        _ => Err("expected NAME=FILE".to_owned()),
    }
}

impl PatchArgs {
    pub fn handle(&self) -> Result<()> {
        let mut replacements = HashMap::new();
        for (name, path) in &self.replace {
            let content = std::fs::read(path)
                .into_diagnostic()
                .context(format!("reading {}", path.display()))?;
            replacements.insert(name.clone(), Replacement::Raw(content));
        }
        if let Some(dir) = &self.dir {
            for entry in WalkDir::new(dir)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| !e.file_type().is_dir())
            {
                let name = entry.file_name().to_string_lossy().to_lowercase();
                let content = std::fs::read(entry.path())
                    .into_diagnostic()
                    .context(format!("reading {}", entry.path().display()))?;
                replacements.insert(name, Replacement::Raw(content));
            }
        }
        if replacements.is_empty() {
            miette::bail!("no replacements supplied, use --replace or --dir");
        }

        let mut archive = RafArchive::open(&self.file)
            .into_diagnostic()
            .context(format!("path: {}", self.file.display()))?;

        match &self.manifest {
            Some(path) => {
                let mut manifest = ReleaseManifest::open(path)
                    .into_diagnostic()
                    .context(format!("path: {}", path.display()))?;
                archive
                    .patch(&replacements, &UnsupportedMeshCodec, &mut manifest)
                    .into_diagnostic()?;
                manifest.flush().into_diagnostic()?;
            }
            None => {
                archive
                    .patch(&replacements, &UnsupportedMeshCodec, &mut NullSizeSink)
                    .into_diagnostic()?;
            }
        }

        info!("patched {}", self.file.display());
        Ok(())
    }
}
