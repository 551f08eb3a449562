use clap::Args;
use miette::{Context, IntoDiagnostic, Result};
use std::{fs::File, io::Write, path::PathBuf};
use tracing::info;

use league_raf::RafArchive;

#[derive(Args)]
pub struct ExtractArgs {
    /// An input RAF index file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// A target directory
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        let mut archive = RafArchive::open(&self.file)
            .into_diagnostic()
            .context(format!("path: {}", self.file.display()))?;

        let names: Vec<String> = archive.entries().map(|e| e.name.clone()).collect();
        for name in names {
            let content = archive.entry_bytes(&name).into_diagnostic()?;

            let p = self.directory.join(&name);
            info!("writing {}", p.display());

            if let Some(parent) = p.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let mut out = if !self.overwrite {
                File::create_new(&p)
                    .into_diagnostic()
                    .context(format!("creating {}", &p.display()))?
            } else {
                File::create(&p)
                    .into_diagnostic()
                    .context(format!("creating {}", &p.display()))?
            };

            out.write_all(&content).into_diagnostic()?;
        }
        Ok(())
    }
}
