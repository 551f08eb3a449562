use clap::Args;
use miette::{Context, IntoDiagnostic, Result};
use std::path::PathBuf;

use league_raf::{human_size, RafArchive};

#[derive(Args)]
pub struct ListArgs {
    /// An input RAF index file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,
}

impl ListArgs {
    pub fn handle(&self) -> Result<()> {
        let archive = RafArchive::open(&self.file)
            .into_diagnostic()
            .context(format!("path: {}", self.file.display()))?;

        let mut total = 0u64;
        for entry in archive.entries() {
            println!("{entry}");
            total += entry.size as u64;
        }
        println!(
            "{} entries of total size {}",
            archive.len(),
            human_size(total)
        );
        Ok(())
    }
}
