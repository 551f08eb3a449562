pub mod extract;
pub mod list;
pub mod patch;

#[derive(clap::Subcommand)]
pub enum RafCommands {
    /// List the entries of a RAF archive
    List(list::ListArgs),
    /// Extract a RAF archive into a directory
    Extract(extract::ExtractArgs),
    /// Replace entry payloads inside a RAF archive
    Patch(patch::PatchArgs),
}

impl RafCommands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            RafCommands::List(list) => list.handle(),
            RafCommands::Extract(extract) => extract.handle(),
            RafCommands::Patch(patch) => patch.handle(),
        }
    }
}
