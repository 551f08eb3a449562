pub mod raf;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Handle RAF archive index/data pairs
    Raf {
        #[command(subcommand)]
        command: raf::RafCommands,
    },
}

impl Commands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            Commands::Raf { command } => command.handle(),
        }
    }
}
