use clap::{Parser, Subcommand};

pub mod serve;

#[derive(Debug, Parser)]
#[command(name = "ingest-server", about = "Streaming sequence-read ingest API")]
pub struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Runs the ingest API server.
    Serve(serve::ServeArgs),
}

impl Args {
    pub fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Serve(args) => serve::run(args),
        }
    }
}
