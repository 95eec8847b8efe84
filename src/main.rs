use clap::Parser;

fn main() -> anyhow::Result<()> {
    ingest_api::cmd::Args::parse().run()
}
