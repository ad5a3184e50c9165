use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = foldermark::cli::Cli::parse();
    foldermark::init(cli.verbosity(), cli.log_style())?;

    cli.run()
}
