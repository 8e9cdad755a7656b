mod cat;
mod cli;
mod ls;
mod stat;
mod streams;

pub use cli::Cli;
use cli::Commands;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = <Cli as clap::Parser>::parse();

    match &cli.command {
        Commands::Ls(cmd) => ls::ls(cmd, &cli),
        Commands::Cat(cmd) => cat::cat(cmd, &cli),
        Commands::Stat(cmd) => stat::stat(cmd, &cli),
        Commands::Streams(cmd) => streams::streams(cmd, &cli),
    }
}
