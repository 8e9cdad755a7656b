use crate::Cli;
use clap::Parser;
use std::error::Error;

#[derive(Parser)]
pub struct LsCmd {
    /// Directory path inside the image, e.g. `\foo\bar`.
    #[arg(default_value = "\\")]
    pub path: String,
}

pub fn ls(cmd: &LsCmd, cli: &Cli) -> Result<(), Box<dyn Error>> {
    let reader = cim::Reader::open(&cli.image, cli.open_options())?;
    let dir = reader.root().open_at(&cmd.path)?;
    for name in dir.readdir()? {
        println!("{name}");
    }
    Ok(())
}
