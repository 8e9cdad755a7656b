use crate::Cli;
use clap::Parser;
use std::error::Error;

#[derive(Parser)]
pub struct StreamsCmd {
    /// File path inside the image, e.g. `\foo\foobar.txt`.
    pub path: String,
}

pub fn streams(cmd: &StreamsCmd, cli: &Cli) -> Result<(), Box<dyn Error>> {
    let reader = cim::Reader::open(&cli.image, cli.open_options())?;
    let file = reader.root().open_at(&cmd.path)?;
    for name in file.read_streams()? {
        println!("{name}");
    }
    Ok(())
}
