use crate::Cli;
use clap::Parser;
use std::error::Error;

#[derive(Parser)]
pub struct StatCmd {
    /// File or directory path inside the image, e.g. `\foo`.
    #[arg(default_value = "\\")]
    pub path: String,
}

pub fn stat(cmd: &StatCmd, cli: &Cli) -> Result<(), Box<dyn Error>> {
    let reader = cim::Reader::open(&cli.image, cli.open_options())?;
    let file = reader.root().open_at(&cmd.path)?;
    let info = file.stat()?;

    println!("size:              {}", info.size);
    println!(
        "attributes:        read_only={} hidden={} system={} archive={} sparse={}",
        info.attributes.read_only(),
        info.attributes.hidden(),
        info.attributes.system(),
        info.attributes.archive(),
        info.attributes.sparse(),
    );
    println!("creation time:     {}", info.creation_time);
    println!("last write time:   {}", info.last_write_time);
    println!("change time:       {}", info.change_time);
    println!("last access time:  {}", info.last_access_time);
    println!(
        "security descriptor: {} bytes",
        info.security_descriptor.map_or(0, |b| b.len())
    );
    println!(
        "extended attributes: {} bytes",
        info.extended_attributes.map_or(0, |b| b.len())
    );
    println!(
        "reparse buffer:      {} bytes",
        info.reparse_buffer.map_or(0, |b| b.len())
    );
    Ok(())
}
