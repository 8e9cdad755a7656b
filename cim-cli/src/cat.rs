use crate::Cli;
use clap::Parser;
use std::error::Error;
use std::io::Write;

#[derive(Parser)]
pub struct CatCmd {
    /// File path inside the image, e.g. `\foo\foobar.txt`.
    pub path: String,

    /// Read a named alternate stream instead of the default stream.
    #[arg(long)]
    pub stream: Option<String>,
}

pub fn cat(cmd: &CatCmd, cli: &Cli) -> Result<(), Box<dyn Error>> {
    let reader = cim::Reader::open(&cli.image, cli.open_options())?;
    let mut file = reader.root().open_at(&cmd.path)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let mut buf = [0u8; 64 * 1024];
    if let Some(name) = &cmd.stream {
        let mut stream = file.open_stream(name)?;
        loop {
            let n = stream.read(&mut buf)?;
            if n == 0 {
                break;
            }
            out.write_all(&buf[..n])?;
        }
    } else {
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            out.write_all(&buf[..n])?;
        }
    }
    Ok(())
}
