use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use fatshell::shell::{command, Session};

#[derive(Parser)]
#[command(name = "fatshell")]
#[command(about = "Interactive shell over a raw FAT32 disk image", long_about = None)]
struct Cli {
    /// Path to the FAT32 image file
    #[arg(value_name = "IMAGE")]
    image: PathBuf,

    /// Log engine activity to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;

    // Startup failures (missing file, unreadable, invalid image) exit 1.
    let mut session = Session::new(&cli.image)
        .with_context(|| format!("Failed to open image '{}'", cli.image.display()))?;

    command::repl(&mut session)?;
    Ok(())
}
