//! Build script rendering the `vmgate` manual pages.
//!
//! Writes `vmgate.1` for the top-level command and one `vmgate-<sub>.1` page
//! per subcommand into `OUT_DIR`, so packaging can pick them up.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Command, CommandFactory};
use clap_mangen::Man;

#[path = "src/cli/mod.rs"]
#[expect(dead_code, reason = "the build script only needs the parser definitions")]
mod cli;

fn render_page(dir: &Path, title: &str, command: Command) -> io::Result<()> {
    let mut buffer = Vec::new();
    Man::new(command).title(title).render(&mut buffer)?;
    fs::write(dir.join(format!("{title}.1")), buffer)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut stdout = io::stdout();
    writeln!(stdout, "cargo:rerun-if-changed=build.rs")?;
    writeln!(stdout, "cargo:rerun-if-changed=src/cli/mod.rs")?;

    let out_dir = env::var_os("OUT_DIR")
        .map(PathBuf::from)
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "OUT_DIR was not set"))?;

    let command = cli::Cli::command();
    for subcommand in command.get_subcommands() {
        let title = format!("{}-{}", command.get_name(), subcommand.get_name());
        render_page(&out_dir, &title, subcommand.clone())?;
    }
    render_page(&out_dir, command.get_name(), command.clone())?;

    Ok(())
}
