use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::Level;

use crate::error::CliError;

#[derive(Parser, Debug)]
#[command(
    name = "fluxasm",
    version,
    about = "Assembler for the LP55xx LED driver program engines"
)]
pub struct Args {
    /// Engine program source, or a hex dump with --disassemble
    pub src: PathBuf,

    /// Output file name, defaults to the source file name
    #[arg(short, long = "out-file", value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Also write .c and .h files
    #[arg(short = 'c', long = "c-fmt")]
    pub c_fmt: bool,

    /// Append the C output to existing .c and .h files
    #[arg(short = 'a', long = "c-append")]
    pub c_append: bool,

    /// Also write a COBS framed postcard image for the serial loader
    #[arg(long)]
    pub frame: bool,

    /// Read a hex dump and print a listing instead of assembling
    #[arg(long, conflicts_with_all = ["out", "c_fmt", "c_append", "frame"])]
    pub disassemble: bool,

    /// One of `TRACE`, `DEBUG`, `INFO`, `WARN`, or `ERROR`
    #[arg(short, long, default_value_t = Level::INFO)]
    pub log_level: Level,
}

impl Args {
    pub fn writes_c(&self) -> bool {
        self.c_fmt || self.c_append
    }
}

/// Where the artifacts of one run go: `<dir>/<name>.<ext>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    dir: PathBuf,
    name: String,
}

impl OutputPaths {
    /// Directory and stem of `out` when given, of `src` otherwise.
    pub fn new(src: &Path, out: Option<&Path>) -> Result<Self, CliError> {
        let base = out.unwrap_or(src);
        let name = base
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| CliError::NoOutputName(base.display().to_string()))?;
        let dir = base.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(OutputPaths {
            dir,
            name: name.to_owned(),
        })
    }

    /// Symbol name used in the C output.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_extension(&self, extension: &str) -> PathBuf {
        self.dir.join(format!("{}.{extension}", self.name))
    }

    pub fn hex(&self) -> PathBuf {
        self.with_extension("hex")
    }

    pub fn c_source(&self) -> PathBuf {
        self.with_extension("c")
    }

    pub fn c_header(&self) -> PathBuf {
        self.with_extension("h")
    }

    pub fn frame(&self) -> PathBuf {
        self.with_extension("cobs")
    }
}

#[cfg(test)]
mod test;
