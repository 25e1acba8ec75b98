use std::fs::{self, OpenOptions};
use std::io::{self, Write as _};
use std::path::Path;
use std::process::ExitCode;

use clap::Parser as _;
use flux_asm::artifact::{
    parse_hex_dump, write_c_header, write_c_source, write_frame, write_hex_dump,
};
use flux_asm::{CompiledImage, OpcodeTable, Program, WORD_BYTES, disassemble_image, parse};
use tracing::{debug, error, info};

mod cli;
mod error;

use cli::{Args, OutputPaths};
use error::CliError;

fn main() -> ExitCode {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_writer(io::stderr)
        .init();

    let result = if args.disassemble {
        list(&args)
    } else {
        build(&args)
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn build(args: &Args) -> Result<(), CliError> {
    let source = fs::read_to_string(&args.src).map_err(CliError::io(&args.src))?;
    let paths = OutputPaths::new(&args.src, args.out.as_deref())?;

    let table = OpcodeTable::new();
    let program = parse(&table, &source).map_err(|err| CliError::Assembly(err.to_string()))?;
    let image = program
        .assemble(&table)
        .map_err(|err| CliError::Assembly(err.to_string()))?;
    trace_instructions(&table, &program, &image);
    info!(
        "{}: {} words, {} segments",
        args.src.display(),
        image.word_count(),
        image.segments.len()
    );

    let mut hex = String::new();
    write_hex_dump(&mut hex, &image)?;
    write_artifact(&paths.hex(), &hex, false)?;

    if args.writes_c() {
        let fresh = !args.c_append;
        let mut source = String::new();
        write_c_source(&mut source, paths.name(), &image, fresh)?;
        let mut header = String::new();
        write_c_header(&mut header, paths.name(), &image, fresh)?;
        write_artifact(&paths.c_source(), &source, args.c_append)?;
        write_artifact(&paths.c_header(), &header, args.c_append)?;
    }

    if args.frame {
        let frame = write_frame(&image)?;
        write_artifact(&paths.frame(), &frame, false)?;
    }
    Ok(())
}

fn trace_instructions(table: &OpcodeTable, program: &Program<'_>, image: &CompiledImage) {
    for instruction in program.instructions() {
        let Some(mnemonic) = instruction.mnemonic else {
            continue;
        };
        let width = table
            .get(mnemonic)
            .map_or(0, |descriptor| usize::from(descriptor.words) * WORD_BYTES);
        let start = usize::from(instruction.address) * WORD_BYTES;
        let bytes = image.bytes.get(start..start + width).unwrap_or_default();
        debug!(
            line = instruction.line_number,
            "{:02X} {mnemonic} {:?} -> {bytes:02X?}",
            instruction.address,
            instruction.operands.as_slice(),
        );
    }
}

fn write_artifact(path: &Path, contents: impl AsRef<[u8]>, append: bool) -> Result<(), CliError> {
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(path)
        .map_err(CliError::io(path))?;
    file.write_all(contents.as_ref()).map_err(CliError::io(path))?;
    info!("wrote {}", path.display());
    Ok(())
}

fn list(args: &Args) -> Result<(), CliError> {
    let dump = fs::read_to_string(&args.src).map_err(CliError::io(&args.src))?;
    let image = parse_hex_dump(&dump)?;
    for segment in image.segments.iter() {
        info!("segment {} at {:02X}", segment.name, segment.address);
    }

    let table = OpcodeTable::new();
    let listing = disassemble_image(&table, &image)?;
    print!("{listing}");
    Ok(())
}
