#![no_std]

#![cfg_attr(
    not(test),
    deny(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::todo,
        clippy::unimplemented,
        clippy::indexing_slicing,
        clippy::string_slice,
        clippy::panicking_unwrap,
        clippy::out_of_bounds_indexing,
        clippy::panic_in_result_fn,
        clippy::unwrap_in_result,
    )
)]
#![cfg_attr(not(test), warn(clippy::missing_panics_doc))]

//! Two pass assembler for the programmable LED engines found in the
//! LP55xx family of LED drivers.
//!
//! Engine programs are written one instruction per line:
//! ```text
//!     m0:  dw 1
//!     all: dw 111111111b
//!     .segment blink
//!          map_addr all
//!     top: ramp 0.5, 100
//!          ramp 0.5, -100
//!          branch 0, top
//! ```
//! The first pass (`parser`) assigns every instruction a word address and
//! records labels and segments. The second pass (`assembler`) runs the
//! encoder selected by the `opcode` table for each instruction and packs
//! the results into a page aligned byte image. `disassembler` goes the
//! other way, best effort, and `artifact` renders images into the text
//! formats loaders consume.
//!
//! Nothing in here allocates, logs or panics. All storage is bounded by
//! the capacities below, which match the 256 word engine SRAM.

pub mod artifact;
pub mod assembler;
pub mod disassembler;
pub mod encoder;
pub mod error;
pub mod opcode;
pub mod operand;
pub mod parser;


pub use assembler::{CompiledImage, assemble};
pub use disassembler::{Listing, disassemble, disassemble_image};
pub use error::{AssemblerError, AssemblerErrorKind};
pub use opcode::{Mnemonic, OpcodeTable};
pub use parser::{Instruction, Program, Segment, SymbolTable, parse};

/// One engine instruction. Also used for word addresses.
pub type ProgramWord = u16;

/// Bytes per encoded word, most significant byte first.
pub const WORD_BYTES: usize = 2;
/// Words of engine program memory.
pub const PROGRAM_WORDS: usize = 256;
/// Largest image the assembler will produce.
pub const IMAGE_BYTES: usize = PROGRAM_WORDS * WORD_BYTES;
/// Images are zero padded to a multiple of this.
pub const PAGE_BYTES: usize = 16;
/// Number of execution engines on the chip.
pub const ENGINE_COUNT: usize = 3;

pub const LABEL_CAP: usize = 256;
pub const INSTRUCTION_CAP: usize = 512;
pub const SEGMENT_CAP: usize = 16;
pub const MAX_OPERANDS: usize = 6;
pub const NAME_CAP: usize = 32;
