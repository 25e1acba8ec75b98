use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::error::{AssemblerError, AssemblerErrorKind};
use crate::parser::{Instruction, Segment, SymbolTable};
use crate::opcode::OpcodeTable;
use crate::{IMAGE_BYTES, PAGE_BYTES, ProgramWord, SEGMENT_CAP, WORD_BYTES};

pub type Image = Vec<u8, IMAGE_BYTES>;

/// Assembled program memory plus where each segment starts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledImage {
    pub bytes: Image,
    pub segments: Vec<Segment, SEGMENT_CAP>,
}

impl CompiledImage {
    pub fn segment_addresses(&self) -> Vec<ProgramWord, SEGMENT_CAP> {
        self.segments.iter().map(|segment| segment.address).collect()
    }

    /// Number of words, padding included.
    pub fn word_count(&self) -> usize {
        self.bytes.len() / WORD_BYTES
    }
}

/// Second pass: encode every instruction in address order.
///
/// The image is zero padded to a whole number of pages once the last
/// instruction is in. Segments are not padded individually, the segment
/// table is what tells a loader where each program starts.
pub fn assemble<'a>(
    table: &OpcodeTable,
    symbols: &SymbolTable<'a>,
    instructions: &[Instruction<'a>],
) -> Result<Image, AssemblerError<'a>> {
    let mut bytes = Image::new();
    for instruction in instructions {
        let Some(mnemonic) = instruction.mnemonic else {
            continue;
        };
        let descriptor = table.get(mnemonic).ok_or_else(|| {
            AssemblerError::Kind(AssemblerErrorKind::UnknownInstruction).with_instruction(instruction)
        })?;
        let encoded = (descriptor.encoder)(mnemonic, table, symbols, instruction)
            .map_err(|kind| AssemblerError::Kind(kind).with_instruction(instruction))?;
        bytes.extend_from_slice(&encoded).map_err(|_| {
            AssemblerError::Kind(AssemblerErrorKind::ProgramTooLarge).with_instruction(instruction)
        })?;
    }

    let padded = bytes.len().div_ceil(PAGE_BYTES) * PAGE_BYTES;
    bytes
        .resize(padded, 0)
        .map_err(|_| AssemblerError::Kind(AssemblerErrorKind::ProgramTooLarge))?;
    Ok(bytes)
}
