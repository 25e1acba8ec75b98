//! Best effort disassembly of engine program memory.
//!
//! Opcode patterns overlap (`rst`, `wait` and a ramp with no time all
//! encode as zero for example), so a word is reported with every mnemonic
//! whose pattern it matches rather than a guess.

use core::fmt::{self, Write};

use heapless::{String, Vec};

use crate::assembler::CompiledImage;
use crate::error::AssemblerErrorKind;
use crate::opcode::{Mnemonic, OpcodeTable, Pattern};
use crate::operand::Register;
use crate::{IMAGE_BYTES, NAME_CAP, PROGRAM_WORDS, ProgramWord, SEGMENT_CAP, WORD_BYTES};

/// Each mnemonic can match with its primary and its variant pattern.
pub const CANDIDATE_CAP: usize = 2 * Mnemonic::VARIANT_COUNT;

const END_INTERRUPT: ProgramWord = 1 << 12;
const END_RESET: ProgramWord = 1 << 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    Primary,
    Variant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub mnemonic: Mnemonic,
    pub form: Form,
    pub pattern: Pattern,
    /// Operand bits of the word under the pattern's mask.
    pub operand: ProgramWord,
}

impl Candidate {
    fn write_raw(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.form == Form::Variant {
            write!(f, " var")?;
        }
        if self.pattern.mask != 0 {
            write!(f, " {:#X}", self.operand)?;
        }
        Ok(())
    }
}

/// Single field forms are written back as source operands, the rest as
/// the raw operand bits.
impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic)?;
        match (self.mnemonic, self.form) {
            (Mnemonic::End, _) => {
                let flags = [(END_INTERRUPT, "i"), (END_RESET, "r")];
                let mut separator = " ";
                for (bit, flag) in flags {
                    if self.operand & bit != 0 {
                        write!(f, "{separator}{flag}")?;
                        separator = ", ";
                    }
                }
                Ok(())
            }
            (
                Mnemonic::LoadStart
                | Mnemonic::MapStart
                | Mnemonic::LoadEnd
                | Mnemonic::LoadAddr
                | Mnemonic::MapAddr
                | Mnemonic::MapSel
                | Mnemonic::SetPwm,
                Form::Primary,
            ) => write!(f, " {}", self.operand),
            (Mnemonic::SetPwm, Form::Variant) => match Register::from_index(self.operand) {
                Some(register) => write!(f, " {register}"),
                None => self.write_raw(f),
            },
            _ => self.write_raw(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// Word in the data area ahead of the first segment.
    Data,
    Candidates(Vec<Candidate, CANDIDATE_CAP>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingLine {
    pub address: ProgramWord,
    pub word: ProgramWord,
    pub decoded: Decoded,
}

impl fmt::Display for ListingLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}: {:04X}  ", self.address, self.word)?;
        match &self.decoded {
            Decoded::Data => write!(f, "dw {:#06X}", self.word),
            Decoded::Candidates(candidates) if candidates.is_empty() => write!(f, "?"),
            Decoded::Candidates(candidates) => {
                for (index, candidate) in candidates.iter().enumerate() {
                    if index > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{candidate}")?;
                }
                Ok(())
            }
        }
    }
}

/// A segment start. May lie past the last word when the segment is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentMarker {
    pub address: ProgramWord,
    pub name: String<NAME_CAP>,
}

type Markers = Vec<SegmentMarker, SEGMENT_CAP>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    lines: Vec<ListingLine, PROGRAM_WORDS>,
    /// Ordered by address, segments sharing an address keep table order.
    markers: Markers,
}

impl Listing {
    pub fn lines(&self) -> &[ListingLine] {
        &self.lines
    }

    pub fn markers(&self) -> &[SegmentMarker] {
        &self.markers
    }

    /// Addresses a segment marker was emitted at, in listing order.
    pub fn segment_markers(&self) -> impl Iterator<Item = ProgramWord> + '_ {
        self.markers.iter().map(|marker| marker.address)
    }
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut markers = self.markers.iter().peekable();
        for line in self.lines.iter() {
            while let Some(marker) = markers.next_if(|marker| marker.address <= line.address) {
                writeln!(f, ".segment {}", marker.name)?;
            }
            writeln!(f, "{line}")?;
        }
        for marker in markers {
            writeln!(f, ".segment {}", marker.name)?;
        }
        Ok(())
    }
}

fn insert_marker(markers: &mut Markers, marker: SegmentMarker) -> Result<(), AssemblerErrorKind> {
    let position = markers
        .iter()
        .position(|other| other.address > marker.address)
        .unwrap_or(markers.len());
    markers
        .insert(position, marker)
        .map_err(|_| AssemblerErrorKind::MaxSegmentsExceeded)
}

/// Decode `image` word by word.
///
/// `segments` holds the word addresses the loader starts engines at, they
/// are listed as `seg<N>`. Words before the lowest of them are treated as
/// data. With no segments at all every word is decoded as an instruction.
pub fn disassemble(
    table: &OpcodeTable,
    image: &[u8],
    segments: &[ProgramWord],
) -> Result<Listing, AssemblerErrorKind> {
    let mut markers = Markers::new();
    for (index, address) in segments.iter().enumerate() {
        let mut name = String::new();
        write!(name, "seg{index}").map_err(|_| AssemblerErrorKind::NameTooLong)?;
        insert_marker(&mut markers, SegmentMarker { address: *address, name })?;
    }
    decode_image(table, image, markers)
}

/// Like [`disassemble`], with the segment names carried by the image.
pub fn disassemble_image(table: &OpcodeTable, image: &CompiledImage) -> Result<Listing, AssemblerErrorKind> {
    let mut markers = Markers::new();
    for segment in image.segments.iter() {
        insert_marker(
            &mut markers,
            SegmentMarker {
                address: segment.address,
                name: segment.name.clone(),
            },
        )?;
    }
    decode_image(table, &image.bytes, markers)
}

fn decode_image(table: &OpcodeTable, image: &[u8], markers: Markers) -> Result<Listing, AssemblerErrorKind> {
    if image.len() % WORD_BYTES != 0 {
        return Err(AssemblerErrorKind::OddImageLength);
    }
    if image.len() > IMAGE_BYTES {
        return Err(AssemblerErrorKind::ProgramTooLarge);
    }
    let data_end = markers.first().map_or(0, |marker| marker.address);

    let mut listing = Listing {
        lines: Vec::new(),
        markers,
    };
    for (address, pair) in (0..).zip(image.chunks_exact(WORD_BYTES)) {
        let address: ProgramWord = address;
        let word = match pair {
            [high, low] => ProgramWord::from_be_bytes([*high, *low]),
            _ => return Err(AssemblerErrorKind::OddImageLength),
        };
        let decoded = if address < data_end {
            Decoded::Data
        } else {
            Decoded::Candidates(decode(table, word)?)
        };
        listing
            .lines
            .push(ListingLine {
                address,
                word,
                decoded,
            })
            .map_err(|_| AssemblerErrorKind::ProgramTooLarge)?;
    }
    Ok(listing)
}

/// Every table pattern `word` matches.
pub fn decode(table: &OpcodeTable, word: ProgramWord) -> Result<Vec<Candidate, CANDIDATE_CAP>, AssemblerErrorKind> {
    let mut candidates = Vec::new();
    for descriptor in table.iter() {
        let forms = [(Form::Primary, descriptor.primary), (Form::Variant, descriptor.variant)];
        for (form, pattern) in forms {
            let Some(pattern) = pattern.filter(|pattern| pattern.matches(word)) else {
                continue;
            };
            candidates
                .push(Candidate {
                    mnemonic: descriptor.mnemonic,
                    form,
                    pattern,
                    operand: pattern.operand_bits(word),
                })
                .map_err(|_| AssemblerErrorKind::TableMismatch)?;
        }
    }
    Ok(candidates)
}

#[cfg(test)]
mod test;
