use core::fmt;

use heapless::{String, Vec};
use serde::{Deserialize, Serialize};

use crate::assembler::{self, CompiledImage};
use crate::error::{AssemblerError, AssemblerErrorKind};
use crate::opcode::{Mnemonic, OpcodeTable};
use crate::operand::is_identifier;
use crate::{INSTRUCTION_CAP, LABEL_CAP, MAX_OPERANDS, NAME_CAP, PROGRAM_WORDS, ProgramWord, SEGMENT_CAP};

/// One source line that defines a label, opens a segment or holds an
/// instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction<'a> {
    pub line_number: u32,
    /// Source text with the comment removed.
    pub line: &'a str,
    /// Word address the instruction is placed at.
    pub address: ProgramWord,
    /// Start of the segment the instruction belongs to.
    pub segment_base: ProgramWord,
    /// `None` for lines that only carry labels.
    pub mnemonic: Option<Mnemonic>,
    pub operands: Vec<&'a str, MAX_OPERANDS>,
}

impl fmt::Display for Instruction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "- addr: {:02X}", self.address)?;
        writeln!(f, "- prg: {:02X}", self.segment_base)?;
        match self.mnemonic {
            Some(mnemonic) => writeln!(f, "- op: {mnemonic}")?,
            None => writeln!(f, "- op: none")?,
        }
        write!(f, "- args: [")?;
        for (index, operand) in self.operands.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{operand}")?;
        }
        write!(f, "]")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label<'a> {
    pub name: &'a str,
    pub address: ProgramWord,
}

/// Label name to word address. Names are case sensitive and unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable<'a> {
    labels: Vec<Label<'a>, LABEL_CAP>,
}

impl<'a> SymbolTable<'a> {
    pub fn new() -> Self {
        Self { labels: Vec::new() }
    }

    pub fn insert(&mut self, name: &'a str, address: ProgramWord) -> Result<(), AssemblerErrorKind> {
        if name.len() > NAME_CAP {
            return Err(AssemblerErrorKind::NameTooLong);
        }
        if self.get(name).is_some() {
            return Err(AssemblerErrorKind::DuplicateLabel);
        }
        self.labels
            .push(Label { name, address })
            .map_err(|_| AssemblerErrorKind::MaxLabelsExceeded)
    }

    pub fn get(&self, name: &str) -> Option<ProgramWord> {
        self.labels
            .iter()
            .find(|label| label.name == name)
            .map(|label| label.address)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Label<'a>> {
        self.labels.iter()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// An independently started program inside one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub name: String<NAME_CAP>,
    pub address: ProgramWord,
}

/// Result of the first pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program<'a> {
    instructions: Vec<Instruction<'a>, INSTRUCTION_CAP>,
    symbols: SymbolTable<'a>,
    segments: Vec<Segment, SEGMENT_CAP>,
}

impl<'a> Program<'a> {
    pub fn instructions(&self) -> &[Instruction<'a>] {
        &self.instructions
    }

    pub fn symbols(&self) -> &SymbolTable<'a> {
        &self.symbols
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Second pass, see [`assembler::assemble`].
    pub fn assemble(&self, table: &OpcodeTable) -> Result<CompiledImage, AssemblerError<'a>> {
        let bytes = assembler::assemble(table, &self.symbols, &self.instructions)?;
        Ok(CompiledImage {
            bytes,
            segments: self.segments.clone(),
        })
    }
}

/// First pass over the source, fed one line at a time.
///
/// Assigns word addresses in source order, records labels at the address
/// of the next instruction and opens segments. Nothing is encoded yet, so
/// labels may be used before they are defined.
pub struct Parser<'t, 'a> {
    table: &'t OpcodeTable,
    instructions: Vec<Instruction<'a>, INSTRUCTION_CAP>,
    symbols: SymbolTable<'a>,
    segments: Vec<Segment, SEGMENT_CAP>,
    address: ProgramWord,
    segment_base: ProgramWord,
    line_number: u32,
}

impl<'t, 'a> Parser<'t, 'a> {
    pub fn new(table: &'t OpcodeTable) -> Self {
        Self {
            table,
            instructions: Vec::new(),
            symbols: SymbolTable::new(),
            segments: Vec::new(),
            address: 0,
            segment_base: 0,
            line_number: 0,
        }
    }

    pub fn add_line(&mut self, line: &'a str) -> Result<(), AssemblerError<'a>> {
        self.line_number = self
            .line_number
            .checked_add(1)
            .ok_or(AssemblerError::Kind(AssemblerErrorKind::LineNumberOverflow))?;
        let line_number = self.line_number;
        let line = strip_comment(line).trim();
        if line.is_empty() {
            return Ok(());
        }
        self.parse_line(line_number, line)
            .map_err(|err| err.with_line(line_number, line))
    }

    pub fn finish(self) -> Program<'a> {
        Program {
            instructions: self.instructions,
            symbols: self.symbols,
            segments: self.segments,
        }
    }

    fn parse_line(&mut self, line_number: u32, line: &'a str) -> Result<(), AssemblerError<'a>> {
        let mut labels: Vec<&'a str, MAX_OPERANDS> = Vec::new();
        let mut mnemonic = None;
        let mut segment_name = None;
        let mut operands: Vec<&'a str, MAX_OPERANDS> = Vec::new();

        for token in line.split_whitespace() {
            if mnemonic.is_some() {
                for operand in token.split(',').map(str::trim).filter(|part| !part.is_empty()) {
                    operands
                        .push(operand)
                        .map_err(|_| AssemblerError::Kind(AssemblerErrorKind::TooManyOperands))?;
                }
                continue;
            }

            if let Some(name) = token.strip_suffix(':').filter(|name| is_identifier(name)) {
                labels
                    .push(name)
                    .map_err(|_| AssemblerError::Kind(AssemblerErrorKind::TooManyOperands))?;
                continue;
            }

            // `.segment` and `.name` both open a segment.
            if let Some(name) = token.strip_prefix('.').filter(|name| is_identifier(name)) {
                mnemonic = Some(Mnemonic::Segment);
                if name != Mnemonic::Segment.name() {
                    segment_name = Some(name);
                }
                continue;
            }

            let descriptor = self
                .table
                .lookup(token)
                .ok_or(AssemblerError::Kind(AssemblerErrorKind::UnrecognizedOpcode))?;
            mnemonic = Some(descriptor.mnemonic);
        }

        if labels.is_empty() && mnemonic.is_none() {
            return Ok(());
        }

        let address = self.address;
        for name in labels.iter() {
            self.symbols.insert(*name, address)?;
        }

        if mnemonic == Some(Mnemonic::Segment) {
            if operands.len() > 1 {
                return Err(AssemblerError::Kind(AssemblerErrorKind::TooManyOperands));
            }
            let name = operands
                .first()
                .copied()
                .or(segment_name)
                .or_else(|| labels.first().copied());
            self.open_segment(name)?;
        }

        if let Some(mnemonic) = mnemonic {
            let words = self
                .table
                .get(mnemonic)
                .ok_or(AssemblerError::Kind(AssemblerErrorKind::UnknownInstruction))?
                .words;
            let next = self
                .address
                .checked_add(words)
                .filter(|next| usize::from(*next) <= PROGRAM_WORDS)
                .ok_or(AssemblerError::Kind(AssemblerErrorKind::ProgramTooLarge))?;
            self.address = next;
        }

        self.instructions
            .push(Instruction {
                line_number,
                line,
                address,
                segment_base: self.segment_base,
                mnemonic,
                operands,
            })
            .map_err(|_| AssemblerError::Kind(AssemblerErrorKind::MaxInstructionsExceeded))
    }

    fn open_segment(&mut self, name: Option<&str>) -> Result<(), AssemblerError<'a>> {
        let mut segment_name: String<NAME_CAP> = String::new();
        match name {
            Some(name) => segment_name
                .push_str(name)
                .map_err(|_| AssemblerError::Kind(AssemblerErrorKind::NameTooLong))?,
            None => {
                use core::fmt::Write;
                write!(segment_name, "seg{}", self.segments.len())
                    .map_err(|_| AssemblerError::Kind(AssemblerErrorKind::NameTooLong))?;
            }
        }
        self.segments
            .push(Segment {
                name: segment_name,
                address: self.address,
            })
            .map_err(|_| AssemblerError::Kind(AssemblerErrorKind::MaxSegmentsExceeded))?;
        self.segment_base = self.address;
        Ok(())
    }
}

/// Parse a whole source text, one line per instruction.
pub fn parse<'a>(table: &OpcodeTable, source: &'a str) -> Result<Program<'a>, AssemblerError<'a>> {
    let mut parser = Parser::new(table);
    for line in source.lines() {
        parser.add_line(line)?;
    }
    Ok(parser.finish())
}

fn strip_comment(line: &str) -> &str {
    match line.split(';').next() {
        Some(part) => part,
        None => line,
    }
}
