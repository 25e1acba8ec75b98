use core::fmt;

use variant_count::VariantCount;

use crate::ProgramWord;
use crate::encoder::{self, Encoder};
use crate::error::AssemblerErrorKind;

/// Every mnemonic the engine understands, plus the `dw` and `segment`
/// pseudo instructions.
#[repr(u8)]
#[derive(VariantCount, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mnemonic {
    Dw,
    Segment,
    LoadStart,
    MapStart,
    LoadEnd,
    MapSel,
    MapClr,
    MapNext,
    MapPrev,
    LoadNext,
    LoadPrev,
    LoadAddr,
    MapAddr,
    Ramp,
    SetPwm,
    Wait,
    Rst,
    End,
    Int,
    Branch,
    Trigger,
    TrigClear,
    Jne,
    Jl,
    Jge,
    Je,
    Ld,
    Add,
    Sub,
}

impl Mnemonic {
    /// All mnemonics in discriminant order.
    pub const ALL: [Mnemonic; Mnemonic::VARIANT_COUNT] = [
        Mnemonic::Dw,
        Mnemonic::Segment,
        Mnemonic::LoadStart,
        Mnemonic::MapStart,
        Mnemonic::LoadEnd,
        Mnemonic::MapSel,
        Mnemonic::MapClr,
        Mnemonic::MapNext,
        Mnemonic::MapPrev,
        Mnemonic::LoadNext,
        Mnemonic::LoadPrev,
        Mnemonic::LoadAddr,
        Mnemonic::MapAddr,
        Mnemonic::Ramp,
        Mnemonic::SetPwm,
        Mnemonic::Wait,
        Mnemonic::Rst,
        Mnemonic::End,
        Mnemonic::Int,
        Mnemonic::Branch,
        Mnemonic::Trigger,
        Mnemonic::TrigClear,
        Mnemonic::Jne,
        Mnemonic::Jl,
        Mnemonic::Jge,
        Mnemonic::Je,
        Mnemonic::Ld,
        Mnemonic::Add,
        Mnemonic::Sub,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Mnemonic::Dw => "dw",
            Mnemonic::Segment => "segment",
            Mnemonic::LoadStart => "load_start",
            Mnemonic::MapStart => "map_start",
            Mnemonic::LoadEnd => "load_end",
            Mnemonic::MapSel => "map_sel",
            Mnemonic::MapClr => "map_clr",
            Mnemonic::MapNext => "map_next",
            Mnemonic::MapPrev => "map_prev",
            Mnemonic::LoadNext => "load_next",
            Mnemonic::LoadPrev => "load_prev",
            Mnemonic::LoadAddr => "load_addr",
            Mnemonic::MapAddr => "map_addr",
            Mnemonic::Ramp => "ramp",
            Mnemonic::SetPwm => "set_pwm",
            Mnemonic::Wait => "wait",
            Mnemonic::Rst => "rst",
            Mnemonic::End => "end",
            Mnemonic::Int => "int",
            Mnemonic::Branch => "branch",
            Mnemonic::Trigger => "trigger",
            Mnemonic::TrigClear => "trig_clear",
            Mnemonic::Jne => "jne",
            Mnemonic::Jl => "jl",
            Mnemonic::Jge => "jge",
            Mnemonic::Je => "je",
            Mnemonic::Ld => "ld",
            Mnemonic::Add => "add",
            Mnemonic::Sub => "sub",
        }
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fixed opcode bits plus the mask of bits operands may occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pattern {
    pub base: ProgramWord,
    pub mask: ProgramWord,
}

impl Pattern {
    pub const fn new(base: ProgramWord, mask: ProgramWord) -> Self {
        Self { base, mask }
    }

    pub fn matches(&self, word: ProgramWord) -> bool {
        word & !self.mask == self.base
    }

    pub fn operand_bits(&self, word: ProgramWord) -> ProgramWord {
        word & self.mask
    }
}

/// Inclusive bounds of one operand field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min: i32,
    pub max: i32,
}

impl Bounds {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub fn check(&self, value: i64) -> Result<i64, AssemblerErrorKind> {
        if value < i64::from(self.min) || value > i64::from(self.max) {
            return Err(AssemblerErrorKind::ValueOutOfRange {
                value,
                min: self.min,
                max: self.max,
            });
        }
        Ok(value)
    }

    /// Range checked conversion into a word field.
    pub fn field(&self, value: i64) -> Result<ProgramWord, AssemblerErrorKind> {
        let value = self.check(value)?;
        ProgramWord::try_from(value).map_err(|_| AssemblerErrorKind::ValueOutOfRange {
            value,
            min: self.min,
            max: self.max,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandRange {
    None,
    Scalar(Bounds),
    Pair(Bounds, Bounds),
}

impl OperandRange {
    pub fn scalar(&self) -> Result<Bounds, AssemblerErrorKind> {
        match self {
            OperandRange::Scalar(bounds) => Ok(*bounds),
            _ => Err(AssemblerErrorKind::TableMismatch),
        }
    }

    pub fn pair(&self) -> Result<(Bounds, Bounds), AssemblerErrorKind> {
        match self {
            OperandRange::Pair(first, second) => Ok((*first, *second)),
            _ => Err(AssemblerErrorKind::TableMismatch),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OpcodeDescriptor {
    pub mnemonic: Mnemonic,
    pub encoder: Encoder,
    pub primary: Option<Pattern>,
    pub variant: Option<Pattern>,
    pub primary_range: OperandRange,
    pub variant_range: OperandRange,
    /// Words of program memory the instruction occupies.
    pub words: ProgramWord,
}

impl OpcodeDescriptor {
    pub fn primary(&self) -> Result<Pattern, AssemblerErrorKind> {
        self.primary.ok_or(AssemblerErrorKind::TableMismatch)
    }

    pub fn variant(&self) -> Result<Pattern, AssemblerErrorKind> {
        self.variant.ok_or(AssemblerErrorKind::TableMismatch)
    }
}

const NO_RANGE: OperandRange = OperandRange::None;
const SRAM_LOWER_HALF: OperandRange = OperandRange::Scalar(Bounds::new(0, 127));
const REGISTER_PAIR: OperandRange = OperandRange::Pair(Bounds::new(0, 3), Bounds::new(0, 3));
const TARGET_LITERAL: OperandRange = OperandRange::Pair(Bounds::new(0, 2), Bounds::new(0, 255));
const TARGET_REGISTER: OperandRange = OperandRange::Pair(Bounds::new(0, 2), Bounds::new(0, 3));
const JUMP_SKIP: OperandRange = OperandRange::Pair(Bounds::new(0, 31), Bounds::new(0, 3));

/// The instruction set, built once and handed to the parser, assembler
/// and disassembler.
#[derive(Debug, Clone)]
pub struct OpcodeTable {
    descriptors: [OpcodeDescriptor; Mnemonic::VARIANT_COUNT],
}

impl OpcodeTable {
    /// The LP5569 instruction set.
    pub fn new() -> Self {
        Self {
            descriptors: Mnemonic::ALL.map(describe),
        }
    }

    pub fn get(&self, mnemonic: Mnemonic) -> Option<&OpcodeDescriptor> {
        self.descriptors.get(mnemonic as usize)
    }

    pub fn lookup(&self, name: &str) -> Option<&OpcodeDescriptor> {
        self.descriptors
            .iter()
            .find(|descriptor| descriptor.mnemonic.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OpcodeDescriptor> {
        self.descriptors.iter()
    }
}

impl Default for OpcodeTable {
    fn default() -> Self {
        Self::new()
    }
}

fn describe(mnemonic: Mnemonic) -> OpcodeDescriptor {
    let plain = |encoder: Encoder, base: ProgramWord, mask: ProgramWord, range: OperandRange| {
        OpcodeDescriptor {
            mnemonic,
            encoder,
            primary: Some(Pattern::new(base, mask)),
            variant: None,
            primary_range: range,
            variant_range: NO_RANGE,
            words: 1,
        }
    };

    match mnemonic {
        Mnemonic::Dw => OpcodeDescriptor {
            mnemonic,
            encoder: encoder::encode_data,
            primary: None,
            variant: None,
            primary_range: OperandRange::Scalar(Bounds::new(0, 0x1FF)),
            variant_range: NO_RANGE,
            words: 1,
        },
        Mnemonic::Segment => OpcodeDescriptor {
            mnemonic,
            encoder: encoder::encode_directive,
            primary: None,
            variant: None,
            primary_range: NO_RANGE,
            variant_range: NO_RANGE,
            words: 0,
        },
        Mnemonic::LoadStart => plain(encoder::encode_address, 0b1001_1110_0000_0000, 0x007F, SRAM_LOWER_HALF),
        Mnemonic::MapStart => plain(encoder::encode_address, 0b1001_1100_0000_0000, 0x007F, SRAM_LOWER_HALF),
        Mnemonic::LoadEnd => plain(encoder::encode_address, 0b1001_1100_1000_0000, 0x007F, SRAM_LOWER_HALF),
        Mnemonic::MapSel => plain(encoder::encode_select, 0b1001_1101_0000_0000, 0x007F, SRAM_LOWER_HALF),
        Mnemonic::MapClr => plain(encoder::encode_bare, 0b1001_1101_0000_0000, 0x0000, NO_RANGE),
        Mnemonic::MapNext => plain(encoder::encode_bare, 0b1001_1101_1000_0000, 0x0000, NO_RANGE),
        Mnemonic::MapPrev => plain(encoder::encode_bare, 0b1001_1101_1100_0000, 0x0000, NO_RANGE),
        Mnemonic::LoadNext => plain(encoder::encode_bare, 0b1001_1101_1000_0001, 0x0000, NO_RANGE),
        Mnemonic::LoadPrev => plain(encoder::encode_bare, 0b1001_1101_1100_0001, 0x0000, NO_RANGE),
        Mnemonic::LoadAddr => plain(encoder::encode_address, 0b1001_1111_0000_0000, 0x007F, SRAM_LOWER_HALF),
        Mnemonic::MapAddr => plain(encoder::encode_address, 0b1001_1111_1000_0000, 0x007F, SRAM_LOWER_HALF),
        Mnemonic::Ramp => OpcodeDescriptor {
            mnemonic,
            encoder: encoder::encode_ramp,
            primary: Some(Pattern::new(0b0000_0000_0000_0000, 0x7FFF)),
            variant: Some(Pattern::new(0b1000_0100_0000_0000, 0x003F)),
            // Step count and signed number of increments.
            primary_range: OperandRange::Pair(Bounds::new(0, 31), Bounds::new(-255, 255)),
            variant_range: REGISTER_PAIR,
            words: 1,
        },
        Mnemonic::SetPwm => OpcodeDescriptor {
            mnemonic,
            encoder: encoder::encode_set_pwm,
            primary: Some(Pattern::new(0b0100_0000_0000_0000, 0x00FF)),
            variant: Some(Pattern::new(0b1000_0100_0110_0000, 0x0003)),
            primary_range: OperandRange::Scalar(Bounds::new(0, 255)),
            variant_range: OperandRange::Scalar(Bounds::new(0, 3)),
            words: 1,
        },
        // Microseconds, 0.488 ms to 484 ms.
        Mnemonic::Wait => plain(
            encoder::encode_wait,
            0b0000_0000_0000_0000,
            0x7E00,
            OperandRange::Scalar(Bounds::new(488, 484_000)),
        ),
        Mnemonic::Rst => plain(encoder::encode_bare, 0b0000_0000_0000_0000, 0x0000, NO_RANGE),
        Mnemonic::End => plain(encoder::encode_end, 0b1100_0000_0000_0000, 0x1800, NO_RANGE),
        Mnemonic::Int => plain(encoder::encode_bare, 0b1100_0100_0000_0000, 0x0000, NO_RANGE),
        Mnemonic::Branch => OpcodeDescriptor {
            mnemonic,
            encoder: encoder::encode_branch,
            primary: Some(Pattern::new(0b1010_0000_0000_0000, 0x1FFF)),
            variant: Some(Pattern::new(0b1000_0110_0000_0000, 0x01FF)),
            // Loop count (0 loops forever) and step number.
            primary_range: OperandRange::Pair(Bounds::new(0, 63), Bounds::new(0, 127)),
            variant_range: OperandRange::Pair(Bounds::new(0, 3), Bounds::new(0, 127)),
            words: 1,
        },
        Mnemonic::Trigger => plain(encoder::encode_trigger, 0b1110_0000_0000_0000, 0x1FFE, NO_RANGE),
        Mnemonic::TrigClear => plain(encoder::encode_bare, 0b1110_0000_0000_0000, 0x0000, NO_RANGE),
        Mnemonic::Jne => plain(encoder::encode_conditional_jump, 0b1000_1000_0000_0000, 0x01FF, JUMP_SKIP),
        Mnemonic::Jl => plain(encoder::encode_conditional_jump, 0b1000_1010_0000_0000, 0x01FF, JUMP_SKIP),
        Mnemonic::Jge => plain(encoder::encode_conditional_jump, 0b1000_1100_0000_0000, 0x01FF, JUMP_SKIP),
        Mnemonic::Je => plain(encoder::encode_conditional_jump, 0b1000_1110_0000_0000, 0x01FF, JUMP_SKIP),
        Mnemonic::Ld => plain(encoder::encode_load, 0b1001_0000_0000_0000, 0x0CFF, TARGET_LITERAL),
        Mnemonic::Add => OpcodeDescriptor {
            mnemonic,
            encoder: encoder::encode_arithmetic,
            primary: Some(Pattern::new(0b1001_0001_0000_0000, 0x0CFF)),
            variant: Some(Pattern::new(0b1001_0011_0000_0000, 0x0C0F)),
            primary_range: TARGET_LITERAL,
            variant_range: TARGET_REGISTER,
            words: 1,
        },
        Mnemonic::Sub => OpcodeDescriptor {
            mnemonic,
            encoder: encoder::encode_arithmetic,
            primary: Some(Pattern::new(0b1001_0010_0000_0000, 0x0CFF)),
            variant: Some(Pattern::new(0b1001_0011_0001_0000, 0x0C0F)),
            primary_range: TARGET_LITERAL,
            variant_range: TARGET_REGISTER,
            words: 1,
        },
    }
}
