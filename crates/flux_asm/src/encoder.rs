//! Per family instruction encoders.
//!
//! Each encoder turns one parsed instruction into the bytes it occupies in
//! the image: nothing for directives, one big endian word for everything
//! else. Bit positions and operand bounds come from the opcode table, the
//! encoders only decide which operand goes into which field.

use heapless::Vec;

use crate::error::AssemblerErrorKind;
use crate::opcode::{Bounds, Mnemonic, OpcodeDescriptor, OpcodeTable};
use crate::operand::{
    EndFlag, Radix, Register, TriggerClause, TriggerSet, TriggerSource, parse_duration,
    parse_end_flag, parse_literal, parse_prescale_marker, parse_register, parse_signed_register,
    parse_trigger_clause,
};
use crate::parser::{Instruction, SymbolTable};
use crate::{ProgramWord, WORD_BYTES};

/// Bytes produced for one instruction.
pub type Encoded = Vec<u8, WORD_BYTES>;

pub type Encoder = fn(
    Mnemonic,
    &OpcodeTable,
    &SymbolTable<'_>,
    &Instruction<'_>,
) -> Result<Encoded, AssemblerErrorKind>;

/// Engine clock divided by 16, in microseconds.
const FINE_TICK_US: u64 = 488;
/// Engine clock divided by 512, in microseconds.
const COARSE_TICK_US: u64 = 15_625;
const MAX_STEPS: u64 = 31;

const PRESCALE_SHIFT: u32 = 14;
const STEP_SHIFT: u32 = 9;
const SIGN_SHIFT: u32 = 8;

const HEX_WORD: Bounds = Bounds::new(0, 0xFFFF);

fn descriptor(table: &OpcodeTable, mnemonic: Mnemonic) -> Result<&OpcodeDescriptor, AssemblerErrorKind> {
    table
        .get(mnemonic)
        .ok_or(AssemblerErrorKind::UnknownInstruction)
}

fn word(value: ProgramWord) -> Result<Encoded, AssemblerErrorKind> {
    Vec::from_slice(&value.to_be_bytes()).map_err(|_| AssemblerErrorKind::ProgramTooLarge)
}

fn operand<'a>(instruction: &Instruction<'a>, index: usize) -> Result<&'a str, AssemblerErrorKind> {
    instruction
        .operands
        .get(index)
        .copied()
        .ok_or(AssemblerErrorKind::MissingOperand)
}

fn expect_operands(instruction: &Instruction<'_>, count: usize) -> Result<(), AssemblerErrorKind> {
    let given = instruction.operands.len();
    if given < count {
        return Err(AssemblerErrorKind::MissingOperand);
    }
    if given > count {
        return Err(if count == 0 {
            AssemblerErrorKind::UnexpectedOperand
        } else {
            AssemblerErrorKind::TooManyOperands
        });
    }
    Ok(())
}

fn resolve(symbols: &SymbolTable<'_>, name: &str) -> Result<ProgramWord, AssemblerErrorKind> {
    symbols.get(name).ok_or(AssemblerErrorKind::UnknownLabel)
}

fn as_i64(value: u64) -> Result<i64, AssemblerErrorKind> {
    i64::try_from(value).map_err(|_| AssemblerErrorKind::InvalidNumber)
}

fn div_round(numerator: u64, denominator: u64) -> u64 {
    numerator.saturating_add(denominator / 2) / denominator
}

/// Split `micros` into `ticks` equal steps and express one step in engine
/// clock ticks. Uses the fine clock when the count fits in five bits,
/// otherwise the coarse clock with the prescale bit set. The returned count
/// may still be too large for the field, callers range check it.
fn quantize(micros: u64, ticks: u64) -> (bool, u64) {
    let fine = div_round(micros, FINE_TICK_US.saturating_mul(ticks));
    if fine <= MAX_STEPS {
        return (false, fine);
    }
    (true, div_round(micros, COARSE_TICK_US.saturating_mul(ticks)))
}

pub fn encode_data(
    mnemonic: Mnemonic,
    table: &OpcodeTable,
    _symbols: &SymbolTable<'_>,
    instruction: &Instruction<'_>,
) -> Result<Encoded, AssemblerErrorKind> {
    let descriptor = descriptor(table, mnemonic)?;
    expect_operands(instruction, 1)?;
    let literal = parse_literal(operand(instruction, 0)?)?;
    // Hex literals spell out whole words, the others are mapping rows.
    let bounds = match literal.radix {
        Radix::Hexadecimal => HEX_WORD,
        Radix::Decimal | Radix::Binary => descriptor.primary_range.scalar()?,
    };
    word(bounds.field(literal.value)?)
}

pub fn encode_directive(
    _mnemonic: Mnemonic,
    _table: &OpcodeTable,
    _symbols: &SymbolTable<'_>,
    _instruction: &Instruction<'_>,
) -> Result<Encoded, AssemblerErrorKind> {
    Ok(Encoded::new())
}

/// Mapping table instructions that take a label in the lower half of SRAM.
pub fn encode_address(
    mnemonic: Mnemonic,
    table: &OpcodeTable,
    symbols: &SymbolTable<'_>,
    instruction: &Instruction<'_>,
) -> Result<Encoded, AssemblerErrorKind> {
    let descriptor = descriptor(table, mnemonic)?;
    expect_operands(instruction, 1)?;
    let address = resolve(symbols, operand(instruction, 0)?)?;
    let address = descriptor.primary_range.scalar()?.field(i64::from(address))?;
    word(descriptor.primary()?.base | address)
}

pub fn encode_select(
    mnemonic: Mnemonic,
    table: &OpcodeTable,
    _symbols: &SymbolTable<'_>,
    instruction: &Instruction<'_>,
) -> Result<Encoded, AssemblerErrorKind> {
    let descriptor = descriptor(table, mnemonic)?;
    expect_operands(instruction, 1)?;
    let led = parse_literal(operand(instruction, 0)?)?;
    let led = descriptor.primary_range.scalar()?.field(led.value)?;
    word(descriptor.primary()?.base | led)
}

pub fn encode_bare(
    mnemonic: Mnemonic,
    table: &OpcodeTable,
    _symbols: &SymbolTable<'_>,
    instruction: &Instruction<'_>,
) -> Result<Encoded, AssemblerErrorKind> {
    let descriptor = descriptor(table, mnemonic)?;
    expect_operands(instruction, 0)?;
    word(descriptor.primary()?.base)
}

/// Three operand shapes share the mnemonic:
///
/// * `ramp 0.5, -100` ramps over half a second in 100 decrements,
/// * `ramp 12, -100, pre=1` gives step time and prescale directly,
/// * `ramp rB, pre=1, -rC` takes step time and increments from variables.
pub fn encode_ramp(
    mnemonic: Mnemonic,
    table: &OpcodeTable,
    _symbols: &SymbolTable<'_>,
    instruction: &Instruction<'_>,
) -> Result<Encoded, AssemblerErrorKind> {
    let descriptor = descriptor(table, mnemonic)?;
    let first = operand(instruction, 0)?;

    if let Some(rest) = first.strip_prefix('-') {
        if parse_register(rest).is_ok() {
            // Only the increments register carries a sign.
            return Err(AssemblerErrorKind::InvalidRampOperand);
        }
    }
    if let Ok(step) = parse_register(first) {
        return encode_variable_ramp(descriptor, step, instruction);
    }

    let (step_bounds, increment_bounds) = descriptor.primary_range.pair()?;
    let increments = increment_bounds.check(parse_literal(operand(instruction, 1)?)?.value)?;
    let (prescale, step) = match instruction.operands.get(2) {
        Some(marker) => {
            expect_operands(instruction, 3)?;
            let prescale =
                parse_prescale_marker(marker)?.ok_or(AssemblerErrorKind::InvalidRampOperand)?;
            let step = parse_literal(first)?;
            (prescale, step_bounds.field(step.value)?)
        }
        None => {
            if increments == 0 {
                return Err(AssemblerErrorKind::InvalidRampOperand);
            }
            let micros = parse_duration(first)?;
            let (prescale, step) = quantize(micros, increments.unsigned_abs());
            (prescale, step_bounds.field(as_i64(step)?)?)
        }
    };

    let magnitude = increment_bounds.field(increments.abs())?;
    let sign = ProgramWord::from(increments < 0);
    word(
        descriptor.primary()?.base
            | ProgramWord::from(prescale) << PRESCALE_SHIFT
            | step << STEP_SHIFT
            | sign << SIGN_SHIFT
            | magnitude,
    )
}

fn encode_variable_ramp(
    descriptor: &OpcodeDescriptor,
    step: Register,
    instruction: &Instruction<'_>,
) -> Result<Encoded, AssemblerErrorKind> {
    let (step_bounds, increment_bounds) = descriptor.variant_range.pair()?;
    let mut prescale = None;
    let mut increments = None;
    for token in instruction.operands.iter().skip(1) {
        if let Some(marker) = parse_prescale_marker(token)? {
            if prescale.replace(marker).is_some() {
                return Err(AssemblerErrorKind::InvalidRampOperand);
            }
            continue;
        }
        let register =
            parse_signed_register(token).map_err(|_| AssemblerErrorKind::InvalidRampOperand)?;
        if increments.replace(register).is_some() {
            return Err(AssemblerErrorKind::InvalidRampOperand);
        }
    }
    let increments = increments.ok_or(AssemblerErrorKind::MissingOperand)?;

    let step = step_bounds.field(i64::from(step.index()))?;
    let register = increment_bounds.field(i64::from(increments.register.index()))?;
    word(
        descriptor.variant()?.base
            | ProgramWord::from(prescale.unwrap_or(false)) << 5
            | ProgramWord::from(increments.negative) << 4
            | step << 2
            | register,
    )
}

pub fn encode_set_pwm(
    mnemonic: Mnemonic,
    table: &OpcodeTable,
    _symbols: &SymbolTable<'_>,
    instruction: &Instruction<'_>,
) -> Result<Encoded, AssemblerErrorKind> {
    let descriptor = descriptor(table, mnemonic)?;
    expect_operands(instruction, 1)?;
    let token = operand(instruction, 0)?;
    if let Ok(register) = parse_register(token) {
        let register = descriptor
            .variant_range
            .scalar()?
            .field(i64::from(register.index()))?;
        return word(descriptor.variant()?.base | register);
    }
    let level = parse_literal(token)?;
    let level = descriptor.primary_range.scalar()?.field(level.value)?;
    word(descriptor.primary()?.base | level)
}

pub fn encode_wait(
    mnemonic: Mnemonic,
    table: &OpcodeTable,
    _symbols: &SymbolTable<'_>,
    instruction: &Instruction<'_>,
) -> Result<Encoded, AssemblerErrorKind> {
    let descriptor = descriptor(table, mnemonic)?;
    expect_operands(instruction, 1)?;
    let micros = parse_duration(operand(instruction, 0)?)?;
    descriptor.primary_range.scalar()?.check(as_i64(micros)?)?;

    let (prescale, time) = quantize(micros, 1);
    let time = Bounds::new(0, 31).field(as_i64(time)?)?;
    word(descriptor.primary()?.base | ProgramWord::from(prescale) << PRESCALE_SHIFT | time << STEP_SHIFT)
}

pub fn encode_end(
    mnemonic: Mnemonic,
    table: &OpcodeTable,
    _symbols: &SymbolTable<'_>,
    instruction: &Instruction<'_>,
) -> Result<Encoded, AssemblerErrorKind> {
    let descriptor = descriptor(table, mnemonic)?;
    if instruction.operands.len() > 2 {
        return Err(AssemblerErrorKind::TooManyOperands);
    }
    let mut value = descriptor.primary()?.base;
    for token in instruction.operands.iter() {
        value |= match parse_end_flag(token)? {
            EndFlag::Interrupt => 1 << 12,
            EndFlag::Reset => 1 << 11,
        };
    }
    word(value)
}

/// `branch loops, label` or `branch rX, label`. The step number is counted
/// from the start of the enclosing segment, which is where the engine's
/// program counter starts.
pub fn encode_branch(
    mnemonic: Mnemonic,
    table: &OpcodeTable,
    symbols: &SymbolTable<'_>,
    instruction: &Instruction<'_>,
) -> Result<Encoded, AssemblerErrorKind> {
    let descriptor = descriptor(table, mnemonic)?;
    expect_operands(instruction, 2)?;
    let target = resolve(symbols, operand(instruction, 1)?)?;
    let step = i64::from(target) - i64::from(instruction.segment_base);

    let count = operand(instruction, 0)?;
    let (pattern, loops, step) = if let Ok(register) = parse_register(count) {
        let (register_bounds, step_bounds) = descriptor.variant_range.pair()?;
        (
            descriptor.variant()?,
            register_bounds.field(i64::from(register.index()))?,
            step_bounds.field(step)?,
        )
    } else {
        let (loop_bounds, step_bounds) = descriptor.primary_range.pair()?;
        (
            descriptor.primary()?,
            loop_bounds.field(parse_literal(count)?.value)?,
            step_bounds.field(step)?,
        )
    };
    word(pattern.base | loops << 7 | step)
}

fn trigger_bits(set: TriggerSet, bits: [(TriggerSource, u32); 4]) -> ProgramWord {
    bits.iter()
        .filter(|(source, _)| set.contains(*source))
        .fold(0, |value, (_, bit)| value | 1 << bit)
}

const WAIT_BITS: [(TriggerSource, u32); 4] = [
    (TriggerSource::Engine1, 7),
    (TriggerSource::Engine2, 8),
    (TriggerSource::Engine3, 9),
    (TriggerSource::External, 12),
];

const SEND_BITS: [(TriggerSource, u32); 4] = [
    (TriggerSource::Engine1, 1),
    (TriggerSource::Engine2, 2),
    (TriggerSource::Engine3, 3),
    (TriggerSource::External, 6),
];

pub fn encode_trigger(
    mnemonic: Mnemonic,
    table: &OpcodeTable,
    _symbols: &SymbolTable<'_>,
    instruction: &Instruction<'_>,
) -> Result<Encoded, AssemblerErrorKind> {
    let descriptor = descriptor(table, mnemonic)?;
    if instruction.operands.is_empty() {
        return Err(AssemblerErrorKind::MissingOperand);
    }
    if instruction.operands.len() > 2 {
        return Err(AssemblerErrorKind::TooManyOperands);
    }

    let mut wait = None;
    let mut send = None;
    for token in instruction.operands.iter() {
        let duplicate = match parse_trigger_clause(token)? {
            TriggerClause::Wait(set) => wait.replace(set).is_some(),
            TriggerClause::Send(set) => send.replace(set).is_some(),
        };
        if duplicate {
            return Err(AssemblerErrorKind::DuplicateTriggerClause);
        }
    }

    let mut value = descriptor.primary()?.base;
    if let Some(set) = wait {
        value |= trigger_bits(set, WAIT_BITS);
    }
    if let Some(set) = send {
        value |= trigger_bits(set, SEND_BITS);
    }
    word(value)
}

/// `jge rX, rY, label` skips forward to `label` when the comparison holds.
pub fn encode_conditional_jump(
    mnemonic: Mnemonic,
    table: &OpcodeTable,
    symbols: &SymbolTable<'_>,
    instruction: &Instruction<'_>,
) -> Result<Encoded, AssemblerErrorKind> {
    let descriptor = descriptor(table, mnemonic)?;
    expect_operands(instruction, 3)?;
    let (skip_bounds, register_bounds) = descriptor.primary_range.pair()?;
    let first = parse_register(operand(instruction, 0)?)?;
    let second = parse_register(operand(instruction, 1)?)?;
    let target = resolve(symbols, operand(instruction, 2)?)?;
    if target <= instruction.address {
        return Err(AssemblerErrorKind::BackwardJump);
    }
    let skip = i64::from(target) - i64::from(instruction.address) - 1;

    word(
        descriptor.primary()?.base
            | skip_bounds.field(skip)? << 4
            | register_bounds.field(i64::from(first.index()))? << 2
            | register_bounds.field(i64::from(second.index()))?,
    )
}

/// `ld rX, value` with X one of A, B or C.
pub fn encode_load(
    mnemonic: Mnemonic,
    table: &OpcodeTable,
    _symbols: &SymbolTable<'_>,
    instruction: &Instruction<'_>,
) -> Result<Encoded, AssemblerErrorKind> {
    let descriptor = descriptor(table, mnemonic)?;
    expect_operands(instruction, 2)?;
    let (target_bounds, value_bounds) = descriptor.primary_range.pair()?;
    let target = parse_register(operand(instruction, 0)?)?;
    let target = target_bounds.field(i64::from(target.index()))?;
    let value = value_bounds.field(parse_literal(operand(instruction, 1)?)?.value)?;
    word(descriptor.primary()?.base | target << 10 | value)
}

/// `add rX, value`, `add rX, rY` (rX += rY) or `add rX, rY, rZ`.
pub fn encode_arithmetic(
    mnemonic: Mnemonic,
    table: &OpcodeTable,
    _symbols: &SymbolTable<'_>,
    instruction: &Instruction<'_>,
) -> Result<Encoded, AssemblerErrorKind> {
    let descriptor = descriptor(table, mnemonic)?;
    let (target_bounds, value_bounds) = descriptor.primary_range.pair()?;
    let (_, register_bounds) = descriptor.variant_range.pair()?;
    let target = parse_register(operand(instruction, 0)?)?;
    let target = target_bounds.field(i64::from(target.index()))?;
    let register = |token: &str| -> Result<ProgramWord, AssemblerErrorKind> {
        register_bounds.field(i64::from(parse_register(token)?.index()))
    };

    match instruction.operands.len() {
        0 | 1 => Err(AssemblerErrorKind::MissingOperand),
        2 => {
            let source = operand(instruction, 1)?;
            if parse_register(source).is_ok() {
                return word(descriptor.variant()?.base | target << 10 | target << 2 | register(source)?);
            }
            let value = value_bounds.field(parse_literal(source)?.value)?;
            word(descriptor.primary()?.base | target << 10 | value)
        }
        3 => {
            let first = register(operand(instruction, 1)?)?;
            let second = register(operand(instruction, 2)?)?;
            word(descriptor.variant()?.base | target << 10 | first << 2 | second)
        }
        _ => Err(AssemblerErrorKind::TooManyOperands),
    }
}
