//! Typed parsers for the operand grammars the encoders accept.
//!
//! Every parser takes a single operand token, already split on `,` and
//! trimmed by the line parser, and either returns a typed value or the
//! reason the token is malformed. Range checking is left to the encoders
//! since the valid range depends on the instruction.

use core::fmt;

use crate::ProgramWord;
use crate::error::AssemblerErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Radix {
    Decimal,
    Hexadecimal,
    Binary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Literal {
    pub value: i64,
    pub radix: Radix,
}

/// `42`, `-42`, `0x2A` or `101010b`.
pub fn parse_literal(token: &str) -> Result<Literal, AssemblerErrorKind> {
    let (negative, digits) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };

    let (digits, radix) = if let Some(hex) = digits.strip_prefix("0x") {
        (hex, Radix::Hexadecimal)
    } else if let Some(bin) = digits.strip_suffix('b') {
        (bin, Radix::Binary)
    } else {
        (digits, Radix::Decimal)
    };

    let base = match radix {
        Radix::Decimal => 10,
        Radix::Hexadecimal => 16,
        Radix::Binary => 2,
    };
    // from_str_radix would accept a sign of its own.
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(base)) {
        return Err(AssemblerErrorKind::InvalidNumber);
    }
    let value = i64::from_str_radix(digits, base).map_err(|_| AssemblerErrorKind::InvalidNumber)?;
    let value = if negative { value.checked_neg().ok_or(AssemblerErrorKind::InvalidNumber)? } else { value };
    Ok(Literal { value, radix })
}

/// The four engine variables. A and B are engine local, C and D are
/// shared between engines.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    A,
    B,
    C,
    D,
}

impl Register {
    pub fn index(self) -> ProgramWord {
        self as ProgramWord
    }

    pub fn from_index(index: ProgramWord) -> Option<Self> {
        match index {
            0 => Some(Register::A),
            1 => Some(Register::B),
            2 => Some(Register::C),
            3 => Some(Register::D),
            _ => None,
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Register::A => 'A',
            Register::B => 'B',
            Register::C => 'C',
            Register::D => 'D',
        };
        write!(f, "r{letter}")
    }
}

/// `A`..`D`, optionally written `rA`..`rD`. Case is ignored.
pub fn parse_register(token: &str) -> Result<Register, AssemblerErrorKind> {
    let name = token
        .strip_prefix('r')
        .or_else(|| token.strip_prefix('R'))
        .filter(|rest| rest.len() == 1)
        .unwrap_or(token);
    let mut chars = name.chars();
    let (Some(letter), None) = (chars.next(), chars.next()) else {
        return Err(AssemblerErrorKind::InvalidRegister);
    };
    match letter.to_ascii_uppercase() {
        'A' => Ok(Register::A),
        'B' => Ok(Register::B),
        'C' => Ok(Register::C),
        'D' => Ok(Register::D),
        _ => Err(AssemblerErrorKind::InvalidRegister),
    }
}

const MICROS_PER_SECOND: u64 = 1_000_000;
const FRACTION_DIGITS: usize = 6;

/// Decimal seconds to whole microseconds, `0.5` is 500000.
///
/// Fixed point on purpose so quantization of ramp and wait times is
/// exact and reproducible. More than six fractional digits is rejected
/// rather than rounded.
pub fn parse_duration(token: &str) -> Result<u64, AssemblerErrorKind> {
    let (whole, fraction) = token.split_once('.').unwrap_or((token, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(AssemblerErrorKind::InvalidNumber);
    }
    let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    if !all_digits(whole) || !all_digits(fraction) || fraction.len() > FRACTION_DIGITS {
        return Err(AssemblerErrorKind::InvalidNumber);
    }

    let seconds = if whole.is_empty() {
        0
    } else {
        whole.parse::<u64>().map_err(|_| AssemblerErrorKind::InvalidNumber)?
    };
    let mut micros = 0u64;
    for position in 0..FRACTION_DIGITS {
        let digit = fraction
            .chars()
            .nth(position)
            .and_then(|c| c.to_digit(10))
            .unwrap_or(0);
        micros = micros * 10 + u64::from(digit);
    }
    seconds
        .checked_mul(MICROS_PER_SECOND)
        .and_then(|total| total.checked_add(micros))
        .ok_or(AssemblerErrorKind::InvalidNumber)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    Engine1,
    Engine2,
    Engine3,
    External,
}

/// Set of trigger sources, one bit per source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TriggerSet(u8);

impl TriggerSet {
    fn bit(source: TriggerSource) -> u8 {
        match source {
            TriggerSource::Engine1 => 0b0001,
            TriggerSource::Engine2 => 0b0010,
            TriggerSource::Engine3 => 0b0100,
            TriggerSource::External => 0b1000,
        }
    }

    pub fn insert(&mut self, source: TriggerSource) {
        self.0 |= Self::bit(source);
    }

    pub fn contains(&self, source: TriggerSource) -> bool {
        self.0 & Self::bit(source) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerClause {
    Wait(TriggerSet),
    Send(TriggerSet),
}

/// `w{1|2}` waits for engines 1 and 2, `s{e}` sends on the external pin.
pub fn parse_trigger_clause(token: &str) -> Result<TriggerClause, AssemblerErrorKind> {
    let (wait, rest) = if let Some(rest) = token.strip_prefix('w') {
        (true, rest)
    } else if let Some(rest) = token.strip_prefix('s') {
        (false, rest)
    } else {
        return Err(AssemblerErrorKind::InvalidTrigger);
    };
    let body = rest
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .ok_or(AssemblerErrorKind::InvalidTrigger)?;

    let mut set = TriggerSet::default();
    for item in body.split('|') {
        let source = match item.trim() {
            "1" => TriggerSource::Engine1,
            "2" => TriggerSource::Engine2,
            "3" => TriggerSource::Engine3,
            "e" | "E" => TriggerSource::External,
            _ => return Err(AssemblerErrorKind::InvalidTrigger),
        };
        set.insert(source);
    }
    if set.is_empty() {
        return Err(AssemblerErrorKind::InvalidTrigger);
    }
    Ok(if wait { TriggerClause::Wait(set) } else { TriggerClause::Send(set) })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndFlag {
    Interrupt,
    Reset,
}

pub fn parse_end_flag(token: &str) -> Result<EndFlag, AssemblerErrorKind> {
    match token {
        "i" | "I" => Ok(EndFlag::Interrupt),
        "r" | "R" => Ok(EndFlag::Reset),
        _ => Err(AssemblerErrorKind::InvalidFlag),
    }
}

/// `pre=0` or `pre=1`. `Ok(None)` when the token is not a prescale marker.
pub fn parse_prescale_marker(token: &str) -> Result<Option<bool>, AssemblerErrorKind> {
    let Some(value) = token.strip_prefix("pre=") else {
        return Ok(None);
    };
    match value {
        "0" => Ok(Some(false)),
        "1" => Ok(Some(true)),
        _ => Err(AssemblerErrorKind::InvalidRampOperand),
    }
}

/// Register operand of the variable ramp form, `rB` or `-rB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedRegister {
    pub register: Register,
    pub negative: bool,
}

pub fn parse_signed_register(token: &str) -> Result<SignedRegister, AssemblerErrorKind> {
    let (negative, name) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };
    Ok(SignedRegister {
        register: parse_register(name)?,
        negative,
    })
}

/// Label and segment names, `[A-Za-z0-9_]+`.
pub fn is_identifier(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod test;
