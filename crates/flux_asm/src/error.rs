use core::fmt;

use thiserror_no_std::Error;

use crate::parser::Instruction;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerErrorKind {
    #[error("label is already defined")]
    DuplicateLabel,
    #[error("no valid opcode")]
    UnrecognizedOpcode,
    #[error("name is too long")]
    NameTooLong,
    #[error("too many operands")]
    TooManyOperands,
    #[error("missing arguments")]
    MissingOperand,
    #[error("no arguments needed for this command")]
    UnexpectedOperand,
    #[error("wrong data type, number expected")]
    InvalidNumber,
    #[error("wrong register, valid registers are A, B, C and D")]
    InvalidRegister,
    #[error("no such label found in source")]
    UnknownLabel,
    #[error("value {value} is out of range, valid range is {min} to {max}")]
    ValueOutOfRange { value: i64, min: i32, max: i32 },
    #[error("jump target must be after the jump instruction")]
    BackwardJump,
    #[error("wrong flag, valid flags are i and r")]
    InvalidFlag,
    #[error("wrong trigger clause, expected w{{..}} or s{{..}} with engines 1, 2, 3 or e")]
    InvalidTrigger,
    #[error("only one wait and one send clause are allowed")]
    DuplicateTriggerClause,
    #[error("wrong ramp operand")]
    InvalidRampOperand,
    #[error("unknown instruction")]
    UnknownInstruction,
    #[error("opcode table entry does not fit its encoder")]
    TableMismatch,
    #[error("too many labels")]
    MaxLabelsExceeded,
    #[error("too many source lines")]
    MaxInstructionsExceeded,
    #[error("too many segments")]
    MaxSegmentsExceeded,
    #[error("program does not fit in engine memory")]
    ProgramTooLarge,
    #[error("line number overflow")]
    LineNumberOverflow,
    #[error("image length is not a whole number of words")]
    OddImageLength,
}

/// Fatal diagnostic for one assembly run.
///
/// Parse errors know the line they came from, encode errors additionally
/// carry the instruction record as far as it was decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblerError<'a> {
    Kind(AssemblerErrorKind),
    WithLine {
        line: u32,
        text: &'a str,
        kind: AssemblerErrorKind,
    },
    WithInstruction {
        instruction: Instruction<'a>,
        kind: AssemblerErrorKind,
    },
}

impl<'a> AssemblerError<'a> {
    pub(crate) fn with_line(self, line: u32, text: &'a str) -> Self {
        match self {
            AssemblerError::Kind(kind) => AssemblerError::WithLine { line, text, kind },
            _ => self,
        }
    }

    pub(crate) fn with_instruction(self, instruction: &Instruction<'a>) -> Self {
        match self {
            AssemblerError::WithInstruction { .. } => self,
            AssemblerError::Kind(kind) | AssemblerError::WithLine { kind, .. } => {
                AssemblerError::WithInstruction {
                    instruction: instruction.clone(),
                    kind,
                }
            }
        }
    }

    pub fn line_number(&self) -> Option<u32> {
        match self {
            Self::Kind(_) => None,
            Self::WithLine { line, .. } => Some(*line),
            Self::WithInstruction { instruction, .. } => Some(instruction.line_number),
        }
    }

    pub fn line_text(&self) -> Option<&'a str> {
        match self {
            Self::Kind(_) => None,
            Self::WithLine { text, .. } => Some(*text),
            Self::WithInstruction { instruction, .. } => Some(instruction.line),
        }
    }

    pub fn error_kind(&self) -> &AssemblerErrorKind {
        match self {
            Self::Kind(kind) => kind,
            Self::WithLine { kind, .. } => kind,
            Self::WithInstruction { kind, .. } => kind,
        }
    }
}

impl From<AssemblerErrorKind> for AssemblerError<'_> {
    fn from(kind: AssemblerErrorKind) -> Self {
        AssemblerError::Kind(kind)
    }
}

impl fmt::Display for AssemblerError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kind(kind) => write!(f, "error: {kind}"),
            Self::WithLine { line, text, kind } => {
                writeln!(f, "error: {kind}")?;
                writeln!(f, "-> {text}")?;
                write!(f, "-> line no: {line}")
            }
            Self::WithInstruction { instruction, kind } => {
                writeln!(f, "error: {kind}")?;
                writeln!(f, "-> {}", instruction.line)?;
                writeln!(f, "-> line no: {}", instruction.line_number)?;
                write!(f, "{instruction}")
            }
        }
    }
}
