use crate::value::Word;

/// Fatal condition raised while executing a single instruction.
#[derive(Debug, thiserror::Error)]
pub enum VmError {
    #[error("unknown instruction: {0}")]
    UnknownInstruction(String),
    #[error("undefined label: {0}")]
    UndefinedLabel(String),
    #[error("stack underflow")]
    StackUnderflow,
    #[error("return stack underflow")]
    ReturnStackUnderflow,
    #[error("division by zero")]
    DivisionByZero,
    #[error("arithmetic overflow")]
    ArithmeticOverflow,
    #[error("invalid address: {0}")]
    InvalidAddress(Word),
    #[error("invalid character code: {0}")]
    InvalidCharacter(Word),
    #[error("invalid input: {0:?}")]
    InvalidInput(String),
    #[error("unexpected end of input")]
    EndOfInput,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A `VmError` together with where it happened.
#[derive(Debug, thiserror::Error)]
#[error("at instruction {index} `{instruction}`: {kind}")]
pub struct Fault {
    pub index: usize,
    pub instruction: String,
    pub kind: VmError,
}
