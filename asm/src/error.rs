use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to read source file: {0}")]
    FileRead(String, #[source] std::io::Error),

    #[error(transparent)]
    Object(#[from] obj::Error),

    #[error("Invalid literal: `{0}`")]
    InvalidLiteral(String),

    #[error("Invalid expression: {0}")]
    InvalidExpression(String),

    #[error("Unknown symbol: `{0}`")]
    UnknownSymbol(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Unclosed parenthesis")]
    UnclosedParen,

    #[error("Unknown mnemonic: `{0}`")]
    UnknownMnemonic(String),

    #[error("Label defined more than once: `{0}`")]
    DuplicateLabel(String),

    #[error("`{0}` is imported with .ref and cannot be redefined here")]
    RefRedefined(String),

    #[error(".equ cannot redefine symbol: `{0}`")]
    EquRedefined(String),

    #[error("{0} requires a value")]
    MissingValue(String),

    #[error("Invalid .string literal: {0}")]
    InvalidString(String),

    #[error("Invalid operand: `{0}`")]
    InvalidOperand(String),

    #[error("{0} requires two operands")]
    OperandCount(String),

    #[error("Macro `{0}` is not closed with .endm")]
    UnterminatedMacro(String),

    #[error("Macro `{name}` expects {expected} arguments, {given} given")]
    MacroArity {
        name: String,
        expected: usize,
        given: usize,
    },
}
