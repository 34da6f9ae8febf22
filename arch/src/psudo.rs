use crate::op::Format;

/// A mnemonic/operand pair after pseudo-instruction rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformed {
    pub mnemonic: String,
    pub operands: String,
    pub format: Format,
    pub byte_mode: bool,
}

/// Rewrite emulated mnemonics into their real equivalents.
///
/// Both assembler passes run every line through this transform, so the size
/// accounting of pass one and the encoding of pass two always agree.
pub fn transform(mnemonic: &str, operands: &str, format: Format, byte_mode: bool) -> Transformed {
    let upper = mnemonic.to_ascii_uppercase();
    let ops = operands.trim();

    let double = |mnemonic: &str, operands: String, byte_mode: bool| Transformed {
        mnemonic: mnemonic.to_string(),
        operands,
        format: Format::Double,
        byte_mode,
    };

    match upper.as_str() {
        "JMP" | "BR" => return double("MOV", format!("#{},R0", ops), byte_mode),
        "CLR" | "CLRW" => return double("MOV", format!("#0,{}", ops), byte_mode),
        "CLRB" => return double("MOV", format!("#0,{}", ops), true),
        "INC" | "INCW" => return double("ADD", format!("#1,{}", ops), byte_mode),
        "INCB" => return double("ADD", format!("#1,{}", ops), true),
        "DEC" | "DECW" => return double("SUB", format!("#1,{}", ops), byte_mode),
        "DECB" => return double("SUB", format!("#1,{}", ops), true),
        "TST" | "TSTW" => return double("CMP", format!("{},{}", ops, ops), byte_mode),
        "TSTB" => return double("CMP", format!("{},{}", ops, ops), true),
        _ => {}
    }

    // A trailing .B or .W folds into the width bit.
    let (mnemonic, byte_mode) = if let Some(base) = upper.strip_suffix(".B") {
        (base.to_string(), true)
    } else if let Some(base) = upper.strip_suffix(".W") {
        (base.to_string(), false)
    } else {
        (upper, byte_mode)
    };

    Transformed {
        mnemonic,
        operands: operands.to_string(),
        format,
        byte_mode,
    }
}
