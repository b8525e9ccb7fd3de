use std::fmt;
use std::str::FromStr;

use crate::value::Word;

/// Declares an operator tag enum with its textual mnemonics.
macro_rules! mnemonics {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal,)+ }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant,)+
        }

        impl FromStr for $name {
            type Err = ();

            fn from_str(s: &str) -> Result<Self, ()> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(()),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(match self {
                    $(Self::$variant => $text,)+
                })
            }
        }
    };
}

mnemonics!(UnaryOp {
    Not => "UNOT",
    Neg => "UNEG",
    Succ => "USUCC",
    Pred => "UPRED",
});

mnemonics!(BinaryOp {
    And => "BAND",
    Or => "BOR",
    Plus => "BPLUS",
    Minus => "BMINUS",
    Mult => "BMULT",
    Div => "BDIV",
    Mod => "BMOD",
    Eq => "BEQ",
    Ne => "BNE",
    Le => "BLE",
    Ge => "BGE",
    Lt => "BLT",
    Gt => "BGT",
});

mnemonics!(
    /// Operands of `SOS`.
    SysCall {
        TraceX => "TRACEX",
        DumpMem => "DUMPMEM",
        Input => "INPUT",
        InputC => "INPUTC",
        Output => "OUTPUT",
        OutputC => "OUTPUTC",
        OutputL => "OUTPUTL",
        Eof => "EOF",
    }
);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Nop,
    Halt,
    Lit(Word),
    Llv(Word),
    Lgv(Word),
    Slv(Word),
    Sgv(Word),
    Lla(Word),
    Lga(Word),
    Uop(UnaryOp),
    Bop(BinaryOp),
    Pop(usize),
    Dup,
    Swap,
    Call(usize),
    Rtn(usize),
    Goto(String),
    Cond(String, String),
    Code(String),
    Sos(SysCall),
    /// A row that did not decode; fails only once executed.
    Unknown(String),
}

impl Instruction {
    pub fn decode(words: &[&str]) -> Self {
        Self::try_decode(words).unwrap_or_else(|| Self::Unknown(words.join(" ")))
    }

    fn try_decode(words: &[&str]) -> Option<Self> {
        let ins = match *words {
            ["NOP"] => Self::Nop,
            ["HALT"] => Self::Halt,
            ["LIT", v] => Self::Lit(v.parse().ok()?),
            ["LLV", i] => Self::Llv(i.parse().ok()?),
            ["LGV", i] => Self::Lgv(i.parse().ok()?),
            ["SLV", i] => Self::Slv(i.parse().ok()?),
            ["SGV", i] => Self::Sgv(i.parse().ok()?),
            ["LLA", i] => Self::Lla(i.parse().ok()?),
            ["LGA", i] => Self::Lga(i.parse().ok()?),
            ["UOP", op] => Self::Uop(op.parse().ok()?),
            ["BOP", op] => Self::Bop(op.parse().ok()?),
            ["POP", n] => Self::Pop(n.parse().ok()?),
            ["DUP"] => Self::Dup,
            ["SWAP"] => Self::Swap,
            ["CALL", n] => Self::Call(n.parse().ok()?),
            ["RTN", n] => Self::Rtn(n.parse().ok()?),
            ["GOTO", l] => Self::Goto(l.into()),
            ["COND", l, m] => Self::Cond(l.into(), m.into()),
            ["CODE", f] => Self::Code(f.into()),
            ["SOS", k] => Self::Sos(k.parse().ok()?),
            _ => return None,
        };
        Some(ins)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nop => write!(f, "NOP"),
            Self::Halt => write!(f, "HALT"),
            Self::Lit(v) => write!(f, "LIT {v}"),
            Self::Llv(i) => write!(f, "LLV {i}"),
            Self::Lgv(i) => write!(f, "LGV {i}"),
            Self::Slv(i) => write!(f, "SLV {i}"),
            Self::Sgv(i) => write!(f, "SGV {i}"),
            Self::Lla(i) => write!(f, "LLA {i}"),
            Self::Lga(i) => write!(f, "LGA {i}"),
            Self::Uop(op) => write!(f, "UOP {op}"),
            Self::Bop(op) => write!(f, "BOP {op}"),
            Self::Pop(n) => write!(f, "POP {n}"),
            Self::Dup => write!(f, "DUP"),
            Self::Swap => write!(f, "SWAP"),
            Self::Call(n) => write!(f, "CALL {n}"),
            Self::Rtn(n) => write!(f, "RTN {n}"),
            Self::Goto(l) => write!(f, "GOTO {l}"),
            Self::Cond(l, m) => write!(f, "COND {l} {m}"),
            Self::Code(l) => write!(f, "CODE {l}"),
            Self::Sos(k) => write!(f, "SOS {k}"),
            Self::Unknown(raw) => f.write_str(raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_operands() {
        assert_eq!(Instruction::decode(&["LIT", "-12"]), Instruction::Lit(-12));
        assert_eq!(
            Instruction::decode(&["BOP", "BMINUS"]),
            Instruction::Bop(BinaryOp::Minus)
        );
        assert_eq!(
            Instruction::decode(&["COND", "L1", "L2"]),
            Instruction::Cond("L1".into(), "L2".into())
        );
        assert_eq!(
            Instruction::decode(&["SOS", "OUTPUTL"]),
            Instruction::Sos(SysCall::OutputL)
        );
    }

    #[test]
    fn undecodable_rows_are_kept() {
        assert_eq!(
            Instruction::decode(&["JMP", "L1"]),
            Instruction::Unknown("JMP L1".into())
        );
        assert_eq!(
            Instruction::decode(&["UOP", "UABS"]),
            Instruction::Unknown("UOP UABS".into())
        );
        assert_eq!(
            Instruction::decode(&["LIT", "x"]),
            Instruction::Unknown("LIT x".into())
        );
        assert_eq!(
            Instruction::decode(&["POP", "-1"]),
            Instruction::Unknown("POP -1".into())
        );
        assert_eq!(
            Instruction::decode(&["HALT", "now"]),
            Instruction::Unknown("HALT now".into())
        );
    }

    #[test]
    fn display_matches_source_form() {
        for row in ["LIT 5", "CALL 2", "COND a b", "SOS INPUTC", "UOP UNEG"] {
            let words: Vec<&str> = row.split_whitespace().collect();
            assert_eq!(Instruction::decode(&words).to_string(), row);
        }
    }
}
