use crate::{
    bytecode::{BinaryOp, UnaryOp},
    error::VmError,
    value::Word,
};

fn truth(b: bool) -> Word {
    Word::from(b)
}

impl UnaryOp {
    pub fn apply(self, x: Word) -> Result<Word, VmError> {
        let v = match self {
            Self::Not => truth(x == 0),
            Self::Neg => x.checked_neg().ok_or(VmError::ArithmeticOverflow)?,
            Self::Succ => x.checked_add(1).ok_or(VmError::ArithmeticOverflow)?,
            Self::Pred => x.checked_sub(1).ok_or(VmError::ArithmeticOverflow)?,
        };
        Ok(v)
    }
}

impl BinaryOp {
    pub fn apply(self, l: Word, r: Word) -> Result<Word, VmError> {
        let v = match self {
            // `and`/`or` yield one of the operands, not a normalised 0/1
            Self::And => {
                if l == 0 {
                    l
                } else {
                    r
                }
            }
            Self::Or => {
                if l != 0 {
                    l
                } else {
                    r
                }
            }
            Self::Plus => l.checked_add(r).ok_or(VmError::ArithmeticOverflow)?,
            Self::Minus => l.checked_sub(r).ok_or(VmError::ArithmeticOverflow)?,
            Self::Mult => l.checked_mul(r).ok_or(VmError::ArithmeticOverflow)?,
            Self::Div => floor_div(l, r)?,
            Self::Mod => floor_mod(l, r)?,
            Self::Eq => truth(l == r),
            Self::Ne => truth(l != r),
            Self::Le => truth(l <= r),
            Self::Ge => truth(l >= r),
            Self::Lt => truth(l < r),
            Self::Gt => truth(l > r),
        };
        Ok(v)
    }
}

/// Quotient rounded toward negative infinity.
fn floor_div(l: Word, r: Word) -> Result<Word, VmError> {
    if r == 0 {
        return Err(VmError::DivisionByZero);
    }
    let q = l.checked_div(r).ok_or(VmError::ArithmeticOverflow)?;
    if l % r != 0 && (l < 0) != (r < 0) {
        Ok(q - 1)
    } else {
        Ok(q)
    }
}

/// Remainder taking the sign of the divisor.
fn floor_mod(l: Word, r: Word) -> Result<Word, VmError> {
    if r == 0 {
        return Err(VmError::DivisionByZero);
    }
    let m = l.checked_rem(r).ok_or(VmError::ArithmeticOverflow)?;
    if m != 0 && (m < 0) != (r < 0) {
        Ok(m + r)
    } else {
        Ok(m)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(UnaryOp::Not, 0, 1)]
    #[case(UnaryOp::Not, 5, 0)]
    #[case(UnaryOp::Not, -3, 0)]
    #[case(UnaryOp::Neg, 4, -4)]
    #[case(UnaryOp::Succ, 9, 10)]
    #[case(UnaryOp::Pred, 0, -1)]
    fn unary(#[case] op: UnaryOp, #[case] x: Word, #[case] expected: Word) {
        assert_eq!(op.apply(x).unwrap(), expected);
    }

    #[rstest]
    #[case(BinaryOp::And, 3, 5, 5)]
    #[case(BinaryOp::And, 0, 5, 0)]
    #[case(BinaryOp::And, 3, 0, 0)]
    #[case(BinaryOp::Or, 0, 7, 7)]
    #[case(BinaryOp::Or, 3, 7, 3)]
    #[case(BinaryOp::Or, 0, 0, 0)]
    #[case(BinaryOp::Plus, 2, 3, 5)]
    #[case(BinaryOp::Minus, 7, 3, 4)]
    #[case(BinaryOp::Mult, -4, 6, -24)]
    #[case(BinaryOp::Div, 7, 2, 3)]
    #[case(BinaryOp::Div, -7, 2, -4)]
    #[case(BinaryOp::Div, 7, -2, -4)]
    #[case(BinaryOp::Div, -7, -2, 3)]
    #[case(BinaryOp::Div, 6, -3, -2)]
    #[case(BinaryOp::Mod, 7, 2, 1)]
    #[case(BinaryOp::Mod, -7, 2, 1)]
    #[case(BinaryOp::Mod, 7, -2, -1)]
    #[case(BinaryOp::Mod, -7, -2, -1)]
    #[case(BinaryOp::Mod, 6, 3, 0)]
    #[case(BinaryOp::Eq, 2, 2, 1)]
    #[case(BinaryOp::Ne, 2, 2, 0)]
    #[case(BinaryOp::Le, 2, 3, 1)]
    #[case(BinaryOp::Ge, 2, 3, 0)]
    #[case(BinaryOp::Lt, 3, 3, 0)]
    #[case(BinaryOp::Gt, 4, 3, 1)]
    fn binary(#[case] op: BinaryOp, #[case] l: Word, #[case] r: Word, #[case] expected: Word) {
        assert_eq!(op.apply(l, r).unwrap(), expected);
    }

    #[rstest]
    #[case(BinaryOp::Div)]
    #[case(BinaryOp::Mod)]
    fn divide_by_zero(#[case] op: BinaryOp) {
        assert!(matches!(op.apply(7, 0), Err(VmError::DivisionByZero)));
    }

    #[test]
    fn overflow_is_an_error() {
        assert!(matches!(
            BinaryOp::Plus.apply(Word::MAX, 1),
            Err(VmError::ArithmeticOverflow)
        ));
        assert!(matches!(
            BinaryOp::Div.apply(Word::MIN, -1),
            Err(VmError::ArithmeticOverflow)
        ));
        assert!(matches!(
            UnaryOp::Neg.apply(Word::MIN),
            Err(VmError::ArithmeticOverflow)
        ));
    }
}
