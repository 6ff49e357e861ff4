//! Flag-producing byte operations.
//!
//! All functions are total over the byte domain. `is_carry` is part of the result but no
//! operation computes a carry, so it is always `false`.

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct AluResult {
    pub sum: u8,
    pub is_zero: bool,
    pub is_carry: bool,
    pub is_overflow: bool,
    pub is_negative: bool,
}

pub type AluOperation = fn(u8, u8) -> AluResult;

const SIGN: u8 = 0x80;

impl AluResult {
    fn new(lhs: u8, rhs: u8, sum: u8) -> Self {
        AluResult {
            sum,
            is_zero: sum == 0,
            is_carry: false,
            is_overflow: is_overflow(lhs, rhs, sum),
            is_negative: sum & SIGN == SIGN,
        }
    }
}

/// Signed overflow: both operands share a sign bit that the result does not.
///
/// Applied to logical operations and shifts as well, where it has no arithmetic meaning.
fn is_overflow(lhs: u8, rhs: u8, sum: u8) -> bool {
    lhs & SIGN == rhs & SIGN && lhs & SIGN != sum & SIGN
}

pub fn not(value: u8) -> AluResult {
    let sum = !value;
    AluResult {
        sum,
        is_zero: sum == 0,
        is_carry: false,
        is_overflow: false,
        is_negative: sum & SIGN == SIGN,
    }
}

pub fn and(lhs: u8, rhs: u8) -> AluResult {
    AluResult::new(lhs, rhs, lhs & rhs)
}

pub fn or(lhs: u8, rhs: u8) -> AluResult {
    AluResult::new(lhs, rhs, lhs | rhs)
}

pub fn xor(lhs: u8, rhs: u8) -> AluResult {
    AluResult::new(lhs, rhs, lhs ^ rhs)
}

/// Shift counts are taken modulo 32, so counts from 8 to 31 clear the byte.
pub fn shl(lhs: u8, rhs: u8) -> AluResult {
    let sum = (u32::from(lhs) << (rhs & 0x1F)) as u8;
    AluResult::new(lhs, rhs, sum)
}

pub fn shr(lhs: u8, rhs: u8) -> AluResult {
    let sum = (u32::from(lhs) >> (rhs & 0x1F)) as u8;
    AluResult::new(lhs, rhs, sum)
}

pub fn add(lhs: u8, rhs: u8) -> AluResult {
    AluResult::new(lhs, rhs, lhs.wrapping_add(rhs))
}

pub fn sub(lhs: u8, rhs: u8) -> AluResult {
    AluResult::new(lhs, rhs, lhs.wrapping_sub(rhs))
}
