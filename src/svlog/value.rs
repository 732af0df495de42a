// Copyright (c) 2016-2021 Fabian Schuiki

//! Representation of constant values and their operations.
//!
//! This module implements the tagged value domain that constant evaluation
//! produces: arbitrary-precision 4-state integers, IEEE-754 doubles, byte
//! strings, and aggregates. The `Unassigned` variant is the null that
//! propagates unchanged through every built-in method.

use crate::token::{LiteralBase, VectorLiteral};
use bit_vec::BitVec;
use num::bigint::Sign;
use num::{BigInt, ToPrimitive, Zero};
use std::fmt;

/// An arbitrary-precision 4-state integer.
///
/// The `special` mask marks bits that are x or z; the `x` mask marks which of
/// those are x. Both masks are indexed from the least significant bit.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct SvInt {
    pub width: u32,
    pub signed: bool,
    pub value: BigInt,
    pub special: BitVec,
    pub x: BitVec,
}

impl SvInt {
    /// Create a new fully-known integer value.
    pub fn new(width: u32, signed: bool, value: BigInt) -> SvInt {
        SvInt {
            width,
            signed,
            value,
            special: BitVec::from_elem(width as usize, false),
            x: BitVec::from_elem(width as usize, false),
        }
    }

    pub fn from_i32(value: i32) -> SvInt {
        SvInt::new(32, true, BigInt::from(value))
    }

    pub fn from_u8(value: u8) -> SvInt {
        SvInt::new(8, false, BigInt::from(value))
    }

    /// Whether any bit of the value is x or z.
    pub fn has_unknown(&self) -> bool {
        self.special.any()
    }

    /// The value as an `i32`, if it is fully known and fits.
    pub fn as_i32(&self) -> Option<i32> {
        if self.has_unknown() {
            return None;
        }
        self.value.to_i32()
    }

    /// The value as a `u8`, if it is fully known and fits.
    pub fn as_u8(&self) -> Option<u8> {
        if self.has_unknown() {
            return None;
        }
        self.value.to_u8()
    }

    /// Interpret the digit text of a lexed vector literal. Digits `x`, `z`,
    /// and `?` mark the corresponding bits as unknown; for decimal literals
    /// an unknown digit makes the entire value unknown.
    pub fn from_digits(lit: &VectorLiteral) -> SvInt {
        let digits = lit.digits.as_str();
        let mut value = BigInt::zero();
        let mut special = BitVec::new();
        let mut x = BitVec::new();
        match lit.base.bits_per_digit() {
            Some(bits) => {
                for c in digits.chars() {
                    value <<= bits as usize;
                    let (digit, is_special, is_x) = match c {
                        'x' | 'X' => (0, true, true),
                        'z' | 'Z' | '?' => (0, true, false),
                        _ => (c.to_digit(lit.base.radix()).unwrap_or(0), false, false),
                    };
                    value += digit;
                    // Masks grow from the most significant digit down; they
                    // are reversed into LSB-first order below.
                    for _ in 0..bits {
                        special.push(is_special);
                        x.push(is_x);
                    }
                }
                special = special.iter().rev().collect();
                x = x.iter().rev().collect();
            }
            None => {
                let mut any_special = false;
                let mut any_x = false;
                for c in digits.chars() {
                    match c {
                        'x' | 'X' => {
                            any_special = true;
                            any_x = true;
                        }
                        'z' | 'Z' | '?' => any_special = true,
                        _ => {
                            value *= 10;
                            value += c.to_digit(10).unwrap_or(0);
                        }
                    }
                }
                if any_special {
                    value = BigInt::zero();
                }
                let width = lit.size.unwrap_or(32) as usize;
                special = BitVec::from_elem(width, any_special);
                x = BitVec::from_elem(width, any_x);
            }
        }
        let width = lit
            .size
            .unwrap_or_else(|| special.len().max(32) as u32);
        let mut sv = SvInt {
            width,
            signed: lit.signed,
            value,
            special,
            x,
        };
        sv.special.truncate(width as usize);
        sv.x.truncate(width as usize);
        sv
    }

    /// Render the value in the given base, the way the `itoa` family of
    /// string methods does: decimal keeps its sign, the other bases render
    /// the two's complement bit pattern.
    pub fn to_string_radix(&self, base: LiteralBase) -> String {
        match base {
            LiteralBase::Decimal => self.value.to_str_radix(10),
            _ => {
                let width = if self.width == 0 { 32 } else { self.width };
                let wrapped = if self.value.sign() == Sign::Minus {
                    (BigInt::from(1) << width as usize) + &self.value
                } else {
                    self.value.clone()
                };
                wrapped.to_str_radix(base.radix())
            }
        }
    }
}

impl fmt::Display for SvInt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.has_unknown() {
            write!(f, "{}'({} unknown bits)", self.width, self.special.len())
        } else {
            write!(f, "{}", self.value)
        }
    }
}

/// A constant value produced by evaluation.
#[derive(Clone, PartialEq, Debug)]
pub enum ConstantValue {
    /// The null value; propagates through every operation.
    Unassigned,
    Int(SvInt),
    Real(f64),
    Str(Vec<u8>),
    Aggregate(Vec<ConstantValue>),
}

impl ConstantValue {
    pub fn int32(value: i32) -> ConstantValue {
        ConstantValue::Int(SvInt::from_i32(value))
    }

    pub fn byte(value: u8) -> ConstantValue {
        ConstantValue::Int(SvInt::from_u8(value))
    }

    pub fn string<S: Into<Vec<u8>>>(value: S) -> ConstantValue {
        ConstantValue::Str(value.into())
    }

    pub fn is_unassigned(&self) -> bool {
        matches!(self, ConstantValue::Unassigned)
    }

    pub fn integer(&self) -> Option<&SvInt> {
        match self {
            ConstantValue::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn real(&self) -> Option<f64> {
        match self {
            ConstantValue::Real(v) => Some(*v),
            _ => None,
        }
    }

    pub fn str_bytes(&self) -> Option<&[u8]> {
        match self {
            ConstantValue::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Whether the value counts as true in a generate condition: a fully
    /// known, non-zero integer.
    pub fn is_true(&self) -> bool {
        match self {
            ConstantValue::Int(v) => !v.has_unknown() && !v.value.is_zero(),
            ConstantValue::Real(v) => *v != 0.0,
            _ => false,
        }
    }

    /// A hashable rendition of the value, used to key instance bodies and
    /// generic-class specializations by their parameter assignments.
    pub fn key(&self) -> ValueKey {
        match self {
            ConstantValue::Unassigned => ValueKey::Unassigned,
            ConstantValue::Int(v) => ValueKey::Int(v.value.clone(), v.special.to_bytes()),
            ConstantValue::Real(v) => ValueKey::Real(v.to_bits()),
            ConstantValue::Str(v) => ValueKey::Str(v.clone()),
            ConstantValue::Aggregate(vs) => {
                ValueKey::Aggregate(vs.iter().map(|v| v.key()).collect())
            }
        }
    }
}

/// A canonical, hashable form of a constant value.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum ValueKey {
    Unassigned,
    Int(BigInt, Vec<u8>),
    Real(u64),
    Str(Vec<u8>),
    Aggregate(Vec<ValueKey>),
}

/// The canonical parameter assignment of an instance body or class
/// specialization.
pub type ParamKey = Vec<ValueKey>;
