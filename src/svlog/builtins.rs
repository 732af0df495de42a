// Copyright (c) 2016-2021 Fabian Schuiki

//! Built-in methods on the `string` type, evaluable as compile-time
//! constants.
//!
//! Each registered method carries its name, kind, and signature; the
//! receiver is the implicit first argument. All methods operate on the raw
//! byte string and propagate `Unassigned` inputs unchanged. The methods that
//! write back into the receiver (`putc` and the `itoa` family) require it to
//! be an l-value.

use crate::eval::{EvalContext, Expr};
use crate::token::LiteralBase;
use crate::value::{ConstantValue, SvInt};
use std::collections::HashMap;

/// Whether a subroutine is a function or a task.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SubroutineKind {
    Function,
    Task,
}

/// The argument and return types a built-in declares.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ArgType {
    Int,
    Byte,
    Integer,
    Real,
    Str,
    Void,
}

/// A built-in subroutine known to the constant evaluator.
pub trait SystemSubroutine: Sync {
    fn name(&self) -> &'static str;

    fn kind(&self) -> SubroutineKind {
        SubroutineKind::Function
    }

    /// Whether the receiver is passed as the implicit first argument.
    fn is_method(&self) -> bool {
        true
    }

    /// The declared argument types (excluding the receiver) and return type.
    fn signature(&self) -> (&'static [ArgType], ArgType);

    /// Evaluate the subroutine. `args[0]` is the receiver.
    fn eval(&self, cx: &mut EvalContext, args: &[Expr]) -> ConstantValue;
}

/// The registry of built-in methods, keyed by name.
pub struct BuiltinRegistry {
    methods: HashMap<&'static str, Box<dyn SystemSubroutine>>,
}

impl BuiltinRegistry {
    fn new() -> BuiltinRegistry {
        BuiltinRegistry {
            methods: HashMap::new(),
        }
    }

    fn add(&mut self, method: Box<dyn SystemSubroutine>) {
        self.methods.insert(method.name(), method);
    }

    pub fn get(&self, name: &str) -> Option<&dyn SystemSubroutine> {
        self.methods.get(name).map(|m| &**m)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }
}

lazy_static! {
    static ref REGISTRY: BuiltinRegistry = {
        let mut r = BuiltinRegistry::new();
        register_string_methods(&mut r);
        r
    };
}

/// The global registry of built-in methods.
pub fn registry() -> &'static BuiltinRegistry {
    &REGISTRY
}

/// Register the built-in methods of the `string` type.
pub fn register_string_methods(registry: &mut BuiltinRegistry) {
    registry.add(Box::new(StringLenMethod));
    registry.add(Box::new(StringPutcMethod));
    registry.add(Box::new(StringGetcMethod));
    registry.add(Box::new(StringUpperLowerMethod { name: "toupper", upper: true }));
    registry.add(Box::new(StringUpperLowerMethod { name: "tolower", upper: false }));
    registry.add(Box::new(StringCompareMethod { name: "compare", ignore_case: false }));
    registry.add(Box::new(StringCompareMethod { name: "icompare", ignore_case: true }));
    registry.add(Box::new(StringSubstrMethod));
    registry.add(Box::new(StringAtoIMethod { name: "atoi", base: 10 }));
    registry.add(Box::new(StringAtoIMethod { name: "atohex", base: 16 }));
    registry.add(Box::new(StringAtoIMethod { name: "atooct", base: 8 }));
    registry.add(Box::new(StringAtoIMethod { name: "atobin", base: 2 }));
    registry.add(Box::new(StringAtoRealMethod));
    registry.add(Box::new(StringItoAMethod { name: "itoa", base: LiteralBase::Decimal }));
    registry.add(Box::new(StringItoAMethod { name: "hextoa", base: LiteralBase::Hex }));
    registry.add(Box::new(StringItoAMethod { name: "octtoa", base: LiteralBase::Octal }));
    registry.add(Box::new(StringItoAMethod { name: "bintoa", base: LiteralBase::Binary }));
    registry.add(Box::new(StringRealtoAMethod));
}

struct StringLenMethod;

impl SystemSubroutine for StringLenMethod {
    fn name(&self) -> &'static str {
        "len"
    }

    fn signature(&self) -> (&'static [ArgType], ArgType) {
        (&[], ArgType::Int)
    }

    fn eval(&self, cx: &mut EvalContext, args: &[Expr]) -> ConstantValue {
        let val = cx.eval(&args[0]);
        match val.str_bytes() {
            Some(bytes) => ConstantValue::int32(bytes.len() as i32),
            None => ConstantValue::Unassigned,
        }
    }
}

struct StringPutcMethod;

impl SystemSubroutine for StringPutcMethod {
    fn name(&self) -> &'static str {
        "putc"
    }

    fn signature(&self) -> (&'static [ArgType], ArgType) {
        (&[ArgType::Int, ArgType::Byte], ArgType::Void)
    }

    fn eval(&self, cx: &mut EvalContext, args: &[Expr]) -> ConstantValue {
        let slot = match cx.eval_lvalue(&args[0]) {
            Some(slot) => slot,
            None => return ConstantValue::Unassigned,
        };
        let index = cx.eval(&args[1]);
        let c = cx.eval(&args[2]);
        let (index, c) = match (
            index.integer().and_then(|v| v.as_i32()),
            c.integer().and_then(|v| v.as_u8()),
        ) {
            (Some(i), Some(c)) => (i, c),
            _ => return ConstantValue::Unassigned,
        };
        let mut bytes = match cx.load_local(slot).str_bytes() {
            Some(bytes) => bytes.to_vec(),
            None => return ConstantValue::Unassigned,
        };
        if c == 0 || index < 0 || index as usize >= bytes.len() {
            return ConstantValue::Unassigned;
        }
        bytes[index as usize] = c;
        cx.store_local(slot, ConstantValue::Str(bytes));
        ConstantValue::Unassigned
    }
}

struct StringGetcMethod;

impl SystemSubroutine for StringGetcMethod {
    fn name(&self) -> &'static str {
        "getc"
    }

    fn signature(&self) -> (&'static [ArgType], ArgType) {
        (&[ArgType::Int], ArgType::Byte)
    }

    fn eval(&self, cx: &mut EvalContext, args: &[Expr]) -> ConstantValue {
        let val = cx.eval(&args[0]);
        let index = cx.eval(&args[1]);
        let (bytes, index) = match (val.str_bytes(), index.integer().and_then(|v| v.as_i32())) {
            (Some(bytes), Some(index)) => (bytes, index),
            _ => return ConstantValue::Unassigned,
        };
        if index < 0 || index as usize >= bytes.len() {
            return ConstantValue::byte(0);
        }
        ConstantValue::byte(bytes[index as usize])
    }
}

struct StringUpperLowerMethod {
    name: &'static str,
    upper: bool,
}

impl SystemSubroutine for StringUpperLowerMethod {
    fn name(&self) -> &'static str {
        self.name
    }

    fn signature(&self) -> (&'static [ArgType], ArgType) {
        (&[], ArgType::Str)
    }

    fn eval(&self, cx: &mut EvalContext, args: &[Expr]) -> ConstantValue {
        let val = cx.eval(&args[0]);
        match val.str_bytes() {
            Some(bytes) => {
                let folded = bytes
                    .iter()
                    .map(|&c| {
                        if self.upper {
                            c.to_ascii_uppercase()
                        } else {
                            c.to_ascii_lowercase()
                        }
                    })
                    .collect();
                ConstantValue::Str(folded)
            }
            None => ConstantValue::Unassigned,
        }
    }
}

struct StringCompareMethod {
    name: &'static str,
    ignore_case: bool,
}

impl SystemSubroutine for StringCompareMethod {
    fn name(&self) -> &'static str {
        self.name
    }

    fn signature(&self) -> (&'static [ArgType], ArgType) {
        (&[ArgType::Str], ArgType::Int)
    }

    fn eval(&self, cx: &mut EvalContext, args: &[Expr]) -> ConstantValue {
        let lhs = cx.eval(&args[0]);
        let rhs = cx.eval(&args[1]);
        let (lhs, rhs) = match (lhs.str_bytes(), rhs.str_bytes()) {
            (Some(l), Some(r)) => (l, r),
            _ => return ConstantValue::Unassigned,
        };
        let ord = if self.ignore_case {
            // Byte-wise, case-folded; a shared prefix makes the shorter
            // string compare less.
            let l = lhs.iter().map(|c| c.to_ascii_lowercase());
            let r = rhs.iter().map(|c| c.to_ascii_lowercase());
            l.cmp(r)
        } else {
            lhs.cmp(rhs)
        };
        ConstantValue::int32(match ord {
            std::cmp::Ordering::Less => -1,
            std::cmp::Ordering::Equal => 0,
            std::cmp::Ordering::Greater => 1,
        })
    }
}

struct StringSubstrMethod;

impl SystemSubroutine for StringSubstrMethod {
    fn name(&self) -> &'static str {
        "substr"
    }

    fn signature(&self) -> (&'static [ArgType], ArgType) {
        (&[ArgType::Int, ArgType::Int], ArgType::Str)
    }

    fn eval(&self, cx: &mut EvalContext, args: &[Expr]) -> ConstantValue {
        let val = cx.eval(&args[0]);
        let left = cx.eval(&args[1]);
        let right = cx.eval(&args[2]);
        let (bytes, left, right) = match (
            val.str_bytes(),
            left.integer().and_then(|v| v.as_i32()),
            right.integer().and_then(|v| v.as_i32()),
        ) {
            (Some(b), Some(l), Some(r)) => (b, l, r),
            _ => return ConstantValue::Unassigned,
        };
        if left < 0 || right < left || right as usize >= bytes.len() {
            return ConstantValue::string("");
        }
        ConstantValue::Str(bytes[left as usize..=right as usize].to_vec())
    }
}

struct StringAtoIMethod {
    name: &'static str,
    base: u32,
}

impl SystemSubroutine for StringAtoIMethod {
    fn name(&self) -> &'static str {
        self.name
    }

    fn signature(&self) -> (&'static [ArgType], ArgType) {
        (&[], ArgType::Integer)
    }

    fn eval(&self, cx: &mut EvalContext, args: &[Expr]) -> ConstantValue {
        let val = cx.eval(&args[0]);
        let bytes = match val.str_bytes() {
            Some(bytes) => bytes,
            None => return ConstantValue::Unassigned,
        };
        let stripped: Vec<u8> = bytes.iter().copied().filter(|&c| c != b'_').collect();
        // Scan forward to the first digit run, allowing a sign directly in
        // front of it; a digit outside the radix terminates parsing.
        let is_digit = |c: u8| (c as char).to_digit(self.base).is_some();
        let mut start = 0;
        let mut negative = false;
        for (i, &c) in stripped.iter().enumerate() {
            if is_digit(c) {
                start = i;
                break;
            }
            if (c == b'-' || c == b'+') && stripped.get(i + 1).copied().map_or(false, is_digit) {
                negative = c == b'-';
                start = i + 1;
                break;
            }
            start = stripped.len();
        }
        let mut value: i64 = 0;
        for &c in &stripped[start..] {
            match (c as char).to_digit(self.base) {
                Some(d) => {
                    value = value.saturating_mul(self.base as i64).saturating_add(d as i64);
                }
                None => break,
            }
        }
        if negative {
            value = -value;
        }
        ConstantValue::Int(SvInt::new(32, true, (value as i32).into()))
    }
}

struct StringAtoRealMethod;

impl SystemSubroutine for StringAtoRealMethod {
    fn name(&self) -> &'static str {
        "atoreal"
    }

    fn signature(&self) -> (&'static [ArgType], ArgType) {
        (&[], ArgType::Real)
    }

    fn eval(&self, cx: &mut EvalContext, args: &[Expr]) -> ConstantValue {
        let val = cx.eval(&args[0]);
        let bytes = match val.str_bytes() {
            Some(bytes) => bytes,
            None => return ConstantValue::Unassigned,
        };
        let text: String = bytes
            .iter()
            .filter(|&&c| c != b'_')
            .map(|&c| c as char)
            .collect();
        ConstantValue::Real(parse_real_prefix(text.trim_start()))
    }
}

/// Parse the longest valid floating-point prefix of `text`, the way strtod
/// does; an empty prefix yields zero.
fn parse_real_prefix(text: &str) -> f64 {
    let bytes = text.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    while matches!(bytes.get(end), Some(c) if c.is_ascii_digit()) {
        end += 1;
    }
    if bytes.get(end) == Some(&b'.') {
        end += 1;
        while matches!(bytes.get(end), Some(c) if c.is_ascii_digit()) {
            end += 1;
        }
    }
    if matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        if matches!(bytes.get(exp_end), Some(c) if c.is_ascii_digit()) {
            exp_end += 1;
            while matches!(bytes.get(exp_end), Some(c) if c.is_ascii_digit()) {
                exp_end += 1;
            }
            end = exp_end;
        }
    }
    text[..end].parse().unwrap_or(0.0)
}

struct StringItoAMethod {
    name: &'static str,
    base: LiteralBase,
}

impl SystemSubroutine for StringItoAMethod {
    fn name(&self) -> &'static str {
        self.name
    }

    fn signature(&self) -> (&'static [ArgType], ArgType) {
        (&[ArgType::Integer], ArgType::Void)
    }

    fn eval(&self, cx: &mut EvalContext, args: &[Expr]) -> ConstantValue {
        let slot = match cx.eval_lvalue(&args[0]) {
            Some(slot) => slot,
            None => return ConstantValue::Unassigned,
        };
        let val = cx.eval(&args[1]);
        let val = match val.integer() {
            Some(v) => v,
            None => return ConstantValue::Unassigned,
        };
        let rendered = val.to_string_radix(self.base);
        cx.store_local(slot, ConstantValue::string(rendered));
        ConstantValue::Unassigned
    }
}

struct StringRealtoAMethod;

impl SystemSubroutine for StringRealtoAMethod {
    fn name(&self) -> &'static str {
        "realtoa"
    }

    fn signature(&self) -> (&'static [ArgType], ArgType) {
        (&[ArgType::Real], ArgType::Void)
    }

    fn eval(&self, cx: &mut EvalContext, args: &[Expr]) -> ConstantValue {
        let slot = match cx.eval_lvalue(&args[0]) {
            Some(slot) => slot,
            None => return ConstantValue::Unassigned,
        };
        let val = cx.eval(&args[1]);
        let val = match val.real() {
            Some(v) => v,
            None => return ConstantValue::Unassigned,
        };
        cx.store_local(slot, ConstantValue::string(format!("{:.6}", val)));
        ConstantValue::Unassigned
    }
}
