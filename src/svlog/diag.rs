// Copyright (c) 2016-2021 Fabian Schuiki

//! Diagnostic codes and the diagnostic sink.
//!
//! Diagnostics carry a code from a closed set, a byte-accurate source
//! location, and a list of typed arguments that are only rendered when the
//! diagnostic is formatted. The sink is an append-only, insertion-ordered
//! collection; the elaborator reads its live error count to implement the
//! error-limit short-circuit.

use crate::common::name::Name;
use crate::common::source::Location;
use std::fmt;

/// The severity of a diagnostic.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Severity {
    Note,
    Warning,
    Error,
}

impl Severity {
    pub fn to_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

/// The closed set of diagnostic codes the front-end can produce.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum DiagCode {
    // Lexical
    NonPrintableChar,
    Utf8Char,
    UnicodeBom,
    EmbeddedNull,
    EscapedWhitespace,
    MisplacedDirectiveChar,
    UnterminatedBlockComment,
    NestedBlockComment,
    NewlineInStringLiteral,
    UnterminatedStringLiteral,
    OctalEscapeCodeTooBig,
    InvalidHexEscapeCode,
    UnknownEscapeCode,
    SignedLiteralTooLarge,
    MissingFractionalDigits,
    MissingExponentDigits,
    RealExponentTooLarge,
    IntegerSizeZero,
    IntegerSizeTooLarge,
    MissingVectorBase,
    MissingVectorDigits,
    InvalidUnsizedLiteral,

    // Structural
    InfinitelyRecursiveHierarchy,
    MaxInstanceDepthExceeded,

    // Elaboration
    ElabTaskError,
    ElabTaskWarning,
    DuplicateTimingPath,
    PulseStyleAfterTimingPath,
    UnusedGenericClass,

    // Propagated from the expression and name resolution collaborators
    ExpressionNotConstant,
    DivideByZero,
    UnknownPackage,
    UnknownModule,
}

impl DiagCode {
    /// The severity associated with this code.
    pub fn severity(self) -> Severity {
        match self {
            DiagCode::NestedBlockComment
            | DiagCode::SignedLiteralTooLarge
            | DiagCode::MissingFractionalDigits
            | DiagCode::RealExponentTooLarge
            | DiagCode::ElabTaskWarning
            | DiagCode::DuplicateTimingPath
            | DiagCode::UnusedGenericClass => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// The message template for this code. Occurrences of `{}` are replaced
    /// by the diagnostic's arguments, in order, at render time.
    pub fn message(self) -> &'static str {
        match self {
            DiagCode::NonPrintableChar => "non-printable character in source text",
            DiagCode::Utf8Char => "UTF-8 sequence in source text",
            DiagCode::UnicodeBom => "unicode byte order mark in source text",
            DiagCode::EmbeddedNull => "embedded NUL in source text",
            DiagCode::EscapedWhitespace => "backslash is not followed by an escaped identifier",
            DiagCode::MisplacedDirectiveChar => "expected directive name after `",
            DiagCode::UnterminatedBlockComment => "block comment is not terminated",
            DiagCode::NestedBlockComment => "block comments cannot be nested",
            DiagCode::NewlineInStringLiteral => {
                "string literals cannot contain unescaped newlines"
            }
            DiagCode::UnterminatedStringLiteral => "string literal is not terminated",
            DiagCode::OctalEscapeCodeTooBig => "octal escape code does not fit in a byte",
            DiagCode::InvalidHexEscapeCode => "hex escape code requires at least one digit",
            DiagCode::UnknownEscapeCode => "unknown escape code `\\{}`",
            DiagCode::SignedLiteralTooLarge => {
                "literal does not fit in 32 bits; saturated to 2147483647"
            }
            DiagCode::MissingFractionalDigits => "expected digits after decimal point",
            DiagCode::MissingExponentDigits => "expected digits after exponent",
            DiagCode::RealExponentTooLarge => "real literal exceeds the range of a double",
            DiagCode::IntegerSizeZero => "size of vector literal cannot be zero",
            DiagCode::IntegerSizeTooLarge => "size of vector literal does not fit in 32 bits",
            DiagCode::MissingVectorBase => "expected base specifier after '",
            DiagCode::MissingVectorDigits => "expected digits after base specifier",
            DiagCode::InvalidUnsizedLiteral => "unsized literal must be '0, '1, 'x, or 'z",
            DiagCode::InfinitelyRecursiveHierarchy => {
                "instance `{}` creates an infinitely recursive hierarchy"
            }
            DiagCode::MaxInstanceDepthExceeded => {
                "{} hierarchy exceeds the maximum instance depth of {}"
            }
            DiagCode::ElabTaskError => "{}",
            DiagCode::ElabTaskWarning => "{}",
            DiagCode::DuplicateTimingPath => "duplicate timing path for terminal `{}`",
            DiagCode::PulseStyleAfterTimingPath => {
                "pulse style declared after a timing path for terminal `{}`"
            }
            DiagCode::UnusedGenericClass => "generic class `{}` is never specialized",
            DiagCode::ExpressionNotConstant => "expression is not constant",
            DiagCode::DivideByZero => "division by zero in constant expression",
            DiagCode::UnknownPackage => "unknown package `{}`",
            DiagCode::UnknownModule => "unknown module `{}`",
        }
    }
}

/// A typed diagnostic argument, formatted lazily at render time.
#[derive(Clone, Debug)]
pub enum DiagArg {
    Str(String),
    Name(Name),
    Int(i64),
}

impl fmt::Display for DiagArg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DiagArg::Str(s) => write!(f, "{}", s),
            DiagArg::Name(n) => write!(f, "{}", n),
            DiagArg::Int(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for DiagArg {
    fn from(s: &str) -> DiagArg {
        DiagArg::Str(s.to_string())
    }
}

impl From<String> for DiagArg {
    fn from(s: String) -> DiagArg {
        DiagArg::Str(s)
    }
}

impl From<Name> for DiagArg {
    fn from(n: Name) -> DiagArg {
        DiagArg::Name(n)
    }
}

impl From<i64> for DiagArg {
    fn from(i: i64) -> DiagArg {
        DiagArg::Int(i)
    }
}

impl From<usize> for DiagArg {
    fn from(i: usize) -> DiagArg {
        DiagArg::Int(i as i64)
    }
}

/// A single reported diagnostic.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub code: DiagCode,
    pub location: Location,
    pub args: Vec<DiagArg>,
}

impl Diagnostic {
    pub fn new(code: DiagCode, location: Location) -> Diagnostic {
        Diagnostic {
            code,
            location,
            args: Vec::new(),
        }
    }

    /// Attach an argument to the diagnostic.
    pub fn arg<A: Into<DiagArg>>(mut self, arg: A) -> Diagnostic {
        self.args.push(arg.into());
        self
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: ", self.severity())?;
        let mut args = self.args.iter();
        let mut rest = self.code.message();
        while let Some(idx) = rest.find("{}") {
            write!(f, "{}", &rest[..idx])?;
            match args.next() {
                Some(arg) => write!(f, "{}", arg)?,
                None => write!(f, "{{}}")?,
            }
            rest = &rest[idx + 2..];
        }
        write!(f, "{}", rest)
    }
}

/// An append-only, insertion-ordered collection of diagnostics.
#[derive(Default)]
pub struct Diagnostics {
    diags: Vec<Diagnostic>,
    num_errors: usize,
}

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Default::default()
    }

    /// Append a diagnostic to the sink.
    pub fn add(&mut self, diag: Diagnostic) {
        if diag.severity() >= Severity::Error {
            self.num_errors += 1;
        }
        trace!("diag: {}", diag);
        self.diags.push(diag);
    }

    /// The number of diagnostics reported so far.
    pub fn len(&self) -> usize {
        self.diags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diags.is_empty()
    }

    /// The number of error-severity diagnostics reported so far.
    pub fn num_errors(&self) -> usize {
        self.num_errors
    }

    /// The most recently reported diagnostic.
    pub fn last(&self) -> Option<&Diagnostic> {
        self.diags.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diags.iter()
    }

    /// Count the diagnostics reported with the given code.
    pub fn count_of(&self, code: DiagCode) -> usize {
        self.diags.iter().filter(|d| d.code == code).count()
    }

    pub fn clear(&mut self) {
        self.diags.clear();
        self.num_errors = 0;
    }
}
