// Copyright (c) 2016-2021 Fabian Schuiki

//! This crate implements the SystemVerilog front-end core of the shannon
//! compiler: lexical analysis, constant evaluation, the semantic symbol
//! tree, and elaboration.

#[macro_use]
extern crate bitflags;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;

pub(crate) use shannon_common as common;

pub mod ast;
pub mod builtins;
pub mod compilation;
pub mod diag;
pub mod elab;
pub mod eval;
pub mod lexer;
pub mod symbols;
pub mod token;
pub mod value;

pub use crate::compilation::{Compilation, CompilationOptions, SymbolArena};
pub use crate::diag::{DiagCode, Diagnostic, Diagnostics, Severity};
pub use crate::elab::{BindVisitor, DefParamVisitor, DiagnosticVisitor};
pub use crate::lexer::Lexer;
pub use crate::token::{LanguageVersion, Token, TokenKind, TriviaKind};

/// Items commonly used within the crate.
mod crate_prelude {
    pub use crate::common::name::{get_name_table, Name};
    pub use crate::common::source::{
        get_source_manager, Location, Source, Span, INVALID_LOCATION, INVALID_SPAN,
    };
    pub use crate::diag::{DiagArg, DiagCode, Diagnostic, Diagnostics, Severity};
}
