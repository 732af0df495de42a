// Copyright (c) 2016-2021 Fabian Schuiki

//! This crate contains the fundamental utilities used by the rest of the
//! shannon compiler.

pub mod name;
pub mod source;
