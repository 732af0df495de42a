// Copyright (c) 2016-2021 Fabian Schuiki

//! A SystemVerilog elaboration front-end.

// Re-export everything from the common crate.
pub extern crate shannon_common as common;
pub use crate::common::*;

// Pull in subcrates.
pub extern crate shannon_svlog as svlog;
