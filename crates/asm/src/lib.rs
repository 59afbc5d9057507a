//! A line oriented text form of the front-end IR.

#![forbid(unsafe_code)]
#![allow(clippy::cast_possible_truncation, clippy::match_bool)]
#![warn(clippy::must_use_candidate)]

mod parse;

pub use parse::{ParseOutput, parse};
