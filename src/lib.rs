#![deny(clippy::all, clippy::perf, clippy::correctness)]

#[macro_use]
extern crate log;

pub use crate::builder::*;
pub use crate::constants::*;
pub use crate::engine::*;
pub use crate::error::*;
pub use crate::kv_store::*;
pub use crate::metadata::*;
pub use crate::post::*;
pub use crate::state::*;
pub use crate::verifier::*;

mod builder;
mod constants;
mod engine;
mod error;
mod helpers;
mod kv_store;
mod metadata;
mod post;
mod sealer;
mod state;
mod verifier;

#[cfg(test)]
mod test_utils;
