#![forbid(unsafe_code)]

mod ai;
mod args;
mod clock;
mod jsonrpc;

pub(crate) use ai::*;
pub(crate) use args::*;
pub(crate) use clock::*;
pub(crate) use jsonrpc::*;
