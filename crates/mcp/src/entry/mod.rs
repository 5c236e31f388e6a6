#![forbid(unsafe_code)]

mod framing;
mod stdio;

pub(crate) use stdio::{run_stdio, serve};
