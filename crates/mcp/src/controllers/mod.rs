#![forbid(unsafe_code)]

pub(crate) mod board;
pub(crate) mod forms;
