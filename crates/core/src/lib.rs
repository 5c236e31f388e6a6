#![forbid(unsafe_code)]

pub mod board;
pub mod ids;
pub mod model;
pub mod naming;
pub mod ordering;
pub mod rich_text;
