#![forbid(unsafe_code)]

mod fields;
mod ids;
mod numbers;
mod strings;

pub(crate) use fields::*;
pub(crate) use ids::*;
pub(crate) use numbers::*;
pub(crate) use strings::*;
