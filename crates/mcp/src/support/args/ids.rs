#![forbid(unsafe_code)]

use super::super::ai::ai_error;
use super::strings::{optional_nullable_string, optional_string, require_string};
use pb_core::ids::IdParseError;
use serde_json::Value;
use std::str::FromStr;

fn parse_id<T>(raw: &str) -> Result<T, Value>
where
    T: FromStr<Err = IdParseError>,
{
    raw.parse::<T>()
        .map_err(|err| ai_error("INVALID_INPUT", &err.to_string()))
}

pub(crate) fn require_id<T>(args: &serde_json::Map<String, Value>, key: &str) -> Result<T, Value>
where
    T: FromStr<Err = IdParseError>,
{
    parse_id(&require_string(args, key)?)
}

pub(crate) fn optional_id<T>(
    args: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<Option<T>, Value>
where
    T: FromStr<Err = IdParseError>,
{
    optional_string(args, key)?
        .map(|raw| parse_id(&raw))
        .transpose()
}

pub(crate) fn optional_nullable_id<T>(
    args: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<Option<Option<T>>, Value>
where
    T: FromStr<Err = IdParseError>,
{
    match optional_nullable_string(args, key)? {
        None => Ok(None),
        Some(None) => Ok(Some(None)),
        Some(Some(raw)) => parse_id(&raw).map(|id| Some(Some(id))),
    }
}
