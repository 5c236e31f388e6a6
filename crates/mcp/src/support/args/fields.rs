#![forbid(unsafe_code)]

use super::super::ai::ai_error;
use super::strings::{optional_nullable_string, optional_string};
use pb_core::model::{IssueDate, Priority, Role, StateGroup};
use serde_json::Value;

/// `null` and a missing key both mean "not given".
pub(crate) fn optional_bool(
    args: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<Option<bool>, Value> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(flag)) => Ok(Some(*flag)),
        Some(_) => Err(ai_error("INVALID_INPUT", &format!("{key} must be true or false"))),
    }
}

pub(crate) fn bool_or(
    args: &serde_json::Map<String, Value>,
    key: &str,
    default: bool,
) -> Result<bool, Value> {
    Ok(optional_bool(args, key)?.unwrap_or(default))
}

pub(crate) fn optional_priority(
    args: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<Option<Priority>, Value> {
    optional_string(args, key)?
        .map(|raw| {
            Priority::parse(raw.trim()).ok_or_else(|| {
                ai_error(
                    "INVALID_INPUT",
                    &format!("{key} must be one of urgent, high, medium, low"),
                )
            })
        })
        .transpose()
}

pub(crate) fn optional_state_group(
    args: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<Option<StateGroup>, Value> {
    optional_string(args, key)?
        .map(|raw| {
            StateGroup::parse(raw.trim()).ok_or_else(|| {
                ai_error(
                    "INVALID_INPUT",
                    &format!("{key} must be one of backlog, unstarted, started, completed, cancelled"),
                )
            })
        })
        .transpose()
}

pub(crate) fn optional_role(
    args: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<Option<Role>, Value> {
    optional_string(args, key)?
        .map(|raw| {
            Role::parse(raw.trim()).ok_or_else(|| {
                ai_error(
                    "INVALID_INPUT",
                    &format!("{key} must be one of owner, admin, member, guest"),
                )
            })
        })
        .transpose()
}

/// Dates are `YYYY-MM-DD`; an empty string counts as null.
pub(crate) fn optional_nullable_date(
    args: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<Option<Option<IssueDate>>, Value> {
    match optional_nullable_string(args, key)? {
        None => Ok(None),
        Some(None) => Ok(Some(None)),
        Some(Some(raw)) if raw.trim().is_empty() => Ok(Some(None)),
        Some(Some(raw)) => IssueDate::parse(&raw)
            .map(|date| Some(Some(date)))
            .map_err(|err| ai_error("INVALID_INPUT", &format!("{key}: {err}"))),
    }
}
