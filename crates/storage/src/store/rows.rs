#![forbid(unsafe_code)]

//! Column decoders shared by the row mappers.

use pb_core::ids::IdParseError;
use pb_core::model::IssueDate;
use pb_core::rich_text::RichDoc;
use rusqlite::Row;
use rusqlite::types::Type;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
#[error("unexpected value {value:?}")]
struct UnexpectedValue {
    value: String,
}

fn conversion_failure(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

pub(super) fn id_at<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = IdParseError>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|err| conversion_failure(idx, err))
}

pub(super) fn opt_id_at<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr<Err = IdParseError>,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|value| value.parse().map_err(|err| conversion_failure(idx, err)))
        .transpose()
}

pub(super) fn enum_at<T>(
    row: &Row<'_>,
    idx: usize,
    parse: fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| conversion_failure(idx, UnexpectedValue { value: raw }))
}

pub(super) fn opt_date_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<IssueDate>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|value| IssueDate::parse(&value).map_err(|err| conversion_failure(idx, err)))
        .transpose()
}

pub(super) fn doc_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<RichDoc> {
    let raw: String = row.get(idx)?;
    RichDoc::from_json_str(&raw).map_err(|err| conversion_failure(idx, err))
}
