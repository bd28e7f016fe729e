/// List-query validation
///
/// List endpoints take their query parameters as raw strings and validate
/// them here, so a bad `limit` or an unknown `sort` token becomes a
/// `validation_error` in the standard envelope instead of being silently
/// ignored or bounced by the extractor.

use crate::error::{ApiError, ApiResult};

pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 500;

/// Parses `limit`: positive integer up to [`MAX_LIMIT`].
pub fn parse_limit(raw: Option<&str>) -> ApiResult<i64> {
    match raw {
        None => Ok(DEFAULT_LIMIT),
        Some(s) => match s.parse::<i64>() {
            Ok(n) if (1..=MAX_LIMIT).contains(&n) => Ok(n),
            _ => Err(ApiError::validation(
                "limit",
                format!("must be a positive integer between 1 and {MAX_LIMIT}"),
            )),
        },
    }
}

/// Parses `offset`: non-negative integer.
pub fn parse_offset(raw: Option<&str>) -> ApiResult<i64> {
    match raw {
        None => Ok(0),
        Some(s) => match s.parse::<i64>() {
            Ok(n) if n >= 0 => Ok(n),
            _ => Err(ApiError::validation("offset", "must be a non-negative integer")),
        },
    }
}

/// Parses an enumerated query token via the resource's allow-list parser.
///
/// `allowed` is only used for the error message; the parser itself is the
/// authority.
pub fn parse_enum<T>(
    field: &str,
    raw: Option<&str>,
    parse: impl Fn(&str) -> Option<T>,
    allowed: &[&str],
) -> ApiResult<T>
where
    T: Default,
{
    match raw {
        None => Ok(T::default()),
        Some(s) => parse(s).ok_or_else(|| {
            ApiError::validation(field, format!("must be one of: {}", allowed.join(", ")))
        }),
    }
}

/// Splits a comma-separated `ids` parameter; empty input is a validation
/// error.
pub fn parse_ids(raw: &str) -> ApiResult<Vec<String>> {
    let ids: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if ids.is_empty() {
        return Err(ApiError::validation("ids", "must contain at least one id"));
    }

    Ok(ids)
}
