//! Column decoding helpers shared by the repositories.

use seatswap_core::StoreError;

/// Get a required column value from a row, returning `CorruptRow` on failure.
pub fn get<T: rusqlite::types::FromSql>(
    row: &rusqlite::Row<'_>,
    idx: usize,
    table: &'static str,
    column: &'static str,
) -> Result<T, StoreError> {
    row.get(idx).map_err(|e| StoreError::CorruptRow {
        table,
        column,
        detail: e.to_string(),
    })
}

/// Parse a string into an enum, returning `CorruptRow` on failure.
pub fn parse_enum<T: std::str::FromStr>(
    raw: &str,
    table: &'static str,
    column: &'static str,
) -> Result<T, StoreError> {
    raw.parse().map_err(|_| StoreError::CorruptRow {
        table,
        column,
        detail: format!("unknown variant: {raw}"),
    })
}

/// Deserialize a JSON column, returning `CorruptRow` on failure.
pub fn parse_json<T: serde::de::DeserializeOwned>(
    raw: &str,
    table: &'static str,
    column: &'static str,
) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::CorruptRow {
        table,
        column,
        detail: format!("invalid JSON: {e}"),
    })
}

/// Parse an RFC 3339 timestamp column.
pub fn parse_timestamp(
    raw: &str,
    table: &'static str,
    column: &'static str,
) -> Result<chrono::DateTime<chrono::Utc>, StoreError> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&chrono::Utc))
        .map_err(|e| StoreError::CorruptRow {
            table,
            column,
            detail: format!("invalid timestamp {raw}: {e}"),
        })
}

/// Convert a seat or slot index to its column value.
pub fn index_to_sql(index: usize) -> i64 {
    i64::try_from(index).unwrap_or(i64::MAX)
}

/// Convert a stored index back, rejecting negatives.
pub fn index_from_sql(
    raw: i64,
    table: &'static str,
    column: &'static str,
) -> Result<usize, StoreError> {
    usize::try_from(raw).map_err(|_| StoreError::CorruptRow {
        table,
        column,
        detail: format!("negative index: {raw}"),
    })
}

#[cfg(test)]
mod tests {
    use seatswap_core::SessionStatus;

    use super::*;

    #[test]
    fn parse_enum_success() {
        let result: Result<SessionStatus, _> = parse_enum("running", "sessions", "status");
        assert_eq!(result.unwrap(), SessionStatus::Running);
    }

    #[test]
    fn parse_enum_failure() {
        let result: Result<SessionStatus, _> = parse_enum("INVALID", "sessions", "status");
        assert!(matches!(
            result,
            Err(StoreError::CorruptRow { table: "sessions", column: "status", .. })
        ));
    }

    #[test]
    fn parse_json_failure() {
        let result: Result<serde_json::Value, _> = parse_json("not valid json", "sessions", "state");
        assert!(matches!(
            result,
            Err(StoreError::CorruptRow { table: "sessions", column: "state", .. })
        ));
    }

    #[test]
    fn parse_timestamp_roundtrip() {
        let now = chrono::Utc::now();
        let parsed = parse_timestamp(&now.to_rfc3339(), "scheduled_jobs", "due_at").unwrap();
        assert_eq!(parsed, now);
        assert!(parse_timestamp("yesterday", "scheduled_jobs", "due_at").is_err());
    }

    #[test]
    fn negative_index_is_corrupt() {
        assert_eq!(index_from_sql(3, "session_members", "player_index").unwrap(), 3);
        assert!(index_from_sql(-1, "session_members", "player_index").is_err());
    }
}
