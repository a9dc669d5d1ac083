use time::{
    Date, OffsetDateTime, PrimitiveDateTime, UtcOffset, format_description::BorrowedFormatItem,
    macros::format_description,
};

/// The `If-Modified-Since` filter format, `YYYY-MM-DDTHH:MM:SS`.
const MODIFIED_SINCE: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

// Parses the timestamp forms callers hand in for "modified since" filters:
// Xero's .NET `/Date(ms)/`, RFC3339, and ISO dates with a space or `T`
// separator, with or without fractional seconds. Offsets are converted to UTC.
pub fn parse_timestamp(value: &str) -> Result<PrimitiveDateTime, String> {
    let value = value.trim();

    if value.starts_with("/Date(") && value.ends_with(")/") {
        let millis = value
            .trim_start_matches("/Date(")
            .trim_end_matches(")/")
            .split(['+', '-'])
            .next()
            .unwrap_or(value);
        if let Ok(millis) = millis.parse::<i64>() {
            let datetime = OffsetDateTime::from_unix_timestamp(millis / 1000)
                .map_err(|e| format!("Invalid timestamp: {e}"))?;
            return Ok(utc(datetime));
        }
    }

    let rfc3339 = time::format_description::well_known::Rfc3339;
    if let Ok(datetime) = OffsetDateTime::parse(value, &rfc3339) {
        return Ok(utc(datetime));
    }

    let normalized = value.replacen(' ', "T", 1);
    if normalized.contains('.') {
        let format =
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");
        if let Ok(datetime) = PrimitiveDateTime::parse(&normalized, &format) {
            return Ok(datetime);
        }
    }
    if let Ok(datetime) = PrimitiveDateTime::parse(&normalized, MODIFIED_SINCE) {
        return Ok(datetime);
    }
    let minutes = format_description!("[year]-[month]-[day]T[hour]:[minute]");
    if let Ok(datetime) = PrimitiveDateTime::parse(&normalized, &minutes) {
        return Ok(datetime);
    }

    Date::parse(value, &format_description!("[year]-[month]-[day]"))
        .map(Date::midnight)
        .map_err(|e| format!("Failed to parse timestamp '{value}': {e}"))
}

fn utc(datetime: OffsetDateTime) -> PrimitiveDateTime {
    let datetime = datetime.to_offset(UtcOffset::UTC);
    PrimitiveDateTime::new(datetime.date(), datetime.time())
}

/// Formats a timestamp as an `If-Modified-Since` filter value.
pub fn format_modified_since(datetime: PrimitiveDateTime) -> Result<String, String> {
    datetime
        .format(MODIFIED_SINCE)
        .map_err(|e| format!("Failed to format timestamp: {e}"))
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn space_separated_timestamp_is_reformatted() {
        let parsed = parse_timestamp("2024-01-15 10:00:00").unwrap();
        assert_eq!(format_modified_since(parsed).unwrap(), "2024-01-15T10:00:00");
    }

    #[test]
    fn accepts_common_forms() {
        assert_eq!(
            parse_timestamp("2024-01-15").unwrap(),
            datetime!(2024-01-15 0:00)
        );
        assert_eq!(
            parse_timestamp("2024-01-15T10:30").unwrap(),
            datetime!(2024-01-15 10:30)
        );
        assert_eq!(
            parse_timestamp("2024-01-15T12:00:00+02:00").unwrap(),
            datetime!(2024-01-15 10:00)
        );
        assert_eq!(
            parse_timestamp("/Date(1705312800000+0000)/").unwrap(),
            datetime!(2024-01-15 10:00)
        );
        assert_eq!(
            parse_timestamp("2025-03-03T06:17:25.8448470").unwrap().second(),
            25
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_timestamp("last tuesday").is_err());
    }
}
