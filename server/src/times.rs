use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Creation and modification times for a database row.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Times {
    /// The date and time it was created.
    #[serde(with = "timestamp")]
    pub(crate) created_at: OffsetDateTime,

    /// The date and time it was last modified.
    #[serde(with = "timestamp")]
    pub(crate) updated_at: OffsetDateTime,
}

/// (De)serializes an `OffsetDateTime` as Unix seconds.
pub mod timestamp {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::OffsetDateTime;

    pub fn serialize<S>(time: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer {
        serializer.serialize_i64(time.unix_timestamp())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
    where D: Deserializer<'de> {
        let seconds = i64::deserialize(deserializer)?;
        Ok(OffsetDateTime::from_unix_timestamp(seconds))
    }
}

/// (De)serializes a `Date` in `YYYY-MM-DD` form.
pub mod date {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;

    pub const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S>(date: &Date, serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer {
        serializer.serialize_str(&date.format(FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Date, D::Error>
    where D: Deserializer<'de> {
        let raw = String::deserialize(deserializer)?;
        Date::parse(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use time::{Date, OffsetDateTime};

    #[derive(Debug, Deserialize, PartialEq, Serialize)]
    struct Stamped {
        #[serde(with = "super::timestamp")]
        at: OffsetDateTime,
    }

    #[derive(Debug, Deserialize, PartialEq, Serialize)]
    struct Dated {
        #[serde(with = "super::date")]
        on: Date,
    }

    #[test]
    fn timestamps_serialize_as_unix_seconds() {
        let stamped = Stamped {
            at: OffsetDateTime::from_unix_timestamp(1_736_467_200),
        };

        let serialized = serde_json::to_string(&stamped).expect("serialize timestamp");
        assert_eq!(serialized, r#"{"at":1736467200}"#);

        let deserialized: Stamped = serde_json::from_str(&serialized).expect("deserialize timestamp");
        assert_eq!(deserialized, stamped);
    }

    #[test]
    fn dates_serialize_as_iso_strings() {
        let dated = Dated {
            on: Date::try_from_ymd(2025, 1, 10).expect("construct date"),
        };

        let serialized = serde_json::to_string(&dated).expect("serialize date");
        assert_eq!(serialized, r#"{"on":"2025-01-10"}"#);

        let deserialized: Dated = serde_json::from_str(&serialized).expect("deserialize date");
        assert_eq!(deserialized, dated);
    }

    #[test]
    fn malformed_dates_fail_to_deserialize() {
        assert!(serde_json::from_str::<Dated>(r#"{"on":"10/01/2025"}"#).is_err());
    }
}
