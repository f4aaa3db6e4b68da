//! Serde adapters for transport-specific value encodings

/// `DateTime<Utc>` as `{"seconds": i64, "nanos": i64}` since the Unix epoch.
pub mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Proxy {
        seconds: i64,
        nanos: i64,
    }

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        Proxy {
            seconds: value.timestamp(),
            nanos: i64::from(value.timestamp_subsec_nanos()),
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let proxy = Proxy::deserialize(deserializer)?;
        let nanos = u32::try_from(proxy.nanos).map_err(D::Error::custom)?;
        DateTime::from_timestamp(proxy.seconds, nanos)
            .ok_or_else(|| D::Error::custom("timestamp out of range"))
    }
}

/// `Option<Duration>` as fractional seconds with an `s` suffix, e.g. `"1.5s"`.
pub mod latency {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn format(value: &Duration) -> String {
        format!("{}s", value.as_secs_f64())
    }

    pub fn parse(text: &str) -> Option<Duration> {
        let seconds: f64 = text.strip_suffix('s')?.parse().ok()?;
        Duration::try_from_secs_f64(seconds).ok()
    }

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_str(&format(duration)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(text) => parse(&text)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid latency {:?}", text))),
            None => Ok(None),
        }
    }
}
