//! Column type detection and random value synthesis.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use rand::{Rng, distr::Alphanumeric};
use uuid::Builder;

const DEFAULT_STRING_MIN_LEN: usize = 10;
const DEFAULT_STRING_MAX_LEN: usize = 20;

const DATE_RANGE_START: NaiveDate = match NaiveDate::from_ymd_opt(2000, 1, 1) {
    Some(x) => x,
    None => NaiveDate::MIN,
};
/// Thirty years of seconds after [`DATE_RANGE_START`].
const DATE_RANGE_SECONDS: i64 = 30 * 365 * 24 * 60 * 60;

/// Kind of value a declared column type holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Integer,
    Float,
    Decimal,
    Boolean,
    Date,
    DateTime,
    Time,
    Uuid,
    Json,
    Text { max_len: Option<usize> },
}

impl ValueKind {
    /// Detects the kind of a declared column type such as `varchar(255)`,
    /// `BIGINT UNSIGNED` or `timestamp with time zone`.
    #[must_use]
    pub fn detect(data_type: &str) -> Self {
        let data_type = data_type.trim().to_ascii_lowercase();
        let base = data_type
            .split(|x: char| x == '(' || x.is_whitespace())
            .next()
            .unwrap_or_default();

        match base {
            "bool" | "boolean" | "bit" => Self::Boolean,
            "uuid" | "uniqueidentifier" => Self::Uuid,
            "json" | "jsonb" | "object" | "document" => Self::Json,
            "date" => Self::Date,
            "time" | "timetz" => Self::Time,
            "timestamp" | "timestamptz" | "datetime" | "datetime2" | "datetime64" => {
                Self::DateTime
            }
            "decimal" | "numeric" | "money" => Self::Decimal,
            "float" | "float4" | "float8" | "float32" | "float64" | "double" | "real" => {
                Self::Float
            }
            "point" | "interval" => Self::Text { max_len: None },
            x if x.contains("int") || x.contains("serial") => Self::Integer,
            _ => Self::Text {
                max_len: parse_max_len(&data_type),
            },
        }
    }

    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::Integer)
    }
}

/// Length limit of `char(n)`/`varchar(n)` style types.
fn parse_max_len(data_type: &str) -> Option<usize> {
    let start = data_type.find('(')?;
    let end = data_type[start..].find(')')? + start;

    data_type[start + 1..end]
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
        .filter(|x| *x > 0)
}

/// Random value of `kind`, rendered the way the client displays it.
pub fn random_value(rng: &mut impl Rng, kind: ValueKind) -> String {
    match kind {
        ValueKind::Integer => rng.random_range(1..10_000).to_string(),
        ValueKind::Float => format!("{:.2}", rng.random_range(0.0..1000.0)),
        ValueKind::Decimal => format!(
            "{}.{:02}",
            rng.random_range(0..100_000),
            rng.random_range(0..100)
        ),
        ValueKind::Boolean => rng.random::<bool>().to_string(),
        ValueKind::Date => random_datetime(rng).format("%Y-%m-%d").to_string(),
        ValueKind::DateTime => random_datetime(rng)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        ValueKind::Time => random_datetime(rng).format("%H:%M:%S").to_string(),
        ValueKind::Uuid => random_uuid(rng),
        ValueKind::Json => format!("{{\"value\":\"{}\"}}", random_text(rng, Some(12))),
        ValueKind::Text { max_len } => random_text(rng, max_len),
    }
}

fn random_datetime(rng: &mut impl Rng) -> NaiveDateTime {
    DATE_RANGE_START.and_time(NaiveTime::MIN)
        + TimeDelta::seconds(rng.random_range(0..DATE_RANGE_SECONDS))
}

/// Random version 4 UUID string.
pub fn random_uuid(rng: &mut impl Rng) -> String {
    Builder::from_random_bytes(rng.random()).into_uuid().to_string()
}

fn random_text(rng: &mut impl Rng, max_len: Option<usize>) -> String {
    let len = rng.random_range(DEFAULT_STRING_MIN_LEN..=DEFAULT_STRING_MAX_LEN);
    let len = max_len.map_or(len, |max| len.min(max));

    (0..len).map(|_| char::from(rng.sample(Alphanumeric))).collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rand::{SeedableRng as _, rngs::StdRng};

    use super::*;

    #[test_log::test]
    fn detects_common_types() {
        assert_eq!(ValueKind::detect("INTEGER"), ValueKind::Integer);
        assert_eq!(ValueKind::detect("bigint unsigned"), ValueKind::Integer);
        assert_eq!(ValueKind::detect("serial"), ValueKind::Integer);
        assert_eq!(ValueKind::detect("double precision"), ValueKind::Float);
        assert_eq!(ValueKind::detect("numeric(10,2)"), ValueKind::Decimal);
        assert_eq!(ValueKind::detect("boolean"), ValueKind::Boolean);
        assert_eq!(
            ValueKind::detect("timestamp with time zone"),
            ValueKind::DateTime
        );
        assert_eq!(ValueKind::detect("date"), ValueKind::Date);
        assert_eq!(ValueKind::detect("uuid"), ValueKind::Uuid);
        assert_eq!(ValueKind::detect("jsonb"), ValueKind::Json);
        assert_eq!(
            ValueKind::detect("varchar(8)"),
            ValueKind::Text { max_len: Some(8) }
        );
        assert_eq!(ValueKind::detect("text"), ValueKind::Text { max_len: None });
    }

    #[test_log::test]
    fn text_respects_declared_length() {
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..50 {
            let value = random_value(&mut rng, ValueKind::detect("char(3)"));
            assert!(value.len() <= 3, "{value} is longer than 3");
        }
    }

    #[test_log::test]
    fn temporal_values_parse_back() {
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..100 {
            let date = random_value(&mut rng, ValueKind::Date);
            let time = random_value(&mut rng, ValueKind::Time);
            let datetime = random_value(&mut rng, ValueKind::DateTime);

            assert!(NaiveDate::parse_from_str(&date, "%Y-%m-%d").is_ok(), "{date}");
            assert!(NaiveTime::parse_from_str(&time, "%H:%M:%S").is_ok(), "{time}");
            assert!(
                NaiveDateTime::parse_from_str(&datetime, "%Y-%m-%d %H:%M:%S").is_ok(),
                "{datetime}"
            );
        }
    }

    #[test_log::test]
    fn uuids_parse_as_version_4() {
        let mut rng = StdRng::seed_from_u64(2);

        for _ in 0..20 {
            let uuid = uuid::Uuid::parse_str(&random_uuid(&mut rng)).unwrap();
            assert_eq!(uuid.get_version_num(), 4);
        }
    }

    #[test_log::test]
    fn integers_parse() {
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..20 {
            assert!(random_value(&mut rng, ValueKind::Integer).parse::<i64>().is_ok());
        }
    }
}
