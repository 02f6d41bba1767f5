//! Rewards API model: strict parsing of the point lookup payload and the
//! display helpers derived from it (rank glyph, remaining boost time).
//!
//! Wire shape of `GET /api/point/user/{address}`:
//!
//! ```json
//! { "result": true,
//!   "data": { "rank": 3,
//!             "point": { "xpPoint": 1500, "multiplier_permanent": 1,
//!                        "multiplier_temporary": 2, "endTimestamp": 1735689600 } } }
//! ```
//!
//! `rank` is `false` when the account has no rank; `point` is `null` when
//! the account has no points yet.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::{Number, Value};

pub const RANK_SAD: &str = "😞";
pub const RANK_TROPHY: &str = "🏆";
pub const RANK_NEUTRAL: &str = "🙂";

/// Parsed point data for one address.
#[derive(Clone, Debug, PartialEq)]
pub struct XpRecord {
    pub xp_point: Number,
    pub multiplier_permanent: Number,
    /// Zero when the API sent nothing usable.
    pub multiplier_temporary: Number,
    pub rank: Option<i64>,
    /// Unix seconds; only kept when positive.
    pub end_timestamp: Option<i64>,
}

impl XpRecord {
    pub fn has_temporary_boost(&self) -> bool {
        self.multiplier_temporary
            .as_f64()
            .map(|m| m > 0.0)
            .unwrap_or(false)
    }

    /// Time left on the temporary multiplier, if one is active and dated.
    /// Negative once the boost has lapsed.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        if !self.has_temporary_boost() {
            return None;
        }
        let end = DateTime::<Utc>::from_timestamp(self.end_timestamp?, 0)?;
        Some(end.signed_duration_since(now))
    }

    pub fn rank_emoticon(&self) -> &'static str {
        rank_emoticon(self.rank)
    }
}

/// Outcome of a rewards lookup.
#[derive(Clone, Debug, PartialEq)]
pub enum XpResult {
    Found(XpRecord),
    /// The call succeeded but the address has no point data.
    NotFound,
    QueryError(QueryError),
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("response is missing `{0}`")]
    MissingField(&'static str),
}

#[derive(Debug, Deserialize)]
struct PointEnvelope {
    data: Option<PointData>,
}

#[derive(Debug, Deserialize)]
struct PointData {
    #[serde(default)]
    rank: Value,
    #[serde(default)]
    point: Option<PointWire>,
}

#[derive(Debug, Deserialize)]
struct PointWire {
    #[serde(rename = "xpPoint", default)]
    xp_point: Value,
    #[serde(default)]
    multiplier_permanent: Value,
    #[serde(default)]
    multiplier_temporary: Value,
    #[serde(rename = "endTimestamp", default)]
    end_timestamp: Value,
}

/// Parse a response body into a typed lookup result.
pub fn parse_point_response(body: &str) -> XpResult {
    let envelope: PointEnvelope = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => return XpResult::QueryError(QueryError::Malformed(e.to_string())),
    };

    let Some(data) = envelope.data else {
        return XpResult::QueryError(QueryError::MissingField("data"));
    };
    let Some(point) = data.point else {
        return XpResult::NotFound;
    };

    let Some(xp_point) = as_number(&point.xp_point) else {
        return XpResult::QueryError(QueryError::MissingField("xpPoint"));
    };
    let Some(multiplier_permanent) = as_number(&point.multiplier_permanent) else {
        return XpResult::QueryError(QueryError::MissingField("multiplier_permanent"));
    };
    let multiplier_temporary = as_number(&point.multiplier_temporary).unwrap_or_else(|| 0.into());

    XpResult::Found(XpRecord {
        xp_point,
        multiplier_permanent,
        multiplier_temporary,
        rank: data.rank.as_i64(),
        end_timestamp: point.end_timestamp.as_i64().filter(|ts| *ts > 0),
    })
}

fn as_number(v: &Value) -> Option<Number> {
    match v {
        Value::Number(n) => Some(n.clone()),
        _ => None,
    }
}

/// 0 → sad, 1..=5 → trophy, everything else (including no rank) → neutral.
pub fn rank_emoticon(rank: Option<i64>) -> &'static str {
    match rank {
        Some(0) => RANK_SAD,
        Some(1..=5) => RANK_TROPHY,
        _ => RANK_NEUTRAL,
    }
}

/// Render a duration as `D days, H:MM:SS` (whole seconds, days omitted when zero).
pub fn format_remaining(d: Duration) -> String {
    let total = d.num_seconds();
    if total <= 0 {
        return "expired".to_string();
    }

    let days = total / 86_400;
    let hours = (total % 86_400) / 3600;
    let mins = (total % 3600) / 60;
    let secs = total % 60;
    let clock = format!("{hours}:{mins:02}:{secs:02}");

    match days {
        0 => clock,
        1 => format!("1 day, {clock}"),
        n => format!("{n} days, {clock}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found(body: &str) -> XpRecord {
        match parse_point_response(body) {
            XpResult::Found(r) => r,
            other => panic!("expected Found, got {other:?}"),
        }
    }

    #[test]
    fn parses_full_payload() {
        let r = found(
            r#"{"result":true,"data":{"rank":3,"point":{"account":"0xabc","xpPoint":1500,
               "referralPoint":0,"multiplier_permanent":1.5,"multiplier_temporary":2,
               "endTimestamp":1735689600}}}"#,
        );
        assert_eq!(r.xp_point.to_string(), "1500");
        assert_eq!(r.multiplier_permanent.to_string(), "1.5");
        assert_eq!(r.multiplier_temporary.to_string(), "2");
        assert_eq!(r.rank, Some(3));
        assert_eq!(r.end_timestamp, Some(1735689600));
        assert!(r.has_temporary_boost());
    }

    #[test]
    fn null_or_missing_point_is_not_found() {
        assert_eq!(
            parse_point_response(r#"{"result":true,"data":{"point":null,"rank":false}}"#),
            XpResult::NotFound
        );
        assert_eq!(
            parse_point_response(r#"{"data":{"rank":false}}"#),
            XpResult::NotFound
        );
    }

    #[test]
    fn missing_data_or_fields_are_query_errors() {
        assert_eq!(
            parse_point_response(r#"{"result":false,"messages":"Internal Server Error."}"#),
            XpResult::QueryError(QueryError::MissingField("data"))
        );
        assert_eq!(
            parse_point_response(r#"{"data":{"rank":1,"point":{"multiplier_permanent":1}}}"#),
            XpResult::QueryError(QueryError::MissingField("xpPoint"))
        );
        assert_eq!(
            parse_point_response(r#"{"data":{"rank":1,"point":{"xpPoint":"lots","multiplier_permanent":1}}}"#),
            XpResult::QueryError(QueryError::MissingField("xpPoint"))
        );
        assert_eq!(
            parse_point_response(r#"{"data":{"rank":1,"point":{"xpPoint":5}}}"#),
            XpResult::QueryError(QueryError::MissingField("multiplier_permanent"))
        );
        assert!(matches!(
            parse_point_response("<html>502 Bad Gateway</html>"),
            XpResult::QueryError(QueryError::Malformed(_))
        ));
    }

    #[test]
    fn false_rank_and_odd_temporary_multiplier_degrade_quietly() {
        let r = found(
            r#"{"data":{"rank":false,"point":{"xpPoint":0,"multiplier_permanent":1,
               "multiplier_temporary":"n/a","endTimestamp":1735689600}}}"#,
        );
        assert_eq!(r.rank, None);
        assert_eq!(r.rank_emoticon(), RANK_NEUTRAL);
        assert_eq!(r.multiplier_temporary.to_string(), "0");
        assert!(!r.has_temporary_boost());
        assert_eq!(r.remaining_at(Utc::now()), None);
    }

    #[test]
    fn rank_glyphs() {
        assert_eq!(rank_emoticon(Some(0)), RANK_SAD);
        assert_eq!(rank_emoticon(Some(1)), RANK_TROPHY);
        assert_eq!(rank_emoticon(Some(3)), RANK_TROPHY);
        assert_eq!(rank_emoticon(Some(5)), RANK_TROPHY);
        assert_eq!(rank_emoticon(Some(6)), RANK_NEUTRAL);
        assert_eq!(rank_emoticon(Some(12)), RANK_NEUTRAL);
        assert_eq!(rank_emoticon(Some(-1)), RANK_NEUTRAL);
        assert_eq!(rank_emoticon(None), RANK_NEUTRAL);
    }

    #[test]
    fn remaining_time_needs_positive_multiplier_and_timestamp() {
        let now = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        let mut r = XpRecord {
            xp_point: 10.into(),
            multiplier_permanent: 1.into(),
            multiplier_temporary: 0.into(),
            rank: Some(9),
            end_timestamp: Some(1_700_000_000 + 90_061),
        };
        assert_eq!(r.remaining_at(now), None);

        r.multiplier_temporary = 2.into();
        assert_eq!(r.remaining_at(now), Some(Duration::seconds(90_061)));

        r.end_timestamp = None;
        assert_eq!(r.remaining_at(now), None);
    }

    #[test]
    fn zero_end_timestamp_is_absent() {
        let r = found(
            r#"{"data":{"rank":2,"point":{"xpPoint":1,"multiplier_permanent":1,
               "multiplier_temporary":3,"endTimestamp":0}}}"#,
        );
        assert_eq!(r.end_timestamp, None);
    }

    #[test]
    fn formats_remaining_like_days_and_clock() {
        assert_eq!(format_remaining(Duration::seconds(59)), "0:00:59");
        assert_eq!(format_remaining(Duration::seconds(3 * 3600 + 4 * 60 + 5)), "3:04:05");
        assert_eq!(format_remaining(Duration::seconds(86_400 + 3661)), "1 day, 1:01:01");
        assert_eq!(
            format_remaining(Duration::seconds(2 * 86_400 + 23 * 3600 + 59 * 60 + 59)),
            "2 days, 23:59:59"
        );
        assert_eq!(format_remaining(Duration::milliseconds(1999)), "0:00:01");
        assert_eq!(format_remaining(Duration::seconds(-5)), "expired");
    }
}
