// Wire model for the team-standings endpoint.
//
// Shapes mirror the JSON the scoring server returns. Every field the server
// may omit is optional here; display defaults are applied later by the
// projection engine, never at decode time. Decoding is lenient: an explicit
// null list is empty, numbers may arrive as numeric strings, and a value of
// the wrong type reads as absent instead of failing the whole payload.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One full server response describing current standings across all
/// categories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandingsPayload {
    #[serde(default, deserialize_with = "vec_or_default")]
    pub categories: Vec<Category>,
    #[serde(default, deserialize_with = "vec_or_default")]
    pub combined: Vec<TeamRow>,
}

impl StandingsPayload {
    /// Find a category by exact (case-sensitive) label.
    pub fn category(&self, label: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.label == label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default, deserialize_with = "string_or_default")]
    pub label: String,
    #[serde(default, deserialize_with = "vec_or_default")]
    pub teams: Vec<TeamRow>,
}

/// Team identifier. The server is not consistent about emitting numbers or
/// strings, so both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TeamId {
    Number(i64),
    Text(String),
}

impl Default for TeamId {
    fn default() -> Self {
        TeamId::Text(String::new())
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeamId::Number(n) => write!(f, "{n}"),
            TeamId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for TeamId {
    fn from(n: i64) -> Self {
        TeamId::Number(n)
    }
}

impl From<&str> for TeamId {
    fn from(s: &str) -> Self {
        TeamId::Text(s.to_string())
    }
}

/// A team entry. Category views populate `total_points` and `riders`; the
/// combined view populates `league_points` and `raw_points`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamRow {
    #[serde(default)]
    pub team_id: TeamId,
    #[serde(default, deserialize_with = "string_or_none")]
    pub team_name: Option<String>,
    #[serde(default, deserialize_with = "rank_or_none")]
    pub rank: Option<u32>,
    #[serde(default, deserialize_with = "float_or_none")]
    pub total_points: Option<f64>,
    #[serde(default, deserialize_with = "float_or_none")]
    pub league_points: Option<f64>,
    #[serde(default, deserialize_with = "float_or_none")]
    pub raw_points: Option<f64>,
    #[serde(default)]
    pub riders: Option<Vec<RiderRow>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiderRow {
    #[serde(default, deserialize_with = "string_or_none")]
    pub rider_name: Option<String>,
    #[serde(default, deserialize_with = "float_or_none")]
    pub points: Option<f64>,
}

// ---------------------------------------------------------------------------
// Lenient field decoders
// ---------------------------------------------------------------------------

fn vec_or_default<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let value = Option::<Vec<T>>::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

fn string_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(string_or_none(deserializer)?.unwrap_or_default())
}

fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// A JSON number or a numeric string; anything else is absent.
fn float_or_none<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number_from(&value))
}

/// A positive whole number, in any JSON spelling. Zero, negative and
/// fractional ranks are absent so the row falls back to its position.
fn rank_or_none<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number_from(&value)
        .filter(|r| *r >= 1.0 && r.fract() == 0.0 && *r <= f64::from(u32::MAX))
        .map(|r| r as u32))
}

fn number_from(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_full_payload() {
        let json = r#"{
            "categories": [
                {
                    "label": "A",
                    "teams": [
                        {
                            "team_id": 7,
                            "team_name": "Dirty Mittens",
                            "rank": 1,
                            "total_points": 88.4,
                            "riders": [
                                { "rider_name": "Sam", "points": 40.2 },
                                { "rider_name": "Alex", "points": 48.2 }
                            ]
                        }
                    ]
                }
            ],
            "combined": [
                { "team_id": "7", "team_name": "Dirty Mittens", "league_points": 12.5, "raw_points": 301.7 }
            ]
        }"#;

        let payload: StandingsPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.categories.len(), 1);
        let team = &payload.categories[0].teams[0];
        assert_eq!(team.team_id, TeamId::Number(7));
        assert_eq!(team.rank, Some(1));
        assert_eq!(team.riders.as_ref().map(Vec::len), Some(2));
        assert_eq!(payload.combined[0].team_id, TeamId::Text("7".into()));
        assert_eq!(payload.combined[0].league_points, Some(12.5));
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let payload: StandingsPayload = serde_json::from_str("{}").unwrap();
        assert!(payload.categories.is_empty());
        assert!(payload.combined.is_empty());
    }

    #[test]
    fn null_numbers_decode_as_absent() {
        let json = r#"{ "combined": [ { "team_id": 1, "team_name": null, "raw_points": null } ] }"#;
        let payload: StandingsPayload = serde_json::from_str(json).unwrap();
        let row = &payload.combined[0];
        assert!(row.team_name.is_none());
        assert!(row.raw_points.is_none());
        assert!(row.league_points.is_none());
    }

    #[test]
    fn null_lists_decode_as_empty() {
        let json = r#"{ "combined": null, "categories": [ { "label": "A", "teams": null } ] }"#;
        let payload: StandingsPayload = serde_json::from_str(json).unwrap();
        assert!(payload.combined.is_empty());
        assert_eq!(payload.categories[0].label, "A");
        assert!(payload.categories[0].teams.is_empty());
    }

    #[test]
    fn numeric_strings_decode_as_numbers() {
        let json = r#"{
            "combined": [ { "team_id": 1, "league_points": "7.5", "raw_points": " 12.6 " } ],
            "categories": [ {
                "label": "A",
                "teams": [ {
                    "team_id": 2,
                    "total_points": "41",
                    "riders": [ { "rider_name": "Sam", "points": "20.2" } ]
                } ]
            } ]
        }"#;
        let payload: StandingsPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.combined[0].league_points, Some(7.5));
        assert_eq!(payload.combined[0].raw_points, Some(12.6));
        let team = &payload.categories[0].teams[0];
        assert_eq!(team.total_points, Some(41.0));
        assert_eq!(team.riders.as_ref().unwrap()[0].points, Some(20.2));
    }

    #[test]
    fn unusable_numbers_decode_as_absent() {
        let json = r#"{ "combined": [ { "team_id": 1, "raw_points": "n/a", "league_points": true } ] }"#;
        let payload: StandingsPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.combined[0].raw_points, None);
        assert_eq!(payload.combined[0].league_points, None);
    }

    #[test]
    fn rank_accepts_any_whole_number_spelling() {
        let rank = |raw: &str| {
            let json = format!(r#"{{ "combined": [ {{ "team_id": 1, "rank": {raw} }} ] }}"#);
            serde_json::from_str::<StandingsPayload>(&json).unwrap().combined[0].rank
        };
        assert_eq!(rank("3"), Some(3));
        assert_eq!(rank(r#""1""#), Some(1));
        assert_eq!(rank("1.0"), Some(1));
        assert_eq!(rank("0"), None);
        assert_eq!(rank("-2"), None);
        assert_eq!(rank("2.5"), None);
        assert_eq!(rank(r#""first""#), None);
        assert_eq!(rank("null"), None);
    }

    #[test]
    fn numeric_names_decode_as_text() {
        let json = r#"{ "combined": [ { "team_id": 1, "team_name": 404 } ] }"#;
        let payload: StandingsPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.combined[0].team_name.as_deref(), Some("404"));
    }

    #[test]
    fn category_lookup_is_case_sensitive() {
        let payload = StandingsPayload {
            categories: vec![Category {
                label: "Cat1".into(),
                teams: vec![],
            }],
            combined: vec![],
        };
        assert!(payload.category("Cat1").is_some());
        assert!(payload.category("cat1").is_none());
        assert!(payload.category("Cat").is_none());
    }

    #[test]
    fn team_id_display() {
        assert_eq!(TeamId::Number(42).to_string(), "42");
        assert_eq!(TeamId::from("abc").to_string(), "abc");
    }
}
