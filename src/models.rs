use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::SyncError;

/// Wire format for review dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A named sub-rating attached to a review
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CriterionRating {
    pub criteria: String,
    /// Absent and null ratings are both kept as null
    #[serde(default)]
    pub rating: Value,
}

/// A review as returned by the remote service.
///
/// `id` is any JSON scalar and is stored as received.
#[derive(Debug, Clone, PartialEq)]
pub struct RawReview {
    pub id: Value,
    pub date: String,
    pub score: Value,
    pub score_text: Value,
    pub title: Value,
    pub text: Value,
    pub criteria: Vec<CriterionRating>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireReview {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    date: Value,
    #[serde(default)]
    score: Value,
    #[serde(default)]
    score_text: Value,
    #[serde(default)]
    title: Value,
    #[serde(default)]
    text: Value,
    #[serde(default, rename = "criterias", deserialize_with = "nullable_vec")]
    criteria: Vec<CriterionRating>,
}

impl RawReview {
    /// Convert one untyped record from a review page.
    ///
    /// A missing or non-scalar `id`, or a missing or non-string `date`, is an error.
    pub fn from_value(value: Value) -> Result<Self, SyncError> {
        let wire: WireReview = serde_json::from_value(value)?;

        if scalar_string(&wire.id).is_none() {
            return Err(match wire.id {
                Value::Null => SyncError::MissingField { field: "id" },
                other => SyncError::UnexpectedType {
                    field: "id",
                    value: other.to_string(),
                },
            });
        }

        let date = match wire.date {
            Value::String(date) => date,
            Value::Null => return Err(SyncError::MissingField { field: "date" }),
            other => {
                return Err(SyncError::UnexpectedType {
                    field: "date",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            id: wire.id,
            date,
            score: wire.score,
            score_text: wire.score_text,
            title: wire.title,
            text: wire.text,
            criteria: wire.criteria,
        })
    }

    /// Identifier as a string; numeric ids are rendered in their JSON form
    pub fn id_string(&self) -> String {
        scalar_string(&self.id).unwrap_or_default()
    }

    pub fn parsed_date(&self) -> Result<NaiveDate, SyncError> {
        parse_date(&self.id_string(), &self.date)
    }
}

/// One page of untyped review records plus the token for the next one
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewPage {
    pub reviews: Vec<Value>,
    pub next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReviewsEnvelope {
    #[serde(default)]
    results: Option<ReviewResults>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewResults {
    #[serde(default, deserialize_with = "nullable_vec")]
    data: Vec<Value>,
    #[serde(default)]
    next_pagination_token: Option<String>,
}

impl ReviewPage {
    /// Parse the `{ results: { data, nextPaginationToken } }` response body.
    ///
    /// Records are left untyped; they are converted one at a time during sync.
    pub fn from_response(body: Value) -> Result<Self, serde_json::Error> {
        let envelope: ReviewsEnvelope = serde_json::from_value(body)?;
        let results = envelope.results.unwrap_or_default();

        Ok(Self {
            reviews: results.data,
            next_token: results.next_pagination_token.filter(|t| !t.is_empty()),
        })
    }
}

/// The persisted review record: fixed fields followed by one key per criterion.
///
/// Two records are equal when their key/value sets are equal, regardless of
/// key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlatReview(Map<String, Value>);

impl FlatReview {
    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Identifier as a string; numeric ids are rendered in their JSON form
    pub fn id(&self) -> Option<String> {
        scalar_string(self.0.get("id")?)
    }

    pub fn date(&self) -> Option<&str> {
        self.0.get("date").and_then(Value::as_str)
    }

    /// Order-independent encoding of the full key/value set
    pub fn canonical_key(&self) -> String {
        canonicalize(&Value::Object(self.0.clone())).to_string()
    }
}

/// Copy the fixed fields, then add one key per criterion (last occurrence wins)
pub fn flatten(review: &RawReview) -> FlatReview {
    let mut fields = Map::new();
    fields.insert("id".to_string(), review.id.clone());
    fields.insert("date".to_string(), Value::String(review.date.clone()));
    fields.insert("score".to_string(), review.score.clone());
    fields.insert("scoreText".to_string(), review.score_text.clone());
    fields.insert("title".to_string(), review.title.clone());
    fields.insert("text".to_string(), review.text.clone());

    for criterion in &review.criteria {
        fields.insert(criterion.criteria.clone(), criterion.rating.clone());
    }

    FlatReview(fields)
}

pub fn parse_date(id: &str, value: &str) -> Result<NaiveDate, SyncError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|source| SyncError::InvalidDate {
        id: id.to_string(),
        value: value.to_string(),
        source,
    })
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(_) | Value::Bool(_) => Some(value.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

fn nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
