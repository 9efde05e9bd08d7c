//! Record Model
//!
//! Collections, per-collection record fields, and full-collection snapshots.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// == Collection ==
/// One of the two fixed record categories.
///
/// The tag doubles as the durable-store key prefix and the distributed cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Quiz,
    Goal,
}

impl Collection {
    /// Every collection, in slot order.
    pub const ALL: [Collection; 2] = [Collection::Quiz, Collection::Goal];

    /// Stable string tag used in storage keys.
    pub fn tag(self) -> &'static str {
        match self {
            Collection::Quiz => "quiz",
            Collection::Goal => "goal",
        }
    }

    /// Slot index into per-collection arrays.
    pub fn index(self) -> usize {
        match self {
            Collection::Quiz => 0,
            Collection::Goal => 1,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// == Record Fields ==
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizFields {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalFields {
    pub name: String,
    pub institution: String,
    pub location: String,
}

/// Collection-specific payload of a record. The email lives in the key.
///
/// Untagged so a listing entry reads `{email, name, ...}`; `Goal` is tried
/// first because a goal object also satisfies the quiz shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordFields {
    Goal(GoalFields),
    Quiz(QuizFields),
}

impl RecordFields {
    pub fn quiz(name: impl Into<String>) -> Self {
        RecordFields::Quiz(QuizFields { name: name.into() })
    }

    pub fn goal(
        name: impl Into<String>,
        institution: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        RecordFields::Goal(GoalFields {
            name: name.into(),
            institution: institution.into(),
            location: location.into(),
        })
    }

    /// The collection this payload shape belongs to.
    pub fn collection(&self) -> Collection {
        match self {
            RecordFields::Quiz(_) => Collection::Quiz,
            RecordFields::Goal(_) => Collection::Goal,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            RecordFields::Quiz(q) => &q.name,
            RecordFields::Goal(g) => &g.name,
        }
    }

    // == Durable Payload ==
    /// Value persisted in the durable store: a bare string for quiz,
    /// an object for goal.
    pub fn to_payload(&self) -> Value {
        match self {
            RecordFields::Quiz(q) => Value::String(q.name.clone()),
            RecordFields::Goal(g) => json!({
                "name": g.name,
                "institution": g.institution,
                "location": g.location,
            }),
        }
    }

    /// Decodes a persisted payload for the given collection.
    pub fn from_payload(collection: Collection, payload: Value) -> serde_json::Result<Self> {
        match collection {
            Collection::Quiz => {
                serde_json::from_value::<String>(payload).map(|name| RecordFields::quiz(name))
            }
            Collection::Goal => serde_json::from_value::<GoalFields>(payload).map(RecordFields::Goal),
        }
    }
}

// == Record ==
/// A record materialized into a listing, with its email reattached from the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub email: String,
    #[serde(flatten)]
    pub fields: RecordFields,
}

impl Record {
    pub fn new(email: impl Into<String>, fields: RecordFields) -> Self {
        Self {
            email: email.into(),
            fields,
        }
    }
}

// == Snapshot ==
/// Complete, ordered enumeration of one collection at some instant.
///
/// Never mutated after construction; writes replace it by invalidation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    records: Vec<Record>,
}

impl Snapshot {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains_email(&self, email: &str) -> bool {
        self.records.iter().any(|r| r.email == email)
    }

    /// True when every record has the payload shape of `collection`.
    pub fn is_shaped_for(&self, collection: Collection) -> bool {
        self.records
            .iter()
            .all(|r| r.fields.collection() == collection)
    }
}
