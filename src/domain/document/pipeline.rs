//! Typed aggregation pipeline stages.
//!
//! Queries against the document store are built from these stage values instead of
//! string-keyed JSON. Each store backend compiles or evaluates them on its own; the
//! Mongo-style JSON rendering (`Pipeline::to_json`) exists for logs and inspection.
//!
//! A `$geoNear` stage may only open a pipeline, so it is accepted only by
//! [`Pipeline::near`] and never by the chaining builders.

use crate::domain::shared::geo::GeoPoint;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value, json};

/// Sort direction for a single key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    fn as_mongo(self) -> i32 {
        match self {
            Self::Asc => 1,
            Self::Desc => -1,
        }
    }
}

/// A constant a filter compares against.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Number(f64),
    Text(String),
    Date(DateTime<Utc>),
}

impl Scalar {
    /// Parses a raw query-string value: numbers stay numbers, anything else is text.
    pub fn parse_loose(raw: &str) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Self::Number(n),
            _ => Self::Text(raw.to_string()),
        }
    }

    /// The representation stored inside documents.
    pub fn to_document_value(&self) -> Value {
        match self {
            Self::Number(n) => json!(n),
            Self::Text(s) => json!(s),
            Self::Date(d) => json!(d.to_rfc3339_opts(SecondsFormat::Millis, true)),
        }
    }

    fn to_mongo(&self) -> Value {
        match self {
            Self::Date(d) => json!({ "$date": d.to_rfc3339_opts(SecondsFormat::Millis, true) }),
            other => other.to_document_value(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CmpOp {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "eq" => Some(Self::Eq),
            "gt" => Some(Self::Gt),
            "gte" => Some(Self::Gte),
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            _ => None,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }

    fn as_mongo(self) -> &'static str {
        match self {
            Self::Eq => "$eq",
            Self::Gt => "$gt",
            Self::Gte => "$gte",
            Self::Lt => "$lt",
            Self::Lte => "$lte",
        }
    }

    /// Whether `ordering` (document value compared to the constant) satisfies the operator.
    pub fn holds(self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            Self::Eq => ordering == Equal,
            Self::Gt => ordering == Greater,
            Self::Gte => ordering != Less,
            Self::Lt => ordering == Less,
            Self::Lte => ordering != Greater,
        }
    }
}

/// Document predicate used by `$match` stages and `find`.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    Compare {
        field: String,
        op: CmpOp,
        value: Scalar,
    },
    And(Vec<Filter>),
    /// `$geoWithin: { $centerSphere: [[lng, lat], radius] }`, radius in radians.
    GeoWithinSphere {
        field: String,
        center: GeoPoint,
        radius: f64,
    },
}

impl Filter {
    pub fn compare(field: impl Into<String>, op: CmpOp, value: Scalar) -> Self {
        Self::Compare {
            field: field.into(),
            op,
            value,
        }
    }

    pub fn gte(field: impl Into<String>, value: Scalar) -> Self {
        Self::compare(field, CmpOp::Gte, value)
    }

    /// Inclusive range on one field.
    pub fn between(field: impl Into<String>, low: Scalar, high: Scalar) -> Self {
        let field = field.into();
        Self::And(vec![
            Self::compare(field.clone(), CmpOp::Gte, low),
            Self::compare(field, CmpOp::Lte, high),
        ])
    }

    pub fn within_sphere(field: impl Into<String>, center: GeoPoint, radius: f64) -> Self {
        Self::GeoWithinSphere {
            field: field.into(),
            center,
            radius,
        }
    }

    /// Conjunction that flattens nested `And`s and drops `All`.
    pub fn and(self, other: Filter) -> Self {
        let mut parts = Vec::new();
        for f in [self, other] {
            match f {
                Self::All => {}
                Self::And(inner) => parts.extend(inner),
                f => parts.push(f),
            }
        }
        match parts.len() {
            0 => Self::All,
            1 => parts.remove(0),
            _ => Self::And(parts),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::All => json!({}),
            Self::Compare { field, op, value } => {
                json!({ field: { op.as_mongo(): value.to_mongo() } })
            }
            Self::And(parts) => json!({ "$and": parts.iter().map(Filter::to_json).collect::<Vec<_>>() }),
            Self::GeoWithinSphere {
                field,
                center,
                radius,
            } => json!({
                field: { "$geoWithin": { "$centerSphere": [[center.lng, center.lat], radius] } }
            }),
        }
    }
}

/// Expression evaluated against a single document.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Field(String),
    ToUpper(Box<Expr>),
    Month(Box<Expr>),
}

impl Expr {
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    pub fn to_upper(self) -> Self {
        Self::ToUpper(Box::new(self))
    }

    pub fn month(self) -> Self {
        Self::Month(Box::new(self))
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Field(name) => json!(format!("${name}")),
            Self::ToUpper(inner) => json!({ "$toUpper": inner.to_json() }),
            Self::Month(inner) => json!({ "$month": inner.to_json() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    Count,
    Sum(Expr),
    Avg(Expr),
    Min(Expr),
    Max(Expr),
    Push(Expr),
}

impl Accumulator {
    fn to_json(&self) -> Value {
        match self {
            Self::Count => json!({ "$sum": 1 }),
            Self::Sum(e) => json!({ "$sum": e.to_json() }),
            Self::Avg(e) => json!({ "$avg": e.to_json() }),
            Self::Min(e) => json!({ "$min": e.to_json() }),
            Self::Max(e) => json!({ "$max": e.to_json() }),
            Self::Push(e) => json!({ "$push": e.to_json() }),
        }
    }
}

/// `$group`: the key lands in `_id`, accumulators in their named fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub key: Expr,
    pub fields: Vec<(String, Accumulator)>,
}

impl Group {
    pub fn by(key: Expr) -> Self {
        Self {
            key,
            fields: Vec::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, acc: Accumulator) -> Self {
        self.fields.push((name.into(), acc));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// Keep only these fields; `_id` is kept as well.
    Include(Vec<String>),
    Exclude(Vec<String>),
}

/// `$geoNear`: annotates every located document with its distance from `near`
/// (meters times `distance_multiplier`) and orders by it.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoNear {
    pub key: String,
    pub near: GeoPoint,
    pub distance_field: String,
    pub distance_multiplier: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    GeoNear(GeoNear),
    Match(Filter),
    Group(Group),
    Sort(Vec<(String, SortOrder)>),
    Unwind(String),
    AddFields(Vec<(String, Expr)>),
    Project(Projection),
    Skip(u64),
    Limit(u64),
}

impl Stage {
    pub fn to_json(&self) -> Value {
        match self {
            Self::GeoNear(g) => json!({
                "$geoNear": {
                    "near": g.near.to_geojson(),
                    "key": g.key,
                    "distanceField": g.distance_field,
                    "distanceMultiplier": g.distance_multiplier,
                    "spherical": true,
                }
            }),
            Self::Match(filter) => json!({ "$match": filter.to_json() }),
            Self::Group(group) => {
                let mut body = Map::new();
                body.insert("_id".into(), group.key.to_json());
                for (name, acc) in &group.fields {
                    body.insert(name.clone(), acc.to_json());
                }
                json!({ "$group": body })
            }
            Self::Sort(keys) => {
                let body: Map<String, Value> = keys
                    .iter()
                    .map(|(k, o)| (k.clone(), json!(o.as_mongo())))
                    .collect();
                json!({ "$sort": body })
            }
            Self::Unwind(field) => json!({ "$unwind": format!("${field}") }),
            Self::AddFields(fields) => {
                let body: Map<String, Value> = fields
                    .iter()
                    .map(|(k, e)| (k.clone(), e.to_json()))
                    .collect();
                json!({ "$addFields": body })
            }
            Self::Project(Projection::Include(fields)) => {
                let body: Map<String, Value> =
                    fields.iter().map(|f| (f.clone(), json!(1))).collect();
                json!({ "$project": body })
            }
            Self::Project(Projection::Exclude(fields)) => {
                let body: Map<String, Value> =
                    fields.iter().map(|f| (f.clone(), json!(0))).collect();
                json!({ "$project": body })
            }
            Self::Skip(n) => json!({ "$skip": n }),
            Self::Limit(n) => json!({ "$limit": n }),
        }
    }
}

/// Ordered sequence of stages run by the document store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a pipeline with a proximity stage.
    pub fn near(geo: GeoNear) -> Self {
        Self {
            stages: vec![Stage::GeoNear(geo)],
        }
    }

    pub fn matching(self, filter: Filter) -> Self {
        self.push(Stage::Match(filter))
    }

    pub fn group(self, group: Group) -> Self {
        self.push(Stage::Group(group))
    }

    pub fn sort(self, keys: Vec<(String, SortOrder)>) -> Self {
        if keys.is_empty() {
            return self;
        }
        self.push(Stage::Sort(keys))
    }

    pub fn unwind(self, field: impl Into<String>) -> Self {
        self.push(Stage::Unwind(field.into()))
    }

    pub fn add_fields(self, fields: Vec<(String, Expr)>) -> Self {
        self.push(Stage::AddFields(fields))
    }

    pub fn project(self, projection: Projection) -> Self {
        self.push(Stage::Project(projection))
    }

    pub fn skip(self, n: u64) -> Self {
        self.push(Stage::Skip(n))
    }

    pub fn limit(self, n: u64) -> Self {
        self.push(Stage::Limit(n))
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn to_json(&self) -> Value {
        Value::Array(self.stages.iter().map(Stage::to_json).collect())
    }

    fn push(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }
}
