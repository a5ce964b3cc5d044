//! In-process evaluation of typed pipelines over JSON documents.
//!
//! Mirrors the semantics the Postgres compiler produces: comparisons only match
//! values of the constant's own type, dates are RFC 3339 (or `YYYY-MM-DD`) strings, unwinding an
//! empty or missing array drops the document, and sorting uses the jsonb cross-type order.
//! Strings sort bytewise here; Postgres uses the database collation.

use crate::domain::{
    document::pipeline::{
        Accumulator, Expr, Filter, GeoNear, Group, Pipeline, Projection, Scalar, SortOrder, Stage,
    },
    document::store::ID_FIELD,
    shared::geo::GeoPoint,
};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde_json::{Map, Value, json};
use std::cmp::Ordering;

pub fn run(pipeline: &Pipeline, docs: Vec<Value>) -> Vec<Value> {
    pipeline
        .stages()
        .iter()
        .fold(docs, |docs, stage| apply_stage(stage, docs))
}

pub fn apply_stage(stage: &Stage, docs: Vec<Value>) -> Vec<Value> {
    match stage {
        Stage::GeoNear(geo) => geo_near(geo, docs),
        Stage::Match(filter) => docs.into_iter().filter(|d| matches(filter, d)).collect(),
        Stage::Group(group) => group_docs(group, &docs),
        Stage::Sort(keys) => {
            let mut docs = docs;
            docs.sort_by(|a, b| compare_by_keys(keys, a, b));
            docs
        }
        Stage::Unwind(field) => docs.into_iter().flat_map(|d| unwind(field, d)).collect(),
        Stage::AddFields(fields) => docs
            .into_iter()
            .map(|mut d| {
                let computed: Vec<(String, Value)> =
                    fields.iter().map(|(k, e)| (k.clone(), eval(e, &d))).collect();
                if let Value::Object(map) = &mut d {
                    map.extend(computed);
                }
                d
            })
            .collect(),
        Stage::Project(projection) => docs.into_iter().map(|d| project(projection, d)).collect(),
        Stage::Skip(n) => docs.into_iter().skip(*n as usize).collect(),
        Stage::Limit(n) => docs.into_iter().take(*n as usize).collect(),
    }
}

pub fn get_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |current, key| current.get(key))
}

pub fn matches(filter: &Filter, doc: &Value) -> bool {
    match filter {
        Filter::All => true,
        Filter::And(parts) => parts.iter().all(|f| matches(f, doc)),
        Filter::Compare { field, op, value } => get_path(doc, field)
            .and_then(|actual| compare_scalar(actual, value))
            .is_some_and(|ordering| op.holds(ordering)),
        Filter::GeoWithinSphere {
            field,
            center,
            radius,
        } => get_path(doc, field)
            .and_then(GeoPoint::from_geojson)
            .is_some_and(|point| center.angular_distance(&point) <= *radius),
    }
}

/// Orders a document value against a constant, or `None` when the types differ.
fn compare_scalar(actual: &Value, expected: &Scalar) -> Option<Ordering> {
    match (actual, expected) {
        (Value::Number(n), Scalar::Number(e)) => n.as_f64()?.partial_cmp(e),
        (Value::String(s), Scalar::Text(e)) => Some(s.as_str().cmp(e.as_str())),
        (Value::String(s), Scalar::Date(e)) => Some(parse_date(s)?.cmp(e)),
        _ => None,
    }
}

/// RFC 3339 timestamps, or bare `YYYY-MM-DD` dates read as midnight UTC.
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|d| d.and_utc())
        })
}

/// Cross-type rank in jsonb order: null < string < number < bool < array < object.
fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::String(_) => 1,
        Value::Number(_) => 2,
        Value::Bool(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values following jsonb: by type first, then by value.
/// Arrays compare by length before elements. Strings compare bytewise.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x.len().cmp(&y.len()).then_with(|| {
            x.iter()
                .zip(y.iter())
                .map(|(p, q)| compare_values(p, q))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        }),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn compare_by_keys(keys: &[(String, SortOrder)], a: &Value, b: &Value) -> Ordering {
    for (key, order) in keys {
        let left = get_path(a, key).unwrap_or(&Value::Null);
        let right = get_path(b, key).unwrap_or(&Value::Null);
        let ordering = match order {
            SortOrder::Asc => compare_values(left, right),
            SortOrder::Desc => compare_values(right, left),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

pub fn eval(expr: &Expr, doc: &Value) -> Value {
    match expr {
        Expr::Field(name) => get_path(doc, name).cloned().unwrap_or(Value::Null),
        Expr::ToUpper(inner) => match eval(inner, doc) {
            Value::Null => Value::String(String::new()),
            Value::String(s) => Value::String(s.to_uppercase()),
            other => Value::String(other.to_string().to_uppercase()),
        },
        Expr::Month(inner) => match eval(inner, doc) {
            Value::String(s) => parse_date(&s).map_or(Value::Null, |d| json!(d.month())),
            _ => Value::Null,
        },
    }
}

fn group_docs(group: &Group, docs: &[Value]) -> Vec<Value> {
    let mut buckets: Vec<(Value, Vec<&Value>)> = Vec::new();
    for doc in docs {
        let key = eval(&group.key, doc);
        match buckets.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(doc),
            None => buckets.push((key, vec![doc])),
        }
    }

    buckets
        .into_iter()
        .map(|(key, members)| {
            let mut out = Map::new();
            out.insert(ID_FIELD.into(), key);
            for (name, acc) in &group.fields {
                out.insert(name.clone(), accumulate(acc, &members));
            }
            Value::Object(out)
        })
        .collect()
}

fn accumulate(acc: &Accumulator, members: &[&Value]) -> Value {
    let values = |e: &Expr| -> Vec<Value> { members.iter().map(|d| eval(e, d)).collect() };
    let numbers = |e: &Expr| -> Vec<Value> {
        values(e).into_iter().filter(Value::is_number).collect()
    };

    match acc {
        Accumulator::Count => json!(members.len()),
        Accumulator::Sum(e) => {
            let nums = numbers(e);
            if nums.iter().all(|n| n.as_i64().is_some()) {
                json!(nums.iter().filter_map(Value::as_i64).sum::<i64>())
            } else {
                json!(nums.iter().filter_map(Value::as_f64).sum::<f64>())
            }
        }
        Accumulator::Avg(e) => {
            let nums: Vec<f64> = numbers(e).iter().filter_map(Value::as_f64).collect();
            if nums.is_empty() {
                Value::Null
            } else {
                json!(nums.iter().sum::<f64>() / nums.len() as f64)
            }
        }
        Accumulator::Min(e) => values(e)
            .into_iter()
            .filter(|v| !v.is_null())
            .min_by(compare_values)
            .unwrap_or(Value::Null),
        Accumulator::Max(e) => values(e)
            .into_iter()
            .filter(|v| !v.is_null())
            .max_by(compare_values)
            .unwrap_or(Value::Null),
        Accumulator::Push(e) => Value::Array(values(e)),
    }
}

fn unwind(field: &str, doc: Value) -> Vec<Value> {
    match get_path(&doc, field) {
        Some(Value::Array(items)) => items
            .clone()
            .into_iter()
            .map(|item| {
                let mut copy = doc.clone();
                if let Value::Object(map) = &mut copy {
                    map.insert(field.to_string(), item);
                }
                copy
            })
            .collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(_) => vec![doc],
    }
}

fn project(projection: &Projection, doc: Value) -> Value {
    let Value::Object(mut map) = doc else {
        return doc;
    };
    match projection {
        Projection::Include(fields) => {
            map.retain(|k, _| k == ID_FIELD || fields.iter().any(|f| f == k));
        }
        Projection::Exclude(fields) => {
            for f in fields {
                map.remove(f);
            }
        }
    }
    Value::Object(map)
}

fn geo_near(geo: &GeoNear, docs: Vec<Value>) -> Vec<Value> {
    let mut located: Vec<(f64, Value)> = docs
        .into_iter()
        .filter_map(|doc| {
            let point = get_path(&doc, &geo.key).and_then(GeoPoint::from_geojson)?;
            Some((geo.near.distance_meters(&point), doc))
        })
        .collect();
    located.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

    located
        .into_iter()
        .map(|(meters, mut doc)| {
            if let Value::Object(map) = &mut doc {
                map.insert(
                    geo.distance_field.clone(),
                    json!(meters * geo.distance_multiplier),
                );
            }
            doc
        })
        .collect()
}
