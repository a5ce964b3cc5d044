//! Compiles typed pipelines into a single Postgres statement over the
//! `documents` table.
//!
//! Every stage becomes one CTE producing `(doc jsonb, ord bigint)`; `ord` carries the
//! row order between stages so sorting, skipping and `$push` see the same sequence
//! the in-memory evaluator does. Field names and constants are always bound, never
//! spliced into the SQL text.

use crate::domain::{
    document::pipeline::{
        Accumulator, Expr, Filter, GeoNear, Group, Pipeline, Projection, Scalar, SortOrder, Stage,
    },
    document::store::ID_FIELD,
    shared::{errors::DomainError, geo::EARTH_RADIUS_METERS, geo::GeoPoint},
};
use sqlx::{Postgres, QueryBuilder};

fn path_of(field: &str) -> Vec<String> {
    field.split('.').map(str::to_string).collect()
}

fn push_field(qb: &mut QueryBuilder<'_, Postgres>, src: &str, field: &str) {
    qb.push("(")
        .push(src)
        .push(" #> ")
        .push_bind(path_of(field))
        .push("::text[])");
}

fn push_expr(qb: &mut QueryBuilder<'_, Postgres>, src: &str, expr: &Expr) {
    match expr {
        Expr::Field(name) => push_field(qb, src, name),
        Expr::ToUpper(inner) => {
            qb.push("to_jsonb(upper(COALESCE(");
            push_expr(qb, src, inner);
            qb.push(" #>> '{}', '')))");
        }
        Expr::Month(inner) => {
            qb.push("CASE WHEN jsonb_typeof(");
            push_expr(qb, src, inner);
            qb.push(") = 'string' THEN to_jsonb(EXTRACT(MONTH FROM ((");
            push_expr(qb, src, inner);
            qb.push(" #>> '{}')::timestamptz AT TIME ZONE 'UTC'))::int) END");
        }
    }
}

/// Angle in radians between the GeoJSON point at `field` and `center`.
fn push_angular_distance(
    qb: &mut QueryBuilder<'_, Postgres>,
    src: &str,
    field: &str,
    center: GeoPoint,
) {
    let coord = |qb: &mut QueryBuilder<'_, Postgres>, index: &str| {
        let mut path = path_of(field);
        path.push("coordinates".into());
        path.push(index.into());
        qb.push("(")
            .push(src)
            .push(" #>> ")
            .push_bind(path)
            .push("::text[])::float8");
    };

    qb.push("(2 * asin(least(1.0, sqrt(power(sin(radians(");
    coord(qb, "1");
    qb.push(" - ").push_bind(center.lat).push(") / 2), 2) + cos(radians(");
    qb.push_bind(center.lat).push(")) * cos(radians(");
    coord(qb, "1");
    qb.push(")) * power(sin(radians(");
    coord(qb, "0");
    qb.push(" - ").push_bind(center.lng).push(") / 2), 2)))))");
}

fn push_has_point(qb: &mut QueryBuilder<'_, Postgres>, src: &str, field: &str) {
    let mut path = path_of(field);
    path.push("coordinates".into());
    qb.push("jsonb_typeof(")
        .push(src)
        .push(" #> ")
        .push_bind(path)
        .push("::text[]) = 'array'");
}

pub fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, src: &str, filter: &Filter) {
    match filter {
        Filter::All => {
            qb.push("TRUE");
        }
        Filter::And(parts) if parts.is_empty() => {
            qb.push("TRUE");
        }
        Filter::And(parts) => {
            qb.push("(");
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    qb.push(" AND ");
                }
                push_filter(qb, src, part);
            }
            qb.push(")");
        }
        Filter::Compare { field, op, value } => {
            let json_type = match value {
                Scalar::Number(_) => "number",
                Scalar::Text(_) | Scalar::Date(_) => "string",
            };
            qb.push("(CASE WHEN jsonb_typeof(");
            push_field(qb, src, field);
            qb.push(") = '").push(json_type).push("' THEN (");
            push_field(qb, src, field);
            qb.push(" #>> '{}')");
            match value {
                Scalar::Number(n) => {
                    qb.push("::float8 ").push(op.as_sql()).push(" ").push_bind(*n);
                }
                Scalar::Text(s) => {
                    qb.push(" COLLATE \"C\" ")
                        .push(op.as_sql())
                        .push(" ")
                        .push_bind(s.clone());
                }
                Scalar::Date(d) => {
                    qb.push("::timestamptz ")
                        .push(op.as_sql())
                        .push(" ")
                        .push_bind(*d);
                }
            }
            qb.push(" ELSE FALSE END)");
        }
        Filter::GeoWithinSphere {
            field,
            center,
            radius,
        } => {
            qb.push("(CASE WHEN ");
            push_has_point(qb, src, field);
            qb.push(" THEN ");
            push_angular_distance(qb, src, field, *center);
            qb.push(" <= ").push_bind(*radius).push(" ELSE FALSE END)");
        }
    }
}

fn push_accumulator(qb: &mut QueryBuilder<'_, Postgres>, acc: &Accumulator) {
    const SRC: &str = "g.doc";
    let numeric = |qb: &mut QueryBuilder<'_, Postgres>, e: &Expr, cast: &str| {
        qb.push("CASE WHEN jsonb_typeof(");
        push_expr(qb, SRC, e);
        qb.push(") = 'number' THEN (");
        push_expr(qb, SRC, e);
        qb.push(" #>> '{}')::").push(cast).push(" END");
    };
    let extreme = |qb: &mut QueryBuilder<'_, Postgres>, e: &Expr, direction: &str| {
        qb.push("(array_agg(");
        push_expr(qb, SRC, e);
        qb.push(" ORDER BY ");
        push_expr(qb, SRC, e);
        qb.push(" ").push(direction).push(") FILTER (WHERE jsonb_typeof(");
        push_expr(qb, SRC, e);
        qb.push(") IS DISTINCT FROM 'null' AND ");
        push_expr(qb, SRC, e);
        qb.push(" IS NOT NULL))[1]");
    };

    match acc {
        Accumulator::Count => {
            qb.push("count(*)");
        }
        Accumulator::Sum(e) => {
            qb.push("COALESCE(sum(");
            numeric(qb, e, "numeric");
            qb.push("), 0)");
        }
        Accumulator::Avg(e) => {
            qb.push("avg(");
            numeric(qb, e, "float8");
            qb.push(")");
        }
        Accumulator::Min(e) => extreme(qb, e, "ASC"),
        Accumulator::Max(e) => extreme(qb, e, "DESC"),
        Accumulator::Push(e) => {
            qb.push("COALESCE(jsonb_agg(");
            push_expr(qb, SRC, e);
            qb.push(" ORDER BY g.ord), '[]'::jsonb)");
        }
    }
}

fn push_group(qb: &mut QueryBuilder<'_, Postgres>, prev: &str, group: &Group) {
    qb.push("SELECT jsonb_build_object('")
        .push(ID_FIELD)
        .push("', g.k");
    for (name, acc) in &group.fields {
        qb.push(", ").push_bind(name.clone()).push("::text, ");
        push_accumulator(qb, acc);
    }
    qb.push(") AS doc, row_number() OVER (ORDER BY min(g.ord)) AS ord FROM (SELECT ");
    push_expr(qb, "p.doc", &group.key);
    qb.push(" AS k, p.doc, p.ord FROM ")
        .push(prev)
        .push(" p) g GROUP BY g.k");
}

fn push_geo_near(qb: &mut QueryBuilder<'_, Postgres>, prev: &str, geo: &GeoNear) {
    let meters = |qb: &mut QueryBuilder<'_, Postgres>| {
        qb.push("(");
        push_angular_distance(qb, "p.doc", &geo.key, geo.near);
        qb.push(" * ").push(EARTH_RADIUS_METERS.to_string()).push(")");
    };

    qb.push("SELECT p.doc || jsonb_build_object(")
        .push_bind(geo.distance_field.clone())
        .push("::text, ");
    meters(qb);
    qb.push(" * ").push_bind(geo.distance_multiplier);
    qb.push(") AS doc, row_number() OVER (ORDER BY ");
    meters(qb);
    qb.push(", p.ord) AS ord FROM ").push(prev).push(" p WHERE ");
    push_has_point(qb, "p.doc", &geo.key);
}

fn push_stage(
    qb: &mut QueryBuilder<'_, Postgres>,
    index: usize,
    prev: &str,
    stage: &Stage,
) -> Result<(), DomainError> {
    match stage {
        Stage::GeoNear(geo) => {
            if index != 0 {
                return Err(DomainError::ValidationError(
                    "$geoNear is only valid as the first stage of a pipeline".into(),
                ));
            }
            push_geo_near(qb, prev, geo);
        }
        Stage::Match(filter) => {
            qb.push("SELECT p.doc, p.ord FROM ").push(prev).push(" p WHERE ");
            push_filter(qb, "p.doc", filter);
        }
        Stage::Group(group) => push_group(qb, prev, group),
        Stage::Sort(keys) => {
            qb.push("SELECT p.doc, row_number() OVER (ORDER BY ");
            for (field, order) in keys {
                push_field(qb, "p.doc", field);
                qb.push(match order {
                    SortOrder::Asc => " ASC NULLS FIRST, ",
                    SortOrder::Desc => " DESC NULLS LAST, ",
                });
            }
            qb.push("p.ord) AS ord FROM ").push(prev).push(" p");
        }
        Stage::Unwind(field) => {
            qb.push("SELECT jsonb_set(p.doc, ")
                .push_bind(path_of(field))
                .push("::text[], e.value) AS doc, row_number() OVER (ORDER BY p.ord, e.idx) AS ord FROM ")
                .push(prev)
                .push(" p CROSS JOIN LATERAL jsonb_array_elements(CASE WHEN jsonb_typeof(");
            push_field(qb, "p.doc", field);
            qb.push(") = 'array' THEN ");
            push_field(qb, "p.doc", field);
            qb.push(" WHEN jsonb_typeof(");
            push_field(qb, "p.doc", field);
            qb.push(") IS NULL OR jsonb_typeof(");
            push_field(qb, "p.doc", field);
            qb.push(") = 'null' THEN '[]'::jsonb ELSE jsonb_build_array(");
            push_field(qb, "p.doc", field);
            qb.push(") END) WITH ORDINALITY AS e(value, idx)");
        }
        Stage::AddFields(fields) => {
            qb.push("SELECT p.doc || jsonb_build_object(");
            for (i, (name, expr)) in fields.iter().enumerate() {
                if i > 0 {
                    qb.push(", ");
                }
                qb.push_bind(name.clone()).push("::text, ");
                push_expr(qb, "p.doc", expr);
            }
            qb.push(") AS doc, p.ord FROM ").push(prev).push(" p");
        }
        Stage::Project(Projection::Include(fields)) => {
            let mut keep = fields.clone();
            keep.push(ID_FIELD.to_string());
            qb.push(
                "SELECT (SELECT COALESCE(jsonb_object_agg(kv.key, kv.value), '{}'::jsonb) \
                 FROM jsonb_each(p.doc) kv WHERE kv.key = ANY(",
            )
            .push_bind(keep)
            .push("::text[])) AS doc, p.ord FROM ")
            .push(prev)
            .push(" p");
        }
        Stage::Project(Projection::Exclude(fields)) => {
            qb.push("SELECT p.doc - ")
                .push_bind(fields.clone())
                .push("::text[] AS doc, p.ord FROM ")
                .push(prev)
                .push(" p");
        }
        Stage::Skip(n) => {
            qb.push("SELECT p.doc, p.ord FROM ")
                .push(prev)
                .push(" p ORDER BY p.ord OFFSET ")
                .push_bind(i64::try_from(*n).unwrap_or(i64::MAX));
        }
        Stage::Limit(n) => {
            qb.push("SELECT p.doc, p.ord FROM ")
                .push(prev)
                .push(" p ORDER BY p.ord LIMIT ")
                .push_bind(i64::try_from(*n).unwrap_or(i64::MAX));
        }
    }
    Ok(())
}

/// Builds `WITH s0 AS (...), s1 AS (...) SELECT doc FROM sN ORDER BY ord`.
pub fn build_pipeline_query(
    collection: &str,
    pipeline: &Pipeline,
) -> Result<QueryBuilder<'static, Postgres>, DomainError> {
    let mut qb = QueryBuilder::<Postgres>::new(
        "WITH s0 AS (SELECT d.doc, row_number() OVER (ORDER BY d.created_at, d.id) AS ord \
         FROM documents d WHERE d.collection = ",
    );
    qb.push_bind(collection.to_string()).push(")");

    for (i, stage) in pipeline.stages().iter().enumerate() {
        let prev = format!("s{i}");
        qb.push(format!(", s{} AS (", i + 1));
        push_stage(&mut qb, i, &prev, stage)?;
        qb.push(")");
    }

    qb.push(format!(
        " SELECT doc FROM s{} ORDER BY ord",
        pipeline.stages().len()
    ));
    Ok(qb)
}
