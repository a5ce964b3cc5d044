//! Query-string driven listing: filtering, sorting, field limiting and pagination.
//!
//! `?difficulty=easy&price[lt]=1500&sort=price,-ratingsAverage&fields=name,price&page=2&limit=10`

use super::{errors::DomainError, pagination::PaginationRequest};
use crate::domain::document::pipeline::{CmpOp, Filter, Pipeline, Projection, Scalar, SortOrder};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;

lazy_static! {
    static ref OPERATOR_KEY: Regex =
        Regex::new(r"^([A-Za-z_][A-Za-z0-9_.]*)\[(gte|gt|lte|lt|eq)\]$").unwrap();
    static ref FIELD_NAME: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]*$").unwrap();
}

const RESERVED_KEYS: [&str; 4] = ["page", "sort", "limit", "fields"];
const DEFAULT_SORT: &str = "-createdAt";

#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub filter: Filter,
    pub sort: Vec<(String, SortOrder)>,
    pub fields: Option<Vec<String>>,
    pub pagination: PaginationRequest,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            filter: Filter::All,
            sort: parse_sort(DEFAULT_SORT),
            fields: None,
            pagination: PaginationRequest::default(),
        }
    }
}

impl ListQuery {
    /// Parses decoded query parameters. Keys are visited in sorted order so the
    /// resulting filter is deterministic.
    pub fn from_params(params: &BTreeMap<String, String>) -> Result<Self, DomainError> {
        let mut filter = Filter::All;

        for (key, raw) in params {
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }

            let (field, op) = if let Some(caps) = OPERATOR_KEY.captures(key) {
                let op = CmpOp::from_token(&caps[2]).unwrap_or(CmpOp::Eq);
                (caps[1].to_string(), op)
            } else if FIELD_NAME.is_match(key) {
                (key.clone(), CmpOp::Eq)
            } else {
                return Err(DomainError::ValidationError(format!(
                    "Invalid filter parameter: {key}"
                )));
            };

            filter = filter.and(Filter::compare(field, op, Scalar::parse_loose(raw)));
        }

        let sort = parse_sort(
            params
                .get("sort")
                .map(String::as_str)
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(DEFAULT_SORT),
        );

        let fields = params
            .get("fields")
            .map(|raw| split_csv(raw))
            .filter(|f| !f.is_empty());

        if let Some(bad) = fields.iter().flatten().find(|f| !FIELD_NAME.is_match(f)) {
            return Err(DomainError::ValidationError(format!("Invalid field name: {bad}")));
        }

        let pagination = PaginationRequest::from_raw(
            params.get("page").map(String::as_str),
            params.get("limit").map(String::as_str),
        )?;

        Ok(Self {
            filter,
            sort,
            fields,
            pagination,
        })
    }

    pub fn into_pipeline(self) -> Pipeline {
        let mut pipeline = Pipeline::new()
            .matching(self.filter)
            .sort(self.sort)
            .skip(self.pagination.skip())
            .limit(self.pagination.limit);
        if let Some(fields) = self.fields {
            pipeline = pipeline.project(Projection::Include(fields));
        }
        pipeline
    }
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_sort(raw: &str) -> Vec<(String, SortOrder)> {
    split_csv(raw)
        .into_iter()
        .filter_map(|key| {
            let (field, order) = match key.strip_prefix('-') {
                Some(field) => (field.to_string(), SortOrder::Desc),
                None => (key.clone(), SortOrder::Asc),
            };
            FIELD_NAME.is_match(&field).then_some((field, order))
        })
        .collect()
}
