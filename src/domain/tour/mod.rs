pub mod entity;
pub mod geo;
pub mod pipelines;
