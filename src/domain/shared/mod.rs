pub mod errors;
pub mod geo;
pub mod list_query;
pub mod pagination;
