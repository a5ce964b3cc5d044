pub mod pipeline;
pub mod store;
