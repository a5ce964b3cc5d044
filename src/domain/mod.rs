pub mod document;
pub mod shared;
pub mod tour;
