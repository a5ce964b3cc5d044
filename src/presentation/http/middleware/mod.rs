pub mod alias;
pub mod logging;
pub mod request_id;
