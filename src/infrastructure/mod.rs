pub mod database;
pub mod imaging;
pub mod repositories;
pub mod storage;
