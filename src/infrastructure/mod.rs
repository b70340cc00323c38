pub mod database;
pub mod network;
pub mod session;
pub mod storage;
