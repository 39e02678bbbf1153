pub mod http;
pub mod persistence;
pub mod region;
pub mod user_center;
