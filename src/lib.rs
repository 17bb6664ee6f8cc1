pub mod api;
pub mod core;
pub mod market;
pub mod notify;
pub mod scanner;
pub mod storage;
pub mod strategy;
pub mod trading;
