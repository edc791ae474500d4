pub mod checksum;
pub mod engine;
pub mod errors;
pub mod meta;
pub mod model;
pub mod scanner;
pub mod storage;
