pub mod accessor;
pub mod batch;
pub mod engine;
pub mod error;
pub mod hit;
pub mod io;
pub mod qblast;
pub mod query;
pub mod render;
pub mod report;
