pub mod client;
pub mod document;

pub use client::{authorization_header, HttpWorkSource};
pub use document::parse_task_document;
