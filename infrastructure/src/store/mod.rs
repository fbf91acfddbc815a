//! Tool store adapter

mod json;

pub use json::JsonToolStore;
