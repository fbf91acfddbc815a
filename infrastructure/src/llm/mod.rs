//! LLM gateway adapter

mod gateway;
mod protocol;

pub use gateway::{HttpLlmGateway, HttpLlmSession, HttpLlmSettings};
