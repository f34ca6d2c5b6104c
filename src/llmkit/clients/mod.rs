//! Provider specific [`ClientWrapper`](crate::client_wrapper::ClientWrapper) implementations.
//!
//! Each submodule offers a concrete client that speaks a particular wire dialect while
//! conforming to the uniform llmkit contract.

pub mod common;

pub mod ollama;
pub mod openai;
