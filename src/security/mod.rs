//! Credential storage for the inference backend

pub mod keyring;

pub use keyring::{set_hf_token, get_hf_token, delete_hf_token, has_hf_token, HF_TOKEN_ENV};
