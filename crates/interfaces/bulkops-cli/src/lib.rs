pub mod commands;
pub mod items;

use bulkops_core::{id_key_fn, key_fn, name_key_fn, KeyFn};
use bulkops_infra::Method;
use clap::ValueEnum;
use serde_json::Value;

#[derive(ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
pub enum CliMethod {
    Delete,
    Patch,
    Post,
    Put,
}

impl From<CliMethod> for Method {
    fn from(m: CliMethod) -> Self {
        match m {
            CliMethod::Delete => Method::DELETE,
            CliMethod::Patch => Method::PATCH,
            CliMethod::Post => Method::POST,
            CliMethod::Put => Method::PUT,
        }
    }
}

/// Field that identifies an item within one run.
#[derive(ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
pub enum CliKey {
    Id,
    Name,
}

impl CliKey {
    pub fn key_fn(self) -> KeyFn<Value> {
        match self {
            CliKey::Id => key_fn(id_key_fn),
            CliKey::Name => key_fn(name_key_fn),
        }
    }
}
