// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod schema;
mod validate;

pub use schema::{CorpusPolicy, PolicySchemaVersion};
pub use validate::{policy_config_path, PolicyError, CONFIG_FILE_NAME};
