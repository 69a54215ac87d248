// crates/edge/src/settings.rs

//! Options loading: defaults, then an optional TOML file, then
//! `REWRITE_*` environment overrides, deserialized into the immutable
//! options object the core consumes.

use std::path::Path;

use config::{Config, Environment, File, FileFormat};

use domain::RewriteOptions;

use crate::error::EdgeError;

pub fn load(path: Option<&Path>) -> Result<RewriteOptions, EdgeError> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
    }
    builder = builder.add_source(
        Environment::with_prefix("REWRITE")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("origin_authorization"),
    );
    let options: RewriteOptions = builder.build()?.try_deserialize()?;
    Ok(options)
}
