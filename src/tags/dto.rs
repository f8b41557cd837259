use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use crate::errors::ApiError;

/// Names that would read like internals or break tooling if they showed
/// up as tags.
const RESERVED_NAMES: &[&str] = &["admin", "system", "root", "null", "undefined"];

/// Trims, lowercases and validates a raw tag name.
pub fn normalize_tag_name(raw: &str) -> Result<String, ApiError> {
    lazy_static! {
        static ref TAG_NAME_RE: Regex = Regex::new(r"^[a-zA-Z0-9\s\-_]+$").unwrap();
    }

    let name = raw.trim().to_lowercase();
    if name.len() < 2 || name.len() > 50 {
        return Err(ApiError::InvalidInput(
            "tag name must be between 2 and 50 characters".into(),
        ));
    }
    if !TAG_NAME_RE.is_match(&name) {
        return Err(ApiError::InvalidInput(
            "tag name may only contain letters, numbers, spaces, hyphens and underscores".into(),
        ));
    }
    if RESERVED_NAMES.contains(&name.as_str()) {
        return Err(ApiError::InvalidInput("tag name is reserved".into()));
    }
    Ok(name)
}

#[derive(Debug, Deserialize)]
pub struct TagCreateRequest {
    pub name: String,
}

/// Body of the attach endpoint; every entry is normalized independently.
#[derive(Debug, Deserialize)]
pub struct TagAddRequest {
    pub tags: Vec<TagCreateRequest>,
}
