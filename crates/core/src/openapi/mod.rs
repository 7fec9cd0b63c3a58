//! OpenAPI ingestion.
//!
//! The pipeline is:
//! 1. Parse: JSON/YAML text -> `OpenApiSpec`
//! 2. Normalize: `OpenApiSpec` -> `NormalizedSpec` (refs, merging, security)
//!
//! Validation of the document beyond what mapping needs is not attempted.

mod model;
mod normalize;
mod spec;

pub use model::{
    BodyProperty, NormalizedOperation, NormalizedParam, NormalizedSpec, ParamLocation,
    RequestBodyShape, SecuritySchemeDef,
};
pub use spec::OpenApiSpec;

use crate::error::NormalizeError;

/// Parse and normalize an OpenAPI document given as JSON or YAML text.
pub fn normalize(text: &str) -> Result<NormalizedSpec, NormalizeError> {
    let spec = OpenApiSpec::parse(text).map_err(NormalizeError::Parse)?;
    normalize::normalize_spec(&spec)
}
