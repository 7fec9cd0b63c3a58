//! Normalization from an OpenAPI document to a [`NormalizedSpec`].
//!
//! This module handles the OpenAPI-specific logic:
//! - `$ref` resolution for parameters, request bodies and schemas
//! - Parameter merging (operation-level overrides path-level)
//! - Request body shape detection
//! - Security requirement inheritance

use serde_json::{Value, json};
use std::collections::HashSet;

use super::model::{
    BodyProperty, NormalizedOperation, NormalizedParam, NormalizedSpec, ParamLocation,
    RequestBodyShape, SecuritySchemeDef,
};
use super::spec::{
    Components, MaybeRef, OpenApiSpec, Operation, Parameter, PathItem, RequestBody,
    SecurityRequirement, SecuritySchemeObject,
};
use crate::error::NormalizeError;
use crate::ir::HttpMethod;

/// Upper bound on chained `$ref` hops and `allOf` nesting.
const MAX_REF_DEPTH: usize = 8;

/// Normalize an OpenAPI document.
pub fn normalize_spec(spec: &OpenApiSpec) -> Result<NormalizedSpec, NormalizeError> {
    let paths = spec
        .paths
        .as_ref()
        .ok_or_else(|| NormalizeError::Invalid("missing 'paths'".to_string()))?;

    let mut operations = Vec::new();
    // BTreeMap iteration gives sorted paths, so output is deterministic
    for (path, item) in paths {
        for (method, op) in path_operations(item) {
            operations.push(normalize_operation(spec, path, method, op, item));
        }
    }

    let security_schemes = spec
        .components
        .security_schemes
        .iter()
        .map(|(name, scheme)| (name.clone(), normalize_security_scheme(scheme)))
        .collect();

    Ok(NormalizedSpec {
        title: spec.info.title.clone(),
        version: spec.info.version.clone(),
        description: spec.info.description.clone(),
        base_urls: spec.servers.iter().map(|s| s.url.clone()).collect(),
        operations,
        security_schemes,
    })
}

/// Operations of a path item in fixed method order.
fn path_operations(item: &PathItem) -> Vec<(HttpMethod, &Operation)> {
    [
        (HttpMethod::Get, item.get.as_ref()),
        (HttpMethod::Post, item.post.as_ref()),
        (HttpMethod::Put, item.put.as_ref()),
        (HttpMethod::Patch, item.patch.as_ref()),
        (HttpMethod::Delete, item.delete.as_ref()),
        (HttpMethod::Head, item.head.as_ref()),
        (HttpMethod::Options, item.options.as_ref()),
    ]
    .into_iter()
    .filter_map(|(method, op)| op.map(|op| (method, op)))
    .collect()
}

fn normalize_operation(
    spec: &OpenApiSpec,
    path: &str,
    method: HttpMethod,
    op: &Operation,
    item: &PathItem,
) -> NormalizedOperation {
    let components = &spec.components;

    let parameters = merge_params(components, &item.parameters, &op.parameters);

    let request_body = op
        .request_body
        .as_ref()
        .and_then(|body| resolve_request_body(components, body))
        .and_then(|body| normalize_body(components, body));

    let requirements = op.security.as_ref().or(spec.security.as_ref());
    let security = requirements
        .map(|reqs| security_scheme_names(reqs.as_slice()))
        .unwrap_or_default();

    NormalizedOperation {
        operation_id: op.operation_id.clone(),
        method,
        path: path.to_string(),
        summary: op.summary.clone(),
        description: op.description.clone(),
        parameters,
        request_body,
        security,
    }
}

/// Merge path-level and operation-level parameters.
///
/// An operation-level parameter replaces a path-level one with the same
/// name and location.
fn merge_params(
    components: &Components,
    path_level: &[MaybeRef<Parameter>],
    op_level: &[MaybeRef<Parameter>],
) -> Vec<NormalizedParam> {
    let mut params: Vec<NormalizedParam> = Vec::new();

    for p in path_level.iter().chain(op_level) {
        let Some(param) = resolve_parameter(components, p) else {
            continue;
        };
        let normalized = normalize_param(components, param);
        params.retain(|existing| {
            !(existing.name == normalized.name && existing.location == normalized.location)
        });
        params.push(normalized);
    }

    params
}

fn normalize_param(components: &Components, p: &Parameter) -> NormalizedParam {
    let schema = p
        .schema
        .as_ref()
        .map(|s| resolve_schema(components, s).clone())
        .unwrap_or_else(|| json!({ "type": "string" }));

    let location = ParamLocation::parse(&p.location);
    NormalizedParam {
        name: p.name.clone(),
        // Path parameters are always required
        required: p.required || location == ParamLocation::Path,
        location,
        description: p.description.clone(),
        schema,
    }
}

fn resolve_parameter<'a>(
    components: &'a Components,
    param: &'a MaybeRef<Parameter>,
) -> Option<&'a Parameter> {
    match param {
        MaybeRef::Item(p) => Some(p),
        MaybeRef::Ref { ref_path } => {
            let resolved = ref_name(ref_path, "parameters")
                .and_then(|name| components.parameters.get(name));
            if resolved.is_none() {
                tracing::warn!("Unresolvable parameter reference '{ref_path}', skipping");
            }
            resolved
        }
    }
}

fn resolve_request_body<'a>(
    components: &'a Components,
    body: &'a MaybeRef<RequestBody>,
) -> Option<&'a RequestBody> {
    match body {
        MaybeRef::Item(b) => Some(b),
        MaybeRef::Ref { ref_path } => {
            let resolved = ref_name(ref_path, "requestBodies")
                .and_then(|name| components.request_bodies.get(name));
            if resolved.is_none() {
                tracing::warn!("Unresolvable request body reference '{ref_path}', skipping");
            }
            resolved
        }
    }
}

/// Extract `X` from `#/components/<section>/X`.
fn ref_name<'a>(ref_path: &'a str, section: &str) -> Option<&'a str> {
    ref_path
        .strip_prefix("#/components/")?
        .strip_prefix(section)?
        .strip_prefix('/')
}

/// Follow `$ref`s to component schemas.
///
/// Unresolvable or too deeply chained references return the last schema
/// reached, which is still a usable opaque schema.
fn resolve_schema<'a>(components: &'a Components, schema: &'a Value) -> &'a Value {
    let mut current = schema;
    for _ in 0..MAX_REF_DEPTH {
        let Some(target) = current
            .get("$ref")
            .and_then(Value::as_str)
            .and_then(|r| ref_name(r, "schemas"))
            .and_then(|name| components.schemas.get(name))
        else {
            break;
        };
        current = target;
    }
    current
}

/// Pick the media type to send and classify the body shape.
fn normalize_body(components: &Components, body: &RequestBody) -> Option<RequestBodyShape> {
    let (content_type, media) = body
        .content
        .iter()
        .find(|(ct, _)| is_json_media_type(ct))
        .or_else(|| {
            body.content
                .iter()
                .find(|(ct, _)| *ct == "application/x-www-form-urlencoded")
        })
        .or_else(|| body.content.iter().next())?;

    let schema = media
        .schema
        .as_ref()
        .map(|s| resolve_schema(components, s))
        .cloned()
        .unwrap_or_else(|| json!({}));

    if is_json_media_type(content_type)
        && let Some(properties) = object_properties(components, &schema, 0)
        && !properties.is_empty()
    {
        return Some(RequestBodyShape::Structured {
            content_type: content_type.clone(),
            properties,
        });
    }

    Some(RequestBodyShape::Opaque {
        content_type: content_type.clone(),
        required: body.required,
        description: body.description.clone(),
        schema,
    })
}

fn is_json_media_type(media_type: &str) -> bool {
    media_type == "application/json" || media_type.ends_with("+json")
}

/// Collect object properties, merging `allOf` parts.
///
/// Returns `None` when the schema does not describe an object with
/// named properties.
fn object_properties(
    components: &Components,
    schema: &Value,
    depth: usize,
) -> Option<Vec<BodyProperty>> {
    if depth > MAX_REF_DEPTH {
        return None;
    }
    let schema = resolve_schema(components, schema);

    if let Some(props) = schema.get("properties").and_then(Value::as_object) {
        let required: HashSet<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|r| r.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        return Some(
            props
                .iter()
                .map(|(name, prop)| BodyProperty {
                    name: name.clone(),
                    required: required.contains(name.as_str()),
                    schema: resolve_schema(components, prop).clone(),
                })
                .collect(),
        );
    }

    let parts = schema.get("allOf").and_then(Value::as_array)?;
    let mut merged: Vec<BodyProperty> = Vec::new();
    for part in parts {
        for prop in object_properties(components, part, depth + 1).unwrap_or_default() {
            match merged.iter_mut().find(|p| p.name == prop.name) {
                Some(existing) => {
                    existing.required |= prop.required;
                    existing.schema = prop.schema;
                }
                None => merged.push(prop),
            }
        }
    }
    Some(merged)
}

/// Scheme names of all alternatives, first occurrence wins.
fn security_scheme_names(requirements: &[SecurityRequirement]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for requirement in requirements {
        for name in requirement.keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
    }
    names
}

fn normalize_security_scheme(scheme: &SecuritySchemeObject) -> SecuritySchemeDef {
    match scheme.scheme_type.as_str() {
        "http" => SecuritySchemeDef::Http {
            scheme: scheme
                .scheme
                .as_deref()
                .unwrap_or("bearer")
                .to_ascii_lowercase(),
        },
        "apiKey" => SecuritySchemeDef::ApiKey {
            name: scheme.name.clone().unwrap_or_default(),
            location: scheme.location.clone().unwrap_or_else(|| "header".to_string()),
        },
        "oauth2" => SecuritySchemeDef::OAuth2,
        "openIdConnect" => SecuritySchemeDef::OpenIdConnect,
        other => SecuritySchemeDef::Unsupported(other.to_string()),
    }
}
