//! JSON Schema helpers: converting `OpenAPI` schemas and assembling component input schemas.

use crate::error::Result;
use crate::refs::{DocId, RefResolver};
use crate::routes::{Route, RouteParameter, SchemaType};
use openapiv3::{ReferenceOr, Schema};
use serde_json::{Map, Value, json};

/// Refs nested deeper than this stay as `$ref` in the generated schema.
const MAX_INLINE_DEPTH: usize = 8;

/// Convert an `OpenAPI` schema (or `$ref` to one) into a self-contained JSON Schema value.
///
/// Nested `$ref`s are inlined up to a fixed depth; recursive schemas keep their `$ref`.
///
/// # Errors
///
/// Returns an error if the top-level `$ref` cannot be resolved.
pub fn to_json_schema(
    resolver: &RefResolver,
    current_doc: &DocId,
    schema: &ReferenceOr<Schema>,
) -> Result<Value> {
    let (doc, schema) = resolver.resolve(current_doc, schema)?;
    let mut value = serde_json::to_value(&schema)?;
    inline_refs(&mut value, resolver, &doc, &mut Vec::new());
    Ok(value)
}

fn inline_refs(value: &mut Value, resolver: &RefResolver, doc: &DocId, stack: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if let Some(reference) = map.get("$ref").and_then(Value::as_str).map(str::to_string) {
                if stack.len() >= MAX_INLINE_DEPTH || stack.contains(&reference) {
                    return;
                }
                let Ok((target_doc, mut target)) = resolver.resolve_value(doc, &reference) else {
                    return;
                };
                stack.push(reference);
                inline_refs(&mut target, resolver, &target_doc, stack);
                stack.pop();
                *value = target;
                return;
            }
            for v in map.values_mut() {
                inline_refs(v, resolver, doc, stack);
            }
        }
        Value::Array(items) => {
            for v in items {
                inline_refs(v, resolver, doc, stack);
            }
        }
        _ => {}
    }
}

/// Coarse shape of a JSON Schema value.
#[must_use]
pub fn schema_type_of(schema: &Value) -> SchemaType {
    match schema.get("type").and_then(Value::as_str) {
        Some("array") => SchemaType::Array,
        Some("object") => SchemaType::Object,
        Some(_) => SchemaType::Primitive,
        None if schema.get("properties").is_some() => SchemaType::Object,
        None if schema.get("items").is_some() => SchemaType::Array,
        None => SchemaType::Primitive,
    }
}

fn parameter_schema(param: &RouteParameter) -> Value {
    let mut schema = param.schema.clone();
    if !schema.is_object() {
        schema = json!({});
    }
    if let Some(obj) = schema.as_object_mut()
        && !obj.contains_key("description")
        && let Some(desc) = &param.description
    {
        obj.insert("description".to_string(), Value::String(desc.clone()));
    }
    schema
}

/// Input schema covering every argument a route accepts: parameters, then body fields.
#[must_use]
pub fn build_input_schema(route: &Route) -> Value {
    let mut properties = Map::new();
    let mut required: Vec<String> = Vec::new();

    for param in &route.parameters {
        properties.insert(param.name.clone(), parameter_schema(param));
        if param.required {
            required.push(param.name.clone());
        }
    }

    if let Some(body) = &route.request_body {
        match &body.fields {
            Some(fields) => {
                let body_props = body.schema.get("properties").and_then(Value::as_object);
                let body_required: Vec<&str> = body
                    .schema
                    .get("required")
                    .and_then(Value::as_array)
                    .map(|r| r.iter().filter_map(Value::as_str).collect())
                    .unwrap_or_default();
                for field in fields {
                    let prop = body_props
                        .and_then(|p| p.get(field))
                        .cloned()
                        .unwrap_or_else(|| json!({}));
                    properties.insert(field.clone(), prop);
                    // An optional body can't make any of its fields mandatory.
                    if body.required && body_required.contains(&field.as_str()) {
                        required.push(field.clone());
                    }
                }
            }
            None => {
                properties.insert("body".to_string(), body.schema.clone());
                if body.required {
                    required.push("body".to_string());
                }
            }
        }
    }

    let mut schema = json!({
        "type": "object",
        "properties": properties,
    });
    if !required.is_empty() {
        schema["required"] = json!(required);
    }
    schema
}

/// Empty object schema used for components that take no arguments.
#[must_use]
pub fn empty_input_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

/// Wrap a response body schema the way tool results carry it (`{ "body": ... }`).
///
/// MCP requires the root output schema to be an object.
#[must_use]
pub fn wrap_body_output_schema(body_schema: &Value) -> Value {
    json!({
        "type": "object",
        "required": ["body"],
        "properties": {
            "body": body_schema.clone()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::{HttpMethod, ParamLocation, RouteRequestBody};
    use openapiv3::OpenAPI;

    const SPEC: &str = r#"
openapi: "3.0.0"
info: { title: t, version: "1" }
components:
  schemas:
    Pet:
      type: object
      required: [name]
      properties:
        name: { type: string }
        owner: { $ref: '#/components/schemas/Owner' }
    Owner:
      type: object
      properties:
        id: { type: integer }
    Node:
      type: object
      properties:
        next: { $ref: '#/components/schemas/Node' }
paths: {}
"#;

    fn resolver() -> RefResolver {
        let spec: OpenAPI = serde_yaml::from_str(SPEC).unwrap();
        RefResolver::inline(&spec).unwrap()
    }

    #[test]
    fn inlines_nested_refs() {
        let r = resolver();
        let schema = to_json_schema(
            &r,
            r.root_doc(),
            &ReferenceOr::ref_("#/components/schemas/Pet"),
        )
        .unwrap();
        assert_eq!(schema["properties"]["owner"]["type"], json!("object"));
        assert_eq!(
            schema["properties"]["owner"]["properties"]["id"]["type"],
            json!("integer")
        );
    }

    #[test]
    fn recursive_schemas_keep_a_ref() {
        let r = resolver();
        let schema = to_json_schema(
            &r,
            r.root_doc(),
            &ReferenceOr::ref_("#/components/schemas/Node"),
        )
        .unwrap();
        let mut cur = &schema;
        let mut hops = 0;
        while let Some(next) = cur.get("properties").and_then(|p| p.get("next")) {
            cur = next;
            hops += 1;
            assert!(hops <= MAX_INLINE_DEPTH + 1);
        }
        assert!(cur.get("$ref").is_some());
    }

    #[test]
    fn schema_type_detection() {
        assert_eq!(schema_type_of(&json!({"type": "array"})), SchemaType::Array);
        assert_eq!(schema_type_of(&json!({"properties": {}})), SchemaType::Object);
        assert_eq!(schema_type_of(&json!({"type": "integer"})), SchemaType::Primitive);
        assert_eq!(schema_type_of(&json!({})), SchemaType::Primitive);
    }

    #[test]
    fn input_schema_marks_required_params_and_body_fields() {
        let route = Route::new(HttpMethod::Post, "/pets/{id}")
            .with_parameter(RouteParameter::new("id", ParamLocation::Path))
            .with_parameter(
                RouteParameter::new("dry_run", ParamLocation::Query)
                    .with_schema(json!({"type": "boolean"}))
                    .with_description("Validate only"),
            )
            .with_request_body(RouteRequestBody {
                required: true,
                content_type: "application/json".to_string(),
                schema: json!({
                    "type": "object",
                    "required": ["name"],
                    "properties": { "name": {"type": "string"}, "age": {"type": "integer"} }
                }),
                fields: Some(vec!["name".to_string(), "age".to_string()]),
            });

        let schema = build_input_schema(&route);
        assert_eq!(schema["required"], json!(["id", "name"]));
        assert_eq!(
            schema["properties"]["dry_run"]["description"],
            json!("Validate only")
        );
        assert_eq!(schema["properties"]["age"]["type"], json!("integer"));
    }

    #[test]
    fn optional_whole_body_is_a_single_optional_argument() {
        let route = Route::new(HttpMethod::Put, "/blob").with_request_body(RouteRequestBody {
            required: false,
            content_type: "application/octet-stream".to_string(),
            schema: json!({"type": "string"}),
            fields: None,
        });
        let schema = build_input_schema(&route);
        assert_eq!(schema["properties"]["body"]["type"], json!("string"));
        assert!(schema.get("required").is_none());
    }
}
