//! Route extraction.
//!
//! A [`Route`] is one HTTP method + path template with the metadata the rest of the pipeline
//! needs. Routes come either from an `OpenAPI` document ([`extract_routes`]) or from any other
//! route table built with the [`Route`] builder methods.

use crate::error::{OpenApiComponentsError, Result};
use crate::refs::{DocId, RefResolver};
use crate::schema::{schema_type_of, to_json_schema};
use openapiv3::{
    OpenAPI, Operation, Parameter, ParameterSchemaOrContent, QueryStyle, ReferenceOr, Response,
    Schema, SchemaKind, StatusCode, Type,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Trace,
}

impl HttpMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Trace => "TRACE",
        }
    }

    #[must_use]
    pub fn to_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Options => reqwest::Method::OPTIONS,
            HttpMethod::Trace => reqwest::Method::TRACE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = OpenApiComponentsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            "TRACE" => Ok(HttpMethod::Trace),
            other => Err(OpenApiComponentsError::Config(format!(
                "Unsupported HTTP method: {other}"
            ))),
        }
    }
}

/// Where a parameter goes in the outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Query,
    Path,
    Header,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    Primitive,
    Array,
    Object,
}

/// How array (and object) values are encoded in the query string.
///
/// Path parameters always use the simple (comma) style regardless of this setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArrayStyle {
    /// One `key=value` pair per element.
    #[default]
    Exploded,
    /// A single pair, elements joined by `,`.
    CommaJoined,
    /// A single pair, elements joined by a space.
    SpaceDelimited,
    /// A single pair, elements joined by `|`.
    PipeDelimited,
    /// Objects as `name[key]=value`.
    DeepObject,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteParameter {
    pub name: String,
    pub location: ParamLocation,
    pub required: bool,
    pub schema_type: SchemaType,
    pub array_style: ArrayStyle,
    /// JSON Schema of the value.
    pub schema: Value,
    pub description: Option<String>,
}

impl RouteParameter {
    /// A string-typed parameter; path parameters start out required.
    #[must_use]
    pub fn new(name: impl Into<String>, location: ParamLocation) -> Self {
        Self {
            name: name.into(),
            location,
            required: location == ParamLocation::Path,
            schema_type: SchemaType::Primitive,
            array_style: ArrayStyle::default(),
            schema: json!({"type": "string"}),
            description: None,
        }
    }

    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    #[must_use]
    pub fn with_array_style(mut self, style: ArrayStyle) -> Self {
        self.array_style = style;
        self
    }

    /// Set the JSON Schema; the coarse schema type follows from it.
    #[must_use]
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema_type = schema_type_of(&schema);
        self.schema = schema;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteRequestBody {
    pub required: bool,
    pub content_type: String,
    pub schema: Value,
    /// Top-level property names exposed as individual arguments; `None` means the whole body is
    /// a single `body` argument.
    pub fields: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub method: HttpMethod,
    /// Path template with `{param}` placeholders.
    pub path: String,
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: BTreeSet<String>,
    /// Parameters in declaration order.
    pub parameters: Vec<RouteParameter>,
    pub request_body: Option<RouteRequestBody>,
    /// JSON Schema of the first JSON 2xx response body, if any.
    pub response_schema: Option<Value>,
}

static PLACEHOLDER_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\{([^{}]+)\}").ok());

impl Route {
    #[must_use]
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            operation_id: None,
            summary: None,
            description: None,
            tags: BTreeSet::new(),
            parameters: Vec::new(),
            request_body: None,
            response_schema: None,
        }
    }

    #[must_use]
    pub fn with_operation_id(mut self, operation_id: impl Into<String>) -> Self {
        self.operation_id = Some(operation_id.into());
        self
    }

    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_parameter(mut self, parameter: RouteParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    #[must_use]
    pub fn with_request_body(mut self, body: RouteRequestBody) -> Self {
        self.request_body = Some(body);
        self
    }

    #[must_use]
    pub fn with_response_schema(mut self, schema: Value) -> Self {
        self.response_schema = Some(schema);
        self
    }

    /// Placeholder names in the path template, in order of appearance.
    #[must_use]
    pub fn path_placeholders(&self) -> Vec<&str> {
        let Some(re) = PLACEHOLDER_RE.as_ref() else {
            return Vec::new();
        };
        re.captures_iter(&self.path)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect()
    }

    pub fn parameters_in(&self, location: ParamLocation) -> impl Iterator<Item = &RouteParameter> {
        self.parameters
            .iter()
            .filter(move |p| p.location == location)
    }
}

// ============================================================================
// Extraction from OpenAPI
// ============================================================================

/// Extract every supported operation of `spec` as a [`Route`].
///
/// Paths keep document order; methods within a path follow a fixed order. Operations that
/// cannot be extracted (unresolvable `$ref`, argument name collisions) are skipped with a
/// warning.
#[must_use]
pub fn extract_routes(spec: &OpenAPI, resolver: &RefResolver) -> Vec<Route> {
    let mut routes = Vec::new();

    for (path, item_ref) in &spec.paths.paths {
        let (item_doc, item) = match resolver.resolve(resolver.root_doc(), item_ref) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "skipping OpenAPI path");
                continue;
            }
        };

        let operations = [
            (HttpMethod::Get, &item.get),
            (HttpMethod::Put, &item.put),
            (HttpMethod::Post, &item.post),
            (HttpMethod::Delete, &item.delete),
            (HttpMethod::Options, &item.options),
            (HttpMethod::Head, &item.head),
            (HttpMethod::Patch, &item.patch),
            (HttpMethod::Trace, &item.trace),
        ];

        for (method, operation) in operations {
            let Some(operation) = operation else {
                continue;
            };
            let input = OperationInput {
                doc: &item_doc,
                path_item_params: &item.parameters,
                path,
                method,
                operation,
            };
            match extract_operation(resolver, &input) {
                Ok(route) => routes.push(route),
                Err(e) => {
                    tracing::warn!(
                        method = %method,
                        path = %path,
                        error = %e,
                        "skipping OpenAPI operation"
                    );
                }
            }
        }
    }

    routes
}

struct OperationInput<'a> {
    doc: &'a DocId,
    path_item_params: &'a [ReferenceOr<Parameter>],
    path: &'a str,
    method: HttpMethod,
    operation: &'a Operation,
}

fn extract_operation(resolver: &RefResolver, input: &OperationInput<'_>) -> Result<Route> {
    let op = input.operation;
    let merged = merge_parameters(
        resolver,
        input.doc,
        input.path_item_params,
        &op.parameters,
    )?;

    let mut parameters = Vec::with_capacity(merged.len());
    let mut names: HashSet<String> = HashSet::new();
    for (doc, param) in &merged {
        let Some(p) = route_parameter(resolver, doc, param)? else {
            tracing::warn!(
                method = %input.method,
                path = %input.path,
                parameter = %param.parameter_data_ref().name,
                "cookie parameters are not supported; ignoring"
            );
            continue;
        };
        if !names.insert(p.name.clone()) {
            return Err(OpenApiComponentsError::OpenApi(format!(
                "Parameter '{}' appears multiple times in {} {}",
                p.name, input.method, input.path
            )));
        }
        parameters.push(p);
    }

    let request_body = match &op.request_body {
        Some(body_ref) => request_body(resolver, input.doc, body_ref)?,
        None => None,
    };
    if let Some(body) = &request_body {
        let body_names: Vec<&str> = match &body.fields {
            Some(fields) => fields.iter().map(String::as_str).collect(),
            None => vec!["body"],
        };
        if let Some(clash) = body_names.iter().find(|n| names.contains(**n)) {
            return Err(OpenApiComponentsError::OpenApi(format!(
                "Body field '{clash}' collides with a parameter in {} {}",
                input.method, input.path
            )));
        }
    }

    Ok(Route {
        method: input.method,
        path: input.path.to_string(),
        operation_id: op.operation_id.clone(),
        summary: op.summary.clone(),
        description: op.description.clone(),
        tags: op.tags.iter().cloned().collect(),
        parameters,
        request_body,
        response_schema: response_schema(resolver, input.doc, op)?,
    })
}

/// Path-item parameters first, then operation parameters; an operation parameter replaces a
/// path-item parameter with the same location and name.
fn merge_parameters(
    resolver: &RefResolver,
    current_doc: &DocId,
    path_item_params: &[ReferenceOr<Parameter>],
    operation_params: &[ReferenceOr<Parameter>],
) -> Result<Vec<(DocId, Parameter)>> {
    fn key_for(p: &Parameter) -> (&'static str, String) {
        let loc = match p {
            Parameter::Path { .. } => "path",
            Parameter::Query { .. } => "query",
            Parameter::Header { .. } => "header",
            Parameter::Cookie { .. } => "cookie",
        };
        (loc, p.parameter_data_ref().name.clone())
    }

    let mut merged: Vec<(DocId, Parameter)> = Vec::new();
    let mut index: HashMap<(&'static str, String), usize> = HashMap::new();

    for p in path_item_params.iter().chain(operation_params) {
        let resolved = resolver.resolve(current_doc, p)?;
        let k = key_for(&resolved.1);
        if let Some(i) = index.get(&k).copied() {
            merged[i] = resolved;
        } else {
            index.insert(k, merged.len());
            merged.push(resolved);
        }
    }

    Ok(merged)
}

fn route_parameter(
    resolver: &RefResolver,
    doc: &DocId,
    param: &Parameter,
) -> Result<Option<RouteParameter>> {
    let (location, array_style) = match param {
        Parameter::Query { style, .. } => {
            let explode = param
                .parameter_data_ref()
                .explode
                .unwrap_or(matches!(style, QueryStyle::Form | QueryStyle::DeepObject));
            let array_style = match style {
                QueryStyle::Form if explode => ArrayStyle::Exploded,
                QueryStyle::Form => ArrayStyle::CommaJoined,
                QueryStyle::SpaceDelimited => ArrayStyle::SpaceDelimited,
                QueryStyle::PipeDelimited => ArrayStyle::PipeDelimited,
                QueryStyle::DeepObject => ArrayStyle::DeepObject,
            };
            (ParamLocation::Query, array_style)
        }
        Parameter::Path { .. } => (ParamLocation::Path, ArrayStyle::CommaJoined),
        Parameter::Header { .. } => (ParamLocation::Header, ArrayStyle::CommaJoined),
        Parameter::Cookie { .. } => return Ok(None),
    };

    let data = param.parameter_data_ref();
    let schema = match &data.format {
        ParameterSchemaOrContent::Schema(s) => to_json_schema(resolver, doc, s)?,
        // Content-encoded parameters are passed through as strings.
        ParameterSchemaOrContent::Content(_) => json!({"type": "string"}),
    };

    Ok(Some(RouteParameter {
        name: data.name.clone(),
        location,
        required: location == ParamLocation::Path || data.required,
        schema_type: schema_type_of(&schema),
        array_style,
        schema,
        description: data.description.clone(),
    }))
}

fn is_json_media_type(media_type: &str) -> bool {
    let lower = media_type.to_ascii_lowercase();
    lower == "application/json" || lower.contains("+json") || lower.ends_with("/json")
}

fn request_body(
    resolver: &RefResolver,
    current_doc: &DocId,
    body_ref: &ReferenceOr<openapiv3::RequestBody>,
) -> Result<Option<RouteRequestBody>> {
    let (body_doc, body) = resolver.resolve(current_doc, body_ref)?;

    let Some((content_type, media)) = body
        .content
        .iter()
        .find(|(k, _)| is_json_media_type(k))
        .or_else(|| body.content.iter().next())
    else {
        return Ok(None);
    };

    let schema = match &media.schema {
        Some(s) => to_json_schema(resolver, &body_doc, s)?,
        None => json!({}),
    };

    let fields = match &media.schema {
        Some(s) if is_json_media_type(content_type) => {
            declared_properties(resolver, &body_doc, s)?
        }
        _ => None,
    };

    Ok(Some(RouteRequestBody {
        required: body.required,
        content_type: content_type.clone(),
        schema,
        fields,
    }))
}

/// Top-level property names of an object schema, in declaration order.
fn declared_properties(
    resolver: &RefResolver,
    current_doc: &DocId,
    schema: &ReferenceOr<Schema>,
) -> Result<Option<Vec<String>>> {
    let (_, schema) = resolver.resolve(current_doc, schema)?;
    let properties = match &schema.schema_kind {
        SchemaKind::Type(Type::Object(object)) => &object.properties,
        SchemaKind::Any(any) => &any.properties,
        _ => return Ok(None),
    };
    if properties.is_empty() {
        return Ok(None);
    }
    Ok(Some(properties.keys().cloned().collect()))
}

/// Schema of the lowest explicit 2xx JSON response, falling back to the `2XX` range.
fn response_schema(
    resolver: &RefResolver,
    current_doc: &DocId,
    operation: &Operation,
) -> Result<Option<Value>> {
    let mut explicit_2xx: Vec<(u16, &ReferenceOr<Response>)> = Vec::new();
    let mut range_2xx: Option<&ReferenceOr<Response>> = None;

    for (code, resp) in &operation.responses.responses {
        match code {
            StatusCode::Code(n) if (200..300).contains(n) => explicit_2xx.push((*n, resp)),
            StatusCode::Range(2) => range_2xx = Some(resp),
            _ => {}
        }
    }
    explicit_2xx.sort_by_key(|(n, _)| *n);

    let Some(resp_ref) = explicit_2xx.first().map(|(_, r)| *r).or(range_2xx) else {
        return Ok(None);
    };

    let (resp_doc, resp) = resolver.resolve(current_doc, resp_ref)?;
    let Some(schema_ref) = resp
        .content
        .iter()
        .find(|(k, _)| is_json_media_type(k))
        .and_then(|(_, mt)| mt.schema.as_ref())
    else {
        return Ok(None);
    };

    Ok(Some(to_json_schema(resolver, &resp_doc, schema_ref)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn routes_for(yaml: &str) -> Vec<Route> {
        let spec: OpenAPI = serde_yaml::from_str(yaml).expect("valid spec");
        let resolver = RefResolver::inline(&spec).expect("resolver");
        extract_routes(&spec, &resolver)
    }

    #[test]
    fn parses_methods_case_insensitively() {
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!(" Patch ".parse::<HttpMethod>().unwrap(), HttpMethod::Patch);
        assert!("BREW".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn path_placeholders_in_order() {
        let route = Route::new(HttpMethod::Get, "/orgs/{org}/users/{user_id}");
        assert_eq!(route.path_placeholders(), vec!["org", "user_id"]);
        assert!(Route::new(HttpMethod::Get, "/health").path_placeholders().is_empty());
    }

    #[test]
    fn extracts_routes_in_document_order() {
        let routes = routes_for(
            r#"
openapi: "3.0.0"
info: { title: t, version: "1" }
paths:
  /users/{id}:
    delete:
      operationId: deleteUser
      responses: { "204": { description: gone } }
    get:
      operationId: getUser
      tags: [users]
      summary: Fetch a user
      parameters:
        - { name: id, in: path, required: true, schema: { type: integer } }
        - { name: fields, in: query, schema: { type: array, items: { type: string } } }
        - { name: X-Trace, in: header, schema: { type: string } }
        - { name: session, in: cookie, schema: { type: string } }
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema: { type: object, properties: { id: { type: integer } } }
  /health:
    get:
      responses: { "200": { description: ok } }
"#,
        );

        let summary: Vec<(HttpMethod, &str)> =
            routes.iter().map(|r| (r.method, r.path.as_str())).collect();
        assert_eq!(
            summary,
            vec![
                (HttpMethod::Get, "/users/{id}"),
                (HttpMethod::Delete, "/users/{id}"),
                (HttpMethod::Get, "/health"),
            ]
        );

        let get_user = &routes[0];
        assert_eq!(get_user.operation_id.as_deref(), Some("getUser"));
        assert!(get_user.tags.contains("users"));
        let names: Vec<&str> = get_user.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["id", "fields", "X-Trace"]);

        let fields = &get_user.parameters[1];
        assert_eq!(fields.location, ParamLocation::Query);
        assert_eq!(fields.schema_type, SchemaType::Array);
        assert_eq!(fields.array_style, ArrayStyle::Exploded);
        assert!(!fields.required);

        assert!(get_user.parameters[0].required);
        assert_eq!(
            get_user.response_schema.as_ref().unwrap()["type"],
            json!("object")
        );
        assert!(routes[2].operation_id.is_none());
    }

    #[test]
    fn query_style_and_explode_map_to_array_style() {
        let routes = routes_for(
            r#"
openapi: "3.0.0"
info: { title: t, version: "1" }
paths:
  /search:
    get:
      parameters:
        - { name: a, in: query, explode: false, schema: { type: array, items: { type: string } } }
        - { name: b, in: query, style: pipeDelimited, schema: { type: array, items: { type: string } } }
        - { name: c, in: query, style: deepObject, schema: { type: object } }
      responses: { "200": { description: ok } }
"#,
        );
        let styles: Vec<ArrayStyle> = routes[0]
            .parameters
            .iter()
            .map(|p| p.array_style)
            .collect();
        assert_eq!(
            styles,
            vec![
                ArrayStyle::CommaJoined,
                ArrayStyle::PipeDelimited,
                ArrayStyle::DeepObject
            ]
        );
    }

    #[test]
    fn operation_parameters_override_path_item_parameters() {
        let routes = routes_for(
            r#"
openapi: "3.0.0"
info: { title: t, version: "1" }
paths:
  /users:
    parameters:
      - { name: q, in: query, required: false, schema: { type: string } }
      - { name: page, in: query, schema: { type: integer } }
    get:
      parameters:
        - { name: q, in: query, required: true, schema: { type: string } }
      responses: { "200": { description: ok } }
"#,
        );
        let params = &routes[0].parameters;
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].name, "q");
        assert!(params[0].required);
        assert_eq!(params[1].name, "page");
    }

    #[test]
    fn flattens_json_object_bodies_through_refs() {
        let routes = routes_for(
            r#"
openapi: "3.0.0"
info: { title: t, version: "1" }
components:
  requestBodies:
    NewPet:
      required: true
      content:
        application/json:
          schema: { $ref: '#/components/schemas/Pet' }
  schemas:
    Pet:
      type: object
      required: [name]
      properties:
        name: { type: string }
        age: { type: integer }
paths:
  /pets:
    post:
      requestBody: { $ref: '#/components/requestBodies/NewPet' }
      responses: { "201": { description: created } }
"#,
        );
        let body = routes[0].request_body.as_ref().unwrap();
        assert!(body.required);
        assert_eq!(body.content_type, "application/json");
        assert_eq!(
            body.fields.as_deref(),
            Some(&["name".to_string(), "age".to_string()][..])
        );
    }

    #[test]
    fn body_fields_keep_declaration_order() {
        let routes = routes_for(
            r#"
openapi: "3.0.0"
info: { title: t, version: "1" }
paths:
  /orders:
    post:
      requestBody:
        content:
          application/json:
            schema:
              properties:
                zeta: { type: string }
                alpha: { type: integer }
                mid: { type: boolean }
      responses: { "201": { description: created } }
"#,
        );
        let body = routes[0].request_body.as_ref().unwrap();
        assert_eq!(
            body.fields.as_deref(),
            Some(&["zeta".to_string(), "alpha".to_string(), "mid".to_string()][..])
        );
    }

    #[test]
    fn non_json_bodies_become_a_single_argument() {
        let routes = routes_for(
            r#"
openapi: "3.0.0"
info: { title: t, version: "1" }
paths:
  /upload:
    put:
      requestBody:
        content:
          application/octet-stream:
            schema: { type: string, format: binary }
      responses: { "200": { description: ok } }
"#,
        );
        let body = routes[0].request_body.as_ref().unwrap();
        assert!(body.fields.is_none());
        assert_eq!(body.content_type, "application/octet-stream");
    }

    #[test]
    fn skips_operations_with_colliding_argument_names() {
        let routes = routes_for(
            r#"
openapi: "3.0.0"
info: { title: t, version: "1" }
paths:
  /pets/{name}:
    put:
      operationId: renamePet
      parameters:
        - { name: name, in: path, required: true, schema: { type: string } }
      requestBody:
        content:
          application/json:
            schema: { type: object, properties: { name: { type: string } } }
      responses: { "200": { description: ok } }
    get:
      operationId: getPet
      parameters:
        - { name: name, in: path, required: true, schema: { type: string } }
      responses: { "200": { description: ok } }
"#,
        );
        let ids: Vec<&str> = routes
            .iter()
            .filter_map(|r| r.operation_id.as_deref())
            .collect();
        assert_eq!(ids, vec!["getPet"]);
    }

    #[test]
    fn skips_operations_with_dangling_refs() {
        let routes = routes_for(
            r#"
openapi: "3.0.0"
info: { title: t, version: "1" }
paths:
  /a:
    get:
      parameters:
        - $ref: '#/components/parameters/Missing'
      responses: { "200": { description: ok } }
  /b:
    get:
      responses: { "200": { description: ok } }
"#,
        );
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].path, "/b");
    }
}
