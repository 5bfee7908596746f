//! `OpenAPI` component source runtime.
//!
//! Loads a spec, builds the [`ComponentRegistry`], exposes it as MCP model types and executes
//! `tools/call` and `resources/read` as outbound HTTP requests.

use crate::builder::{BuildOptions, build_registry};
use crate::components::Component;
use crate::config::{ApiServerConfig, ComponentHooks, HashPolicy};
use crate::error::{OpenApiComponentsError, Result};
use crate::refs::{DocId, RefResolver};
use crate::registry::ComponentRegistry;
use crate::routes::extract_routes;
use crate::serialize::{SerializedRequest, serialize_request};
use base64::Engine as _;
use mime::Mime;
use openapiv3::OpenAPI;
use parking_lot::RwLock;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use rmcp::model::{
    Annotated, CallToolResult, Content, JsonObject, RawResource, ReadResourceResult, Resource,
    ResourceTemplate, Tool,
};
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

/// `OpenAPI` source exposing API operations as MCP tools, resources and resource templates.
#[derive(Clone)]
pub struct OpenApiComponentSource {
    /// Source name (used for logs and error context).
    name: String,
    config: ApiServerConfig,
    hooks: ComponentHooks,
    spec: Arc<RwLock<Option<OpenAPI>>>,
    registry: Arc<RwLock<Option<Arc<ComponentRegistry>>>>,
    client: Client,
    base_url: Arc<RwLock<Option<String>>>,
}

/// Raw outcome of a successful outbound call.
struct HttpReply {
    content_type: Option<String>,
    bytes: Vec<u8>,
}

impl HttpReply {
    fn is_image(&self) -> bool {
        self.mime().is_some_and(|m| m.type_() == mime::IMAGE)
    }

    fn mime(&self) -> Option<Mime> {
        self.content_type.as_deref()?.parse::<Mime>().ok()
    }

    /// Body as JSON if it parses, else as a string; `None` for non-UTF-8 bytes.
    fn value(&self) -> Option<Value> {
        let text = std::str::from_utf8(&self.bytes).ok()?;
        Some(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())))
    }
}

impl OpenApiComponentSource {
    /// Create a source. Nothing is fetched until [`Self::start`].
    #[must_use]
    pub fn new(name: impl Into<String>, config: ApiServerConfig, hooks: ComponentHooks) -> Self {
        Self {
            name: name.into(),
            config,
            hooks,
            spec: Arc::new(RwLock::new(None)),
            registry: Arc::new(RwLock::new(None)),
            client: Client::new(),
            base_url: Arc::new(RwLock::new(None)),
        }
    }

    /// Create and start a source in one step.
    ///
    /// # Errors
    ///
    /// Returns an error if spec loading, parsing, or the build pass fails.
    pub async fn build(
        name: impl Into<String>,
        config: ApiServerConfig,
        hooks: ComponentHooks,
    ) -> Result<Self> {
        let src = Self::new(name, config, hooks);
        src.start().await?;
        Ok(src)
    }

    /// Load the spec, build the registry and make the source ready for calls.
    ///
    /// # Errors
    ///
    /// Returns an error if the spec cannot be loaded or parsed, the hash check fails under
    /// [`HashPolicy::Fail`], a configured base URL is invalid, or the build pass fails.
    pub async fn start(&self) -> Result<()> {
        let spec = self.load_spec().await?;

        let base_url = match self
            .config
            .base_url
            .clone()
            .or_else(|| spec.servers.first().map(|s| s.url.clone()))
        {
            Some(url) => Some(self.resolve_base_url(&url)?),
            None => {
                tracing::warn!(
                    source = %self.name,
                    "no base URL configured and none found in spec; calls will fail"
                );
                None
            }
        };

        let resolver = RefResolver::new(DocId::for_location(&self.config.spec)?, &spec)?;
        let routes = extract_routes(&spec, &resolver);
        let options = BuildOptions::from_config(&self.config, self.hooks.clone())?;
        let registry = build_registry(routes, &options)
            .map_err(|e| OpenApiComponentsError::Startup(format!("'{}': {e}", self.name)))?;

        tracing::info!(
            source = %self.name,
            components = registry.len(),
            "OpenAPI component source ready"
        );

        *self.base_url.write() = base_url;
        *self.spec.write() = Some(spec);
        *self.registry.write() = Some(Arc::new(registry));
        Ok(())
    }

    async fn load_spec(&self) -> Result<OpenAPI> {
        let location = &self.config.spec;
        let content = if is_http_url(location) {
            tracing::info!("Fetching OpenAPI spec from {location}");
            let fetch_err = |message: String| OpenApiComponentsError::OpenApiSpecFetch {
                url: location.clone(),
                message,
            };
            let resp = self
                .client
                .get(location)
                .send()
                .await
                .map_err(|e| fetch_err(e.to_string()))?;
            if !resp.status().is_success() {
                return Err(fetch_err(format!("HTTP {}", resp.status())));
            }
            resp.text().await.map_err(|e| fetch_err(e.to_string()))?
        } else {
            tracing::info!("Loading OpenAPI spec from {location}");
            let path = location.strip_prefix("file://").unwrap_or(location);
            tokio::fs::read_to_string(path).await.map_err(|e| {
                OpenApiComponentsError::OpenApiSpecReadFile {
                    path: location.clone(),
                    source: e,
                }
            })?
        };

        self.verify_hash(&content)?;

        // JSON is a subset of YAML, so serde_yaml covers both.
        serde_yaml::from_str(&content).map_err(|e| OpenApiComponentsError::OpenApiSpecParse {
            location: location.clone(),
            source: e,
        })
    }

    fn verify_hash(&self, content: &str) -> Result<()> {
        let Some(expected) = &self.config.spec_hash else {
            return Ok(());
        };
        let actual = format!("sha256:{}", hex::encode(Sha256::digest(content.as_bytes())));
        if actual == *expected {
            return Ok(());
        }
        match self.config.spec_hash_policy {
            HashPolicy::Fail => Err(OpenApiComponentsError::OpenApi(format!(
                "Spec hash mismatch. Expected: {expected}, Got: {actual}"
            ))),
            HashPolicy::Warn => {
                tracing::warn!(
                    source = %self.name,
                    expected = %expected,
                    actual = %actual,
                    "spec hash mismatch"
                );
                Ok(())
            }
            HashPolicy::Ignore => Ok(()),
        }
    }

    fn resolve_base_url(&self, base_url: &str) -> Result<String> {
        if is_http_url(base_url) {
            return Ok(base_url.to_string());
        }

        // Relative server URLs ("/api/v3") resolve against a URL-loaded spec.
        if is_http_url(&self.config.spec) {
            let mut spec_url = Url::parse(&self.config.spec).map_err(|e| {
                OpenApiComponentsError::OpenApi(format!(
                    "Invalid OpenAPI spec URL '{}': {e}",
                    self.config.spec
                ))
            })?;
            spec_url.set_fragment(None);
            let resolved = spec_url.join(base_url).map_err(|e| {
                OpenApiComponentsError::OpenApi(format!(
                    "Invalid baseUrl '{base_url}': {e} (set baseUrl explicitly)"
                ))
            })?;
            return Ok(resolved.to_string());
        }

        Err(OpenApiComponentsError::OpenApi(format!(
            "Invalid baseUrl '{base_url}': must be an absolute http(s) URL (set baseUrl explicitly)"
        )))
    }

    /// The built registry; `None` before [`Self::start`].
    #[must_use]
    pub fn registry(&self) -> Option<Arc<ComponentRegistry>> {
        self.registry.read().clone()
    }

    fn require_registry(&self) -> Result<Arc<ComponentRegistry>> {
        self.registry().ok_or_else(|| {
            OpenApiComponentsError::Runtime(format!("Source '{}' has not been started", self.name))
        })
    }

    #[must_use]
    pub fn list_tools(&self) -> Vec<Tool> {
        let Some(registry) = self.registry() else {
            return Vec::new();
        };
        registry
            .tools()
            .map(|c| {
                let mut tool = Tool::new(
                    c.name.clone(),
                    c.description.clone(),
                    Arc::new(as_json_object(&c.input_schema)),
                );
                tool.output_schema = c
                    .output_schema
                    .as_ref()
                    .map(|s| Arc::new(as_json_object(s)));
                tool.annotations = Some(c.annotations());
                tool
            })
            .collect()
    }

    #[must_use]
    pub fn list_resources(&self) -> Vec<Resource> {
        let Some(registry) = self.registry() else {
            return Vec::new();
        };
        registry
            .resources()
            .filter_map(|c| {
                let mut raw = RawResource::new(c.uri.clone()?, c.name.clone());
                raw.description = Some(c.description.clone());
                raw.mime_type.clone_from(&c.mime_type);
                Some(Annotated::new(raw, None))
            })
            .collect()
    }

    #[must_use]
    pub fn list_resource_templates(&self) -> Vec<ResourceTemplate> {
        let Some(registry) = self.registry() else {
            return Vec::new();
        };
        registry
            .templates()
            .filter_map(|c| {
                let template = json!({
                    "uriTemplate": c.uri.as_deref()?,
                    "name": c.name,
                    "description": c.description,
                    "mimeType": c.mime_type,
                });
                serde_json::from_value(template)
                    .inspect_err(|e| {
                        tracing::warn!(name = %c.name, error = %e, "skipping resource template");
                    })
                    .ok()
            })
            .collect()
    }

    /// Execute a tool call.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool is unknown, a path parameter is missing, or the outbound
    /// request fails (transport error or non-2xx response).
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult> {
        let registry = self.require_registry()?;
        let component = registry
            .get(name)
            .filter(|c| c.is_tool())
            .ok_or_else(|| OpenApiComponentsError::ComponentNotFound(name.to_string()))?;

        let arguments = arguments_object(arguments)?;
        let reply = self.execute(component, &arguments).await?;

        if reply.is_image() {
            let mime_type = reply
                .content_type
                .clone()
                .unwrap_or_else(|| "image/*".to_string());
            let b64 = base64::engine::general_purpose::STANDARD.encode(&reply.bytes);
            return Ok(CallToolResult {
                content: vec![Content::image(b64, mime_type)],
                structured_content: None,
                is_error: Some(false),
                meta: None,
            });
        }

        let body = reply.value().unwrap_or_else(|| {
            json!({
                "encoding": "base64",
                "mimeType": reply.content_type,
                "data": base64::engine::general_purpose::STANDARD.encode(&reply.bytes),
            })
        });

        // `structured_content` only when the tool advertises an output schema.
        if component.output_schema.is_some() {
            let structured = json!({ "body": body });
            return Ok(CallToolResult {
                content: vec![Content::text(structured.to_string())],
                structured_content: Some(structured),
                is_error: Some(false),
                meta: None,
            });
        }

        let text = match body {
            Value::String(s) => s,
            other => other.to_string(),
        };
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    /// Read a resource or an instantiated resource template.
    ///
    /// # Errors
    ///
    /// Returns an error if no resource matches `uri`, a template variable is missing, or the
    /// outbound request fails.
    pub async fn read_resource(&self, uri: &str) -> Result<ReadResourceResult> {
        let registry = self.require_registry()?;
        let matched = registry
            .find_resource(uri)
            .ok_or_else(|| OpenApiComponentsError::ComponentNotFound(uri.to_string()))?;

        let reply = self.execute(matched.component, &matched.arguments).await?;
        let mime_type = reply
            .content_type
            .clone()
            .or_else(|| matched.component.mime_type.clone());

        let contents = match std::str::from_utf8(&reply.bytes) {
            Ok(text) if !reply.is_image() => json!({
                "uri": uri,
                "mimeType": mime_type,
                "text": text,
            }),
            _ => json!({
                "uri": uri,
                "mimeType": mime_type,
                "blob": base64::engine::general_purpose::STANDARD.encode(&reply.bytes),
            }),
        };

        Ok(serde_json::from_value(json!({ "contents": [contents] }))?)
    }

    async fn execute(
        &self,
        component: &Component,
        arguments: &Map<String, Value>,
    ) -> Result<HttpReply> {
        let base_url = self
            .base_url
            .read()
            .clone()
            .ok_or_else(|| OpenApiComponentsError::Runtime("Base URL not configured".to_string()))?;

        let parts = serialize_request(component, arguments)?;
        let url = build_url(&base_url, &parts)?;
        tracing::debug!(
            component = %component.name,
            method = %parts.method,
            url = %url,
            "outbound request"
        );

        let headers = outbound_headers(&self.config.headers, &parts.headers)?;
        let mut request = self
            .client
            .request(parts.method.to_reqwest(), url)
            .headers(headers);
        request = apply_body(request, &parts);
        if let Some(timeout) = self.config.request_timeout() {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| OpenApiComponentsError::Request(e.to_string()))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| OpenApiComponentsError::Request(e.to_string()))?
            .to_vec();

        if !status.is_success() {
            let reply = HttpReply {
                content_type,
                bytes,
            };
            let body = reply.value().unwrap_or(Value::Null);
            return Err(OpenApiComponentsError::Http(format!(
                "API returned {} {}: {body}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown"),
            )));
        }

        Ok(HttpReply {
            content_type,
            bytes,
        })
    }

    /// The base URL resolved during [`Self::start`].
    #[must_use]
    pub fn inferred_base_url(&self) -> Option<String> {
        self.base_url.read().clone()
    }

    /// The `info.title` of the loaded spec.
    #[must_use]
    pub fn spec_title(&self) -> Option<String> {
        self.spec.read().as_ref().map(|s| s.info.title.clone())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

fn as_json_object(schema: &Value) -> JsonObject {
    schema.as_object().cloned().unwrap_or_else(JsonObject::new)
}

fn arguments_object(arguments: Value) -> Result<Map<String, Value>> {
    match arguments {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(OpenApiComponentsError::Runtime(format!(
            "Tool arguments must be a JSON object, got {other}"
        ))),
    }
}

fn build_url(base_url: &str, parts: &SerializedRequest) -> Result<Url> {
    let path = if parts.path.starts_with('/') {
        parts.path.clone()
    } else {
        format!("/{}", parts.path)
    };
    let mut url = Url::parse(&format!("{}{path}", base_url.trim_end_matches('/')))
        .map_err(|e| OpenApiComponentsError::Http(format!("Invalid URL: {e}")))?;

    if !parts.query.is_empty() {
        let query = parts
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", encode_query_component(k), encode_query_component(v)))
            .collect::<Vec<_>>()
            .join("&");
        url.set_query(Some(&query));
    }
    Ok(url)
}

/// Configured default headers, then per-call header parameters; a parameter replaces a default
/// with the same name instead of being sent alongside it.
fn outbound_headers(
    defaults: &HashMap<String, String>,
    params: &[(String, String)],
) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (key, value) in defaults.iter().chain(params.iter().map(|(k, v)| (k, v))) {
        let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
            OpenApiComponentsError::Runtime(format!("Invalid header name '{key}': {e}"))
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            OpenApiComponentsError::Runtime(format!("Invalid value for header '{key}': {e}"))
        })?;
        headers.insert(name, value);
    }
    Ok(headers)
}

fn apply_body(
    request: reqwest::RequestBuilder,
    parts: &SerializedRequest,
) -> reqwest::RequestBuilder {
    let Some(body) = &parts.body else {
        return request;
    };
    let content_type = parts.content_type.as_deref().unwrap_or("application/json");
    let is_json = content_type
        .parse::<Mime>()
        .is_ok_and(|m| m.subtype() == mime::JSON || m.suffix().is_some_and(|s| s == mime::JSON));

    match body {
        Value::String(s) if !is_json => request
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(s.clone()),
        _ if is_json => request.json(body),
        other => request
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(other.to_string()),
    }
}

/// Percent-encode everything except RFC 3986 unreserved characters.
fn encode_query_component(s: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        if matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~') {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0F) as usize] as char);
        }
    }
    out
}

// ============================================================================
// Tests
// ============================================================================
