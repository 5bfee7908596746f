//! Component construction.

use crate::mapping::RouteType;
use crate::routes::{HttpMethod, Route};
use crate::schema::{build_input_schema, empty_input_schema, wrap_body_output_schema};
use rmcp::model::ToolAnnotations;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

pub const RESOURCE_URI_SCHEME: &str = "resource://";

const DEFAULT_MIME_TYPE: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Tool,
    Resource,
    ResourceTemplate,
}

impl ComponentKind {
    /// The component kind for a mapped route type; `None` for [`RouteType::Exclude`].
    #[must_use]
    pub fn from_route_type(route_type: RouteType) -> Option<Self> {
        match route_type {
            RouteType::Tool => Some(Self::Tool),
            RouteType::Resource => Some(Self::Resource),
            RouteType::ResourceTemplate => Some(Self::ResourceTemplate),
            RouteType::Exclude => None,
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ComponentKind::Tool => "tool",
            ComponentKind::Resource => "resource",
            ComponentKind::ResourceTemplate => "resource_template",
        })
    }
}

/// A named, typed unit exposed to MCP clients, backed by one route.
#[derive(Debug, Clone)]
pub struct Component {
    pub kind: ComponentKind,
    pub name: String,
    pub description: String,
    pub tags: BTreeSet<String>,
    /// `resource://…` URI (or URI template). `None` for tools.
    pub uri: Option<String>,
    pub mime_type: Option<String>,
    pub input_schema: Value,
    /// Tool output schema (`{ "body": … }` wrapper).
    pub output_schema: Option<Value>,
    pub route: Arc<Route>,
}

impl Component {
    #[must_use]
    pub fn is_tool(&self) -> bool {
        self.kind == ComponentKind::Tool
    }

    #[must_use]
    pub fn annotations(&self) -> ToolAnnotations {
        annotations_for_method(self.route.method)
    }
}

fn default_description(route: &Route) -> String {
    route
        .description
        .as_deref()
        .or(route.summary.as_deref())
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map_or_else(
            || format!("Calls {} {}", route.method, route.path),
            str::to_string,
        )
}

/// `resource://<name>` for resources; templates append one `{placeholder}` segment per path
/// parameter, in path order.
#[must_use]
pub fn component_uri(kind: ComponentKind, name: &str, route: &Route) -> Option<String> {
    match kind {
        ComponentKind::Tool => None,
        ComponentKind::Resource => Some(format!("{RESOURCE_URI_SCHEME}{name}")),
        ComponentKind::ResourceTemplate => {
            let mut uri = format!("{RESOURCE_URI_SCHEME}{name}");
            for placeholder in route.path_placeholders() {
                uri.push_str("/{");
                uri.push_str(placeholder);
                uri.push('}');
            }
            Some(uri)
        }
    }
}

/// Build the component for a mapped route.
///
/// Tools and templates accept every route argument; resources take none at read time, but the
/// serializer still sends whatever parameters their route declares.
#[must_use]
pub fn build_component(route: Arc<Route>, kind: ComponentKind, name: String) -> Component {
    let input_schema = match kind {
        ComponentKind::Tool | ComponentKind::ResourceTemplate => build_input_schema(&route),
        ComponentKind::Resource => empty_input_schema(),
    };
    let output_schema = match kind {
        ComponentKind::Tool => route.response_schema.as_ref().map(wrap_body_output_schema),
        ComponentKind::Resource | ComponentKind::ResourceTemplate => None,
    };
    let mime_type = match kind {
        ComponentKind::Tool => None,
        ComponentKind::Resource | ComponentKind::ResourceTemplate => {
            Some(DEFAULT_MIME_TYPE.to_string())
        }
    };

    Component {
        kind,
        uri: component_uri(kind, &name, &route),
        description: default_description(&route),
        tags: route.tags.clone(),
        mime_type,
        input_schema,
        output_schema,
        name,
        route,
    }
}

/// MCP tool annotations from HTTP method semantics. Every HTTP-backed tool is open-world.
#[must_use]
pub fn annotations_for_method(method: HttpMethod) -> ToolAnnotations {
    let (read_only, destructive, idempotent) = match method {
        HttpMethod::Get | HttpMethod::Head | HttpMethod::Options => {
            (Some(true), Some(false), Some(true))
        }
        HttpMethod::Post => (Some(false), Some(false), Some(false)),
        HttpMethod::Put | HttpMethod::Delete => (Some(false), Some(true), Some(true)),
        // PATCH may or may not be idempotent; do not guess.
        HttpMethod::Patch => (Some(false), Some(true), None),
        HttpMethod::Trace => (None, None, None),
    };
    ToolAnnotations {
        title: None,
        read_only_hint: read_only,
        destructive_hint: destructive,
        idempotent_hint: idempotent,
        open_world_hint: Some(true),
    }
}
