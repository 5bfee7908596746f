//! OpenAPI -> MCP component translation.
//!
//! Turns an `OpenAPI` document (or a hand-built route table) into a registry of MCP
//! components: tools, resources and resource templates. The build pass is
//! `extract -> map -> name -> build`; at call time [`serialize::serialize_request`] turns
//! arguments into the path, query, headers and body of the outbound request.
//!
//! It intentionally contains **no** MCP transport and **no** authentication negotiation.

pub mod builder;
pub mod components;
pub mod config;
pub mod error;
pub mod mapping;
pub mod naming;
pub mod refs;
pub mod registry;
pub mod routes;
pub mod runtime;
pub mod schema;
pub mod serialize;

pub use builder::{BuildOptions, build_registry};
pub use components::{Component, ComponentKind, build_component};
pub use config::{ApiServerConfig, ComponentHooks, DuplicatePolicy, RouteMapConfig};
pub use error::{OpenApiComponentsError, Result};
pub use mapping::{MatchRule, MethodFilter, RouteMapper, RouteType, assign_route_type};
pub use naming::resolve_name;
pub use refs::RefResolver;
pub use registry::{ComponentRegistry, ResourceMatch};
pub use routes::{
    ArrayStyle, HttpMethod, ParamLocation, Route, RouteParameter, RouteRequestBody, SchemaType,
    extract_routes,
};
pub use runtime::OpenApiComponentSource;
pub use serialize::{SerializedRequest, serialize_request};
