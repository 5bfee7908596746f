use crate::components::Component;
use crate::mapping::RouteType;
use crate::routes::Route;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for an OpenAPI-based component source.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiServerConfig {
    /// `OpenAPI` spec location (URL or file path).
    pub spec: String,

    /// Optional spec hash for version detection (`sha256:<hex>`).
    #[serde(default)]
    pub spec_hash: Option<String>,

    /// Hash policy: warn, fail, or ignore.
    #[serde(default)]
    pub spec_hash_policy: HashPolicy,

    /// Override base URL from spec.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Per-request timeout in seconds. Absent or `0` means no timeout.
    #[serde(default)]
    pub timeout: Option<u64>,

    /// Headers sent with every outbound request.
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Custom route maps, evaluated in order before the built-in defaults.
    #[serde(default)]
    pub route_maps: Vec<RouteMapConfig>,

    /// Explicit component names keyed by `operationId`.
    #[serde(default)]
    pub names: HashMap<String, String>,

    /// Tags added to every component built from this spec.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ApiServerConfig {
    /// Minimal config for a spec location; everything else takes its default.
    #[must_use]
    pub fn new(spec: impl Into<String>) -> Self {
        Self {
            spec: spec.into(),
            spec_hash: None,
            spec_hash_policy: HashPolicy::default(),
            base_url: None,
            timeout: None,
            headers: HashMap::new(),
            route_maps: Vec::new(),
            names: HashMap::new(),
            tags: Vec::new(),
        }
    }

    /// Effective per-request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        match self.timeout {
            None | Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
        }
    }
}

/// Hash verification policy.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HashPolicy {
    /// Log warning if hash doesn't match.
    #[default]
    Warn,
    /// Fail startup if hash doesn't match.
    Fail,
    /// Ignore hash verification.
    Ignore,
}

/// One custom route map entry.
///
/// ```yaml
/// routeMaps:
///   - methods: [GET]
///     pattern: "^/admin/"
///     type: exclude
///   - pattern: ".*"
///     tags: [internal]
///     type: tool
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMapConfig {
    /// HTTP methods this entry applies to. Empty or `"*"` matches every method.
    #[serde(default)]
    pub methods: Vec<String>,

    /// Regex searched in the route's path template.
    #[serde(default = "default_pattern")]
    pub pattern: String,

    /// Tags the route must carry (all of them). Empty matches every route.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Resulting route type.
    #[serde(rename = "type")]
    pub route_type: RouteType,
}

fn default_pattern() -> String {
    ".*".to_string()
}

/// What to do when merging a registry introduces a name that already exists.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Replace the existing component and log a warning.
    #[default]
    Warn,
    /// Replace the existing component silently.
    Replace,
    /// Fail the merge.
    Error,
    /// Keep the existing component.
    Ignore,
}

/// Decides a route's type after the route maps have; `Some` supersedes the rule result.
pub type RouteOverrideFn = Arc<dyn Fn(&Route, RouteType) -> Option<RouteType> + Send + Sync>;

/// Mutates a freshly built component in place.
pub type CustomizeFn = Arc<dyn Fn(&Route, &mut Component) + Send + Sync>;

/// Code-only extension points applied during the build pass.
#[derive(Clone, Default)]
pub struct ComponentHooks {
    pub route_override: Option<RouteOverrideFn>,
    pub customize: Option<CustomizeFn>,
}

impl ComponentHooks {
    #[must_use]
    pub fn with_route_override(
        mut self,
        f: impl Fn(&Route, RouteType) -> Option<RouteType> + Send + Sync + 'static,
    ) -> Self {
        self.route_override = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn with_customize(
        mut self,
        f: impl Fn(&Route, &mut Component) + Send + Sync + 'static,
    ) -> Self {
        self.customize = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for ComponentHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentHooks")
            .field("route_override", &self.route_override.is_some())
            .field("customize", &self.customize.is_some())
            .finish()
    }
}
