//! Route → component kind assignment.
//!
//! Rules are evaluated first-match-wins: custom rules in declaration order, then the built-in
//! defaults. The optional override hook runs strictly after that decision and may replace any
//! result, including [`RouteType::Exclude`].

use crate::config::{RouteMapConfig, RouteOverrideFn};
use crate::error::{OpenApiComponentsError, Result};
use crate::routes::{HttpMethod, Route};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteType {
    Tool,
    Resource,
    ResourceTemplate,
    Exclude,
}

impl fmt::Display for RouteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RouteType::Tool => "tool",
            RouteType::Resource => "resource",
            RouteType::ResourceTemplate => "resource_template",
            RouteType::Exclude => "exclude",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodFilter {
    Any,
    Only(BTreeSet<HttpMethod>),
}

impl MethodFilter {
    #[must_use]
    pub fn matches(&self, method: HttpMethod) -> bool {
        match self {
            MethodFilter::Any => true,
            MethodFilter::Only(set) => set.contains(&method),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MatchRule {
    pub methods: MethodFilter,
    /// Searched (not anchored) in the path template.
    pub pattern: Regex,
    /// Required tags; empty matches every route.
    pub tags: BTreeSet<String>,
    pub route_type: RouteType,
}

impl MatchRule {
    /// # Errors
    ///
    /// Returns [`OpenApiComponentsError::Config`] if `pattern` is not a valid regex.
    pub fn new(
        methods: MethodFilter,
        pattern: &str,
        tags: impl IntoIterator<Item = String>,
        route_type: RouteType,
    ) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|e| {
            OpenApiComponentsError::Config(format!("Invalid route map pattern '{pattern}': {e}"))
        })?;
        Ok(Self {
            methods,
            pattern,
            tags: tags.into_iter().collect(),
            route_type,
        })
    }

    /// Compile one configured route map; `index` is used in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`OpenApiComponentsError::Config`] naming the entry if a method or the pattern
    /// is invalid.
    pub fn from_config(index: usize, cfg: &RouteMapConfig) -> Result<Self> {
        let methods = if cfg.methods.is_empty() || cfg.methods.iter().any(|m| m.trim() == "*") {
            MethodFilter::Any
        } else {
            let mut set = BTreeSet::new();
            for m in &cfg.methods {
                let method = m.parse::<HttpMethod>().map_err(|e| {
                    OpenApiComponentsError::Config(format!("routeMaps[{index}]: {e}"))
                })?;
                set.insert(method);
            }
            MethodFilter::Only(set)
        };

        let pattern = Regex::new(&cfg.pattern).map_err(|e| {
            OpenApiComponentsError::Config(format!(
                "routeMaps[{index}]: invalid pattern '{}': {e}",
                cfg.pattern
            ))
        })?;

        Ok(Self {
            methods,
            pattern,
            tags: cfg.tags.iter().cloned().collect(),
            route_type: cfg.route_type,
        })
    }

    #[must_use]
    pub fn matches(&self, route: &Route) -> bool {
        self.methods.matches(route.method)
            && self.pattern.is_match(&route.path)
            && self.tags.is_subset(&route.tags)
    }
}

/// Built-in rules: parameterized GET → template, GET → resource, everything else → tool.
///
/// # Errors
///
/// Never fails in practice; the patterns are constants.
pub fn default_rules() -> Result<Vec<MatchRule>> {
    let get_only = || MethodFilter::Only(BTreeSet::from([HttpMethod::Get]));
    Ok(vec![
        MatchRule::new(
            get_only(),
            r"\{[^}]+\}",
            Vec::new(),
            RouteType::ResourceTemplate,
        )?,
        MatchRule::new(get_only(), ".*", Vec::new(), RouteType::Resource)?,
        MatchRule::new(MethodFilter::Any, ".*", Vec::new(), RouteType::Tool)?,
    ])
}

/// Decide the kind of one route.
///
/// Falls back to [`RouteType::Tool`] if no rule matches, which only happens when `defaults`
/// lacks a catch-all.
pub fn assign_route_type(
    route: &Route,
    custom: &[MatchRule],
    defaults: &[MatchRule],
    route_override: Option<&RouteOverrideFn>,
) -> RouteType {
    let provisional = custom
        .iter()
        .chain(defaults)
        .find(|rule| rule.matches(route))
        .map_or(RouteType::Tool, |rule| rule.route_type);

    match route_override.and_then(|f| f(route, provisional)) {
        Some(overridden) => {
            if overridden != provisional {
                tracing::debug!(
                    method = %route.method,
                    path = %route.path,
                    from = %provisional,
                    to = %overridden,
                    "route type overridden"
                );
            }
            overridden
        }
        None => provisional,
    }
}

/// Compiled custom rules, the built-in defaults and the optional override hook.
#[derive(Clone)]
pub struct RouteMapper {
    custom: Vec<MatchRule>,
    defaults: Vec<MatchRule>,
    route_override: Option<RouteOverrideFn>,
}

impl RouteMapper {
    /// # Errors
    ///
    /// Returns [`OpenApiComponentsError::Config`] if a built-in rule fails to compile.
    pub fn new(custom: Vec<MatchRule>, route_override: Option<RouteOverrideFn>) -> Result<Self> {
        Ok(Self {
            custom,
            defaults: default_rules()?,
            route_override,
        })
    }

    /// # Errors
    ///
    /// Returns [`OpenApiComponentsError::Config`] for the first invalid entry.
    pub fn from_config(
        configs: &[RouteMapConfig],
        route_override: Option<RouteOverrideFn>,
    ) -> Result<Self> {
        let custom = configs
            .iter()
            .enumerate()
            .map(|(i, cfg)| MatchRule::from_config(i, cfg))
            .collect::<Result<Vec<_>>>()?;
        Self::new(custom, route_override)
    }

    #[must_use]
    pub fn assign(&self, route: &Route) -> RouteType {
        assign_route_type(
            route,
            &self.custom,
            &self.defaults,
            self.route_override.as_ref(),
        )
    }

    #[must_use]
    pub fn custom_rules(&self) -> &[MatchRule] {
        &self.custom
    }
}

impl fmt::Debug for RouteMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMapper")
            .field("custom", &self.custom)
            .field("defaults", &self.defaults.len())
            .field("route_override", &self.route_override.is_some())
            .finish()
    }
}
