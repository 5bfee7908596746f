//! The component registry.

use crate::components::{Component, ComponentKind, RESOURCE_URI_SCHEME};
use crate::config::DuplicatePolicy;
use crate::error::{OpenApiComponentsError, Result};
use crate::naming::{MAX_NAME_LEN, slugify};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Unique-name → component mapping, in build order. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    components: Vec<Component>,
    by_name: HashMap<String, usize>,
}

/// A resource or template matched by URI, with the arguments extracted from it.
#[derive(Debug, Clone)]
pub struct ResourceMatch<'a> {
    pub component: &'a Component,
    pub arguments: Map<String, Value>,
}

impl ComponentRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// Returns [`OpenApiComponentsError::Config`] if the name is already registered.
    pub fn insert(&mut self, component: Component) -> Result<()> {
        if self.by_name.contains_key(&component.name) {
            return Err(OpenApiComponentsError::Config(format!(
                "Duplicate component name '{}' ({} {})",
                component.name, component.route.method, component.route.path
            )));
        }
        self.by_name
            .insert(component.name.clone(), self.components.len());
        self.components.push(component);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Component> {
        self.by_name.get(name).map(|&i| &self.components[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Component> {
        self.components.iter()
    }

    pub fn of_kind(&self, kind: ComponentKind) -> impl Iterator<Item = &Component> {
        self.components.iter().filter(move |c| c.kind == kind)
    }

    pub fn tools(&self) -> impl Iterator<Item = &Component> {
        self.of_kind(ComponentKind::Tool)
    }

    pub fn resources(&self) -> impl Iterator<Item = &Component> {
        self.of_kind(ComponentKind::Resource)
    }

    pub fn templates(&self) -> impl Iterator<Item = &Component> {
        self.of_kind(ComponentKind::ResourceTemplate)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Find the resource or template serving `uri`.
    ///
    /// Concrete resource URIs are checked before templates. Template variables and the URI's
    /// query string (if any) become string arguments; template variables win on conflict.
    #[must_use]
    pub fn find_resource(&self, uri: &str) -> Option<ResourceMatch<'_>> {
        let (base, query) = match uri.split_once('?') {
            Some((b, q)) => (b, Some(q)),
            None => (uri, None),
        };

        let arguments = query.map(query_arguments).unwrap_or_default();

        if let Some(component) = self
            .resources()
            .find(|c| c.uri.as_deref() == Some(base))
        {
            return Some(ResourceMatch {
                component,
                arguments,
            });
        }

        self.templates().find_map(|component| {
            let template = component.uri.as_deref()?;
            let vars = match_uri_template(template, base)?;
            let mut arguments = arguments.clone();
            arguments.extend(vars);
            Some(ResourceMatch {
                component,
                arguments,
            })
        })
    }

    /// Absorb `other`, prefixing its names (`<prefix>_<name>`) and URIs (`<prefix>+<uri>`).
    ///
    /// The prefix is slugified first, so merged names keep the `[a-z0-9_]` charset.
    ///
    /// # Errors
    ///
    /// Returns [`OpenApiComponentsError::Config`] on a name clash under
    /// [`DuplicatePolicy::Error`].
    pub fn merge(
        mut self,
        other: ComponentRegistry,
        prefix: Option<&str>,
        policy: DuplicatePolicy,
    ) -> Result<Self> {
        let prefix = prefix.map(slugify).filter(|p| !p.is_empty());
        for mut component in other.components {
            if let Some(prefix) = &prefix {
                component.name = prefixed_name(prefix, &component.name);
                component.uri = component.uri.map(|uri| format!("{prefix}+{uri}"));
            }

            let Some(&existing) = self.by_name.get(&component.name) else {
                self.insert(component)?;
                continue;
            };

            match policy {
                DuplicatePolicy::Error => {
                    return Err(OpenApiComponentsError::Config(format!(
                        "Component '{}' already exists",
                        component.name
                    )));
                }
                DuplicatePolicy::Ignore => {
                    tracing::debug!(name = %component.name, "keeping existing component");
                }
                DuplicatePolicy::Warn => {
                    tracing::warn!(name = %component.name, "replacing existing component");
                    self.components[existing] = component;
                }
                DuplicatePolicy::Replace => {
                    self.components[existing] = component;
                }
            }
        }
        Ok(self)
    }
}

fn prefixed_name(prefix: &str, name: &str) -> String {
    let full = format!("{prefix}_{name}");
    match full.char_indices().nth(MAX_NAME_LEN) {
        Some((cut, _)) => full[..cut].trim_end_matches('_').to_string(),
        None => full,
    }
}

/// Query string pairs as string arguments; a repeated key collects its values into an array.
fn query_arguments(query: &str) -> Map<String, Value> {
    let mut arguments = Map::new();
    for (k, v) in url::form_urlencoded::parse(query.as_bytes()) {
        let value = Value::String(v.into_owned());
        match arguments.get_mut(&*k) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                arguments.insert(k.into_owned(), value);
            }
        }
    }
    arguments
}

/// Match a `resource://name/{a}/{b}` template against a concrete URI. Each variable matches
/// exactly one non-empty segment.
fn match_uri_template(template: &str, uri: &str) -> Option<Map<String, Value>> {
    let template = template.strip_prefix(RESOURCE_URI_SCHEME).unwrap_or(template);
    let uri = uri.strip_prefix(RESOURCE_URI_SCHEME).unwrap_or(uri);

    let t_parts: Vec<&str> = template.split('/').collect();
    let u_parts: Vec<&str> = uri.split('/').collect();
    if t_parts.len() != u_parts.len() {
        return None;
    }

    let mut vars = Map::new();
    for (t, u) in t_parts.iter().zip(&u_parts) {
        match t.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(var) => {
                if u.is_empty() {
                    return None;
                }
                let decoded = percent_decode(u);
                vars.insert(var.to_string(), Value::String(decoded));
            }
            None if t == u => {}
            None => return None,
        }
    }
    Some(vars)
}

fn percent_decode(segment: &str) -> String {
    url::form_urlencoded::parse(format!("v={}", segment.replace('+', "%2B")).as_bytes())
        .next()
        .map_or_else(|| segment.to_string(), |(_, v)| v.into_owned())
}
