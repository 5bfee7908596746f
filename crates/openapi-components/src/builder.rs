//! The build pass: map → name → build → register.

use crate::components::{ComponentKind, build_component, component_uri};
use crate::config::{ApiServerConfig, ComponentHooks};
use crate::error::{OpenApiComponentsError, Result};
use crate::mapping::RouteMapper;
use crate::naming::{base_name, reserve_unique_name};
use crate::registry::ComponentRegistry;
use crate::routes::Route;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

/// Everything the build pass needs besides the routes.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub mapper: RouteMapper,
    /// Explicit names keyed by `operationId`.
    pub names: HashMap<String, String>,
    /// Tags added to every component.
    pub global_tags: BTreeSet<String>,
    pub hooks: ComponentHooks,
}

impl BuildOptions {
    /// Default rules only, no overrides, no hooks.
    ///
    /// # Errors
    ///
    /// Returns an error if the built-in rules fail to compile.
    pub fn new() -> Result<Self> {
        Ok(Self {
            mapper: RouteMapper::new(Vec::new(), None)?,
            names: HashMap::new(),
            global_tags: BTreeSet::new(),
            hooks: ComponentHooks::default(),
        })
    }

    /// # Errors
    ///
    /// Returns [`OpenApiComponentsError::Config`] if a route map is invalid.
    pub fn from_config(config: &ApiServerConfig, hooks: ComponentHooks) -> Result<Self> {
        Ok(Self {
            mapper: RouteMapper::from_config(&config.route_maps, hooks.route_override.clone())?,
            names: config.names.clone(),
            global_tags: config.tags.iter().cloned().collect(),
            hooks,
        })
    }
}

/// Run the build pass over `routes`, in order.
///
/// # Errors
///
/// Returns [`OpenApiComponentsError::Config`] if two explicit name overrides resolve to the
/// same name, or if a customization hook renames a component onto an existing one.
pub fn build_registry(
    routes: impl IntoIterator<Item = Route>,
    options: &BuildOptions,
) -> Result<ComponentRegistry> {
    let mut registry = ComponentRegistry::new();
    let mut taken: HashSet<String> = HashSet::new();
    // base name → operationId, for names that came from explicit overrides
    let mut explicit: HashMap<String, String> = HashMap::new();
    let mut excluded = 0usize;

    for route in routes {
        let route_type = options.mapper.assign(&route);
        let Some(kind) = ComponentKind::from_route_type(route_type) else {
            tracing::debug!(method = %route.method, path = %route.path, "route excluded");
            excluded += 1;
            continue;
        };

        let base = base_name(&route, &options.names);
        if let Some(op_id) = route
            .operation_id
            .as_deref()
            .filter(|id| options.names.contains_key(*id))
            && let Some(previous) = explicit.insert(base.clone(), op_id.to_string())
        {
            return Err(OpenApiComponentsError::Config(format!(
                "Explicit names for operations '{previous}' and '{op_id}' both resolve to '{base}'"
            )));
        }
        let name = reserve_unique_name(&mut taken, &base);

        let route = Arc::new(route);
        let mut component = build_component(Arc::clone(&route), kind, name);
        component.tags.extend(options.global_tags.iter().cloned());

        if let Some(customize) = &options.hooks.customize {
            let (name_before, uri_before) = (component.name.clone(), component.uri.clone());
            customize(route.as_ref(), &mut component);
            // A rename without an explicit URI change keeps the URI in step with the name.
            if component.name != name_before && component.uri == uri_before {
                component.uri = component_uri(component.kind, &component.name, &route);
            }
        }

        tracing::debug!(
            method = %route.method,
            path = %route.path,
            kind = %component.kind,
            name = %component.name,
            "mapped route"
        );
        registry.insert(component)?;
    }

    tracing::info!(
        tools = registry.tools().count(),
        resources = registry.resources().count(),
        templates = registry.templates().count(),
        excluded,
        "built component registry"
    );
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteMapConfig;
    use crate::mapping::RouteType;
    use crate::routes::{HttpMethod, ParamLocation, RouteParameter};

    fn routes() -> Vec<Route> {
        vec![
            Route::new(HttpMethod::Get, "/pets").with_operation_id("listPets"),
            Route::new(HttpMethod::Get, "/pets/{id}")
                .with_operation_id("getPet")
                .with_parameter(RouteParameter::new("id", ParamLocation::Path)),
            Route::new(HttpMethod::Post, "/pets").with_operation_id("createPet"),
            Route::new(HttpMethod::Delete, "/admin/pets").with_operation_id("purge"),
        ]
    }

    #[test]
    fn builds_every_kind_with_default_rules() {
        let reg = build_registry(routes(), &BuildOptions::new().unwrap()).unwrap();
        let summary: Vec<(&str, ComponentKind)> =
            reg.iter().map(|c| (c.name.as_str(), c.kind)).collect();
        assert_eq!(
            summary,
            vec![
                ("listpets", ComponentKind::Resource),
                ("getpet", ComponentKind::ResourceTemplate),
                ("createpet", ComponentKind::Tool),
                ("purge", ComponentKind::Tool),
            ]
        );
    }

    #[test]
    fn excluded_routes_produce_no_component() {
        let mut cfg = ApiServerConfig::new("spec.yaml");
        cfg.route_maps.push(RouteMapConfig {
            methods: Vec::new(),
            pattern: "^/admin/".to_string(),
            tags: Vec::new(),
            route_type: RouteType::Exclude,
        });
        let opts = BuildOptions::from_config(&cfg, ComponentHooks::default()).unwrap();
        let reg = build_registry(routes(), &opts).unwrap();
        assert_eq!(reg.len(), 3);
        assert!(reg.get("purge").is_none());
    }

    #[test]
    fn global_tags_and_customize_hook_apply() {
        let mut cfg = ApiServerConfig::new("spec.yaml");
        cfg.tags = vec!["petstore".to_string()];
        let hooks = ComponentHooks::default().with_customize(|route, component| {
            if route.method == HttpMethod::Delete {
                component.description = format!("DANGER: {}", component.description);
                component.tags.insert("destructive".to_string());
            }
        });
        let opts = BuildOptions::from_config(&cfg, hooks).unwrap();
        let reg = build_registry(routes(), &opts).unwrap();

        assert!(reg.iter().all(|c| c.tags.contains("petstore")));
        let purge = reg.get("purge").unwrap();
        assert!(purge.description.starts_with("DANGER: "));
        assert!(purge.tags.contains("destructive"));
    }

    #[test]
    fn route_override_hook_can_rescue_excluded_routes() {
        let mut cfg = ApiServerConfig::new("spec.yaml");
        cfg.route_maps.push(RouteMapConfig {
            methods: vec!["*".to_string()],
            pattern: ".*".to_string(),
            tags: Vec::new(),
            route_type: RouteType::Exclude,
        });
        let hooks = ComponentHooks::default().with_route_override(|route, _| {
            (route.operation_id.as_deref() == Some("getPet")).then_some(RouteType::Tool)
        });
        let opts = BuildOptions::from_config(&cfg, hooks).unwrap();
        let reg = build_registry(routes(), &opts).unwrap();
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get("getpet").unwrap().kind, ComponentKind::Tool);
    }

    #[test]
    fn colliding_derived_names_are_numbered() {
        let routes = vec![
            Route::new(HttpMethod::Post, "/a").with_operation_id("foo__a"),
            Route::new(HttpMethod::Post, "/b").with_operation_id("foo__b"),
            Route::new(HttpMethod::Post, "/c").with_operation_id("Foo"),
        ];
        let reg = build_registry(routes, &BuildOptions::new().unwrap()).unwrap();
        let names: Vec<&str> = reg.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["foo", "foo_2", "foo_3"]);
    }

    #[test]
    fn conflicting_explicit_names_are_a_config_error() {
        let mut opts = BuildOptions::new().unwrap();
        opts.names.insert("listPets".to_string(), "pets".to_string());
        opts.names.insert("createPet".to_string(), "Pets".to_string());
        let err = build_registry(routes(), &opts).unwrap_err();
        assert!(matches!(err, OpenApiComponentsError::Config(_)));
        assert!(err.to_string().contains("pets"));
    }

    #[test]
    fn customize_rename_moves_the_uri() {
        let mut opts = BuildOptions::new().unwrap();
        opts.hooks = ComponentHooks::default().with_customize(|route, component| {
            if route.operation_id.as_deref() == Some("getPet") {
                component.name = "pet".to_string();
            }
        });
        let reg = build_registry(routes(), &opts).unwrap();
        let pet = reg.get("pet").unwrap();
        assert_eq!(pet.uri.as_deref(), Some("resource://pet/{id}"));
        let m = reg.find_resource("resource://pet/7").unwrap();
        assert_eq!(m.component.name, "pet");
    }

    #[test]
    fn customize_can_set_its_own_uri() {
        let mut opts = BuildOptions::new().unwrap();
        opts.hooks = ComponentHooks::default().with_customize(|route, component| {
            if route.operation_id.as_deref() == Some("listPets") {
                component.name = "pets".to_string();
                component.uri = Some("resource://zoo/pets".to_string());
            }
        });
        let reg = build_registry(routes(), &opts).unwrap();
        assert_eq!(
            reg.get("pets").unwrap().uri.as_deref(),
            Some("resource://zoo/pets")
        );
    }

    #[test]
    fn lone_catch_all_exclude_empties_the_registry() {
        let mut cfg = ApiServerConfig::new("spec.yaml");
        cfg.route_maps.push(RouteMapConfig {
            methods: vec!["*".to_string()],
            pattern: ".*".to_string(),
            tags: Vec::new(),
            route_type: RouteType::Exclude,
        });
        let opts = BuildOptions::from_config(&cfg, ComponentHooks::default()).unwrap();
        let mixed = routes().into_iter().chain([
            Route::new(HttpMethod::Put, "/pets/{id}").with_tags(["pets"]),
            Route::new(HttpMethod::Patch, "/pets/{id}"),
            Route::new(HttpMethod::Head, "/health"),
        ]);
        let reg = build_registry(mixed, &opts).unwrap();
        assert!(reg.is_empty());
    }

    #[test]
    fn customize_rename_onto_existing_name_fails() {
        let mut opts = BuildOptions::new().unwrap();
        opts.hooks = ComponentHooks::default().with_customize(|_, component| {
            component.name = "same".to_string();
        });
        let err = build_registry(routes(), &opts).unwrap_err();
        assert!(err.to_string().contains("Duplicate component name 'same'"));
    }
}
