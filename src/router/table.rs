//! Declarative route tables.
//!
//! Besides registering routes in code, an application can describe its route
//! table in a JSON file and bind it to handlers registered by name:
//!
//! ```json
//! [
//!   { "method": "GET", "url": "/user/{id}", "controller": "users", "action": "show",
//!     "types": { "id": "int" },
//!     "optional": [ { "name": "tab", "default": "profile" } ],
//!     "additional": { "section": "admin" } },
//!   { "default": true, "controller": "pages", "action": "not_found" }
//! ]
//! ```
//!
//! `method` may be omitted to accept every method; `url` may be omitted (or `null`)
//! for a catch-all route. Entries are registered in file order.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use super::error::RouterError;
use super::params::{ParamType, ParamValue};
use super::route::RouteDef;
use super::{Handler, IntoHandler, Router, into_handler};
use crate::Method;

/// Handlers addressable by `(controller, action)`.
///
/// # Examples
///
/// ```rust
/// use watamelo::router::HandlerRegistry;
/// use watamelo::{Response, StatusCode};
///
/// let mut handlers = HandlerRegistry::new();
/// handlers.register("users", "show", |_ctx| async { Response::new(StatusCode::Ok) });
/// assert!(handlers.contains("users", "show"));
/// ```
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<(String, String), Handler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` to `controller.action`, replacing any previous binding.
    pub fn register(
        &mut self,
        controller: impl Into<String>,
        action: impl Into<String>,
        handler: impl IntoHandler,
    ) -> &mut Self {
        self.handlers
            .insert((controller.into(), action.into()), into_handler(handler));
        self
    }

    pub fn contains(&self, controller: &str, action: &str) -> bool {
        self.lookup(controller, action).is_some()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    fn lookup(&self, controller: &str, action: &str) -> Option<&Handler> {
        self.handlers
            .get(&(controller.to_owned(), action.to_owned()))
    }

    fn resolve(&self, controller: &str, action: &str) -> Result<Handler, RouterError> {
        self.lookup(controller, action)
            .map(Arc::clone)
            .ok_or_else(|| RouterError::UnknownHandler {
                controller: controller.to_owned(),
                action: action.to_owned(),
            })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RouteEntry {
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    url: Option<String>,
    controller: String,
    action: String,
    #[serde(default)]
    types: BTreeMap<String, String>,
    #[serde(default)]
    optional: Vec<OptionalEntry>,
    #[serde(default)]
    additional: BTreeMap<String, ParamValue>,
    #[serde(default)]
    default: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OptionalEntry {
    name: String,
    default: ParamValue,
}

impl RouteEntry {
    fn into_def(self) -> Result<RouteDef, RouterError> {
        let mut def = RouteDef::with_pattern(self.url, self.controller, self.action);
        for OptionalEntry { name, default } in self.optional {
            def = def.optional(name, default);
        }
        for (name, type_name) in self.types {
            let ty = ParamType::from_name(&type_name).ok_or_else(|| {
                RouterError::UnsupportedParameterType {
                    name: name.clone(),
                    type_name,
                }
            })?;
            def = def.param(name, ty);
        }
        for (name, value) in self.additional {
            def = def.additional(name, value);
        }
        Ok(def)
    }
}

impl Router {
    /// Register every route described by the JSON route table at `path`.
    ///
    /// Returns the number of entries registered (the default entry included).
    ///
    /// # Errors
    ///
    /// [`RouterError::RouteFileIo`] / [`RouterError::RouteFileFormat`] when the file
    /// cannot be read or parsed, plus every error of [`load_routes_str`](Self::load_routes_str).
    pub fn load_routes(
        &mut self,
        path: impl AsRef<Path>,
        handlers: &HandlerRegistry,
    ) -> Result<usize, RouterError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| RouterError::RouteFileIo {
            path: path.to_path_buf(),
            source,
        })?;
        let count = self.load_routes_str(&json, handlers)?;
        info!(path = %path.display(), routes = count, "route table loaded");
        Ok(count)
    }

    /// Register every route described by the JSON route table `json`.
    ///
    /// # Errors
    ///
    /// - [`RouterError::RouteFileFormat`]: not a valid route table.
    /// - [`RouterError::UnsupportedParameterType`]: a `types` entry names a type
    ///   outside `int`, `string`, `float`, `bool`.
    /// - [`RouterError::UnknownHandler`]: an entry names a handler missing from
    ///   `handlers`.
    /// - any registration error of [`Router::map`].
    pub fn load_routes_str(
        &mut self,
        json: &str,
        handlers: &HandlerRegistry,
    ) -> Result<usize, RouterError> {
        let entries: Vec<RouteEntry> = serde_json::from_str(json)?;
        let count = entries.len();

        for entry in entries {
            let handler = handlers.resolve(&entry.controller, &entry.action)?;
            if entry.default {
                let def = RouteDef::catch_all(entry.controller, entry.action);
                self.map_default_handler(def, handler)?;
                continue;
            }
            let method = entry
                .method
                .as_deref()
                .map(|m| m.parse::<Method>().unwrap_or_else(|never| match never {}));
            self.map_handler(method, entry.into_def()?, handler)?;
        }

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Response, StatusCode};

    fn registry() -> HandlerRegistry {
        let mut handlers = HandlerRegistry::new();
        handlers
            .register("users", "show", |_ctx| async { Response::new(StatusCode::Ok) })
            .register("users", "list", |_ctx| async { Response::new(StatusCode::Ok) })
            .register("pages", "missing", |_ctx| async {
                Response::new(StatusCode::NotFound)
            });
        handlers
    }

    const TABLE: &str = r#"[
        { "method": "GET", "url": "/user/{id}", "controller": "users", "action": "show",
          "types": { "id": "int" },
          "additional": { "section": "admin" } },
        { "method": "GET", "url": "/users", "controller": "users", "action": "list",
          "optional": [ { "name": "page", "default": 1 }, { "name": "sort", "default": "name" } ] },
        { "default": true, "controller": "pages", "action": "missing" }
    ]"#;

    #[test]
    fn registry_tracks_bindings() {
        let handlers = registry();
        assert_eq!(handlers.len(), 3);
        assert!(handlers.contains("users", "show"));
        assert!(!handlers.contains("users", "delete"));
    }

    #[test]
    fn loads_table_in_order() {
        let mut router = Router::new();
        let count = router.load_routes_str(TABLE, &registry()).unwrap();
        assert_eq!(count, 3);
        assert_eq!(router.len(), 2);
        assert!(router.default_route().is_some());

        let show = router.resolve(&Method::Get, "/user/12").unwrap();
        assert_eq!(show.arguments().int("id"), Some(12));
        assert_eq!(show.arguments().str("section"), Some("admin"));

        let list = router.resolve(&Method::Get, "/users/4|date").unwrap();
        assert_eq!(list.arguments().names().collect::<Vec<_>>(), vec!["page", "sort"]);
        assert_eq!(list.arguments().int("page"), Some(4));
        assert_eq!(list.arguments().str("sort"), Some("date"));

        assert!(router.resolve(&Method::Get, "/elsewhere").unwrap().is_fallback());
    }

    #[test]
    fn missing_method_accepts_any() {
        let mut router = Router::new();
        router
            .load_routes_str(
                r#"[{ "url": "/users", "controller": "users", "action": "list" }]"#,
                &registry(),
            )
            .unwrap();
        assert!(router.resolve(&Method::Delete, "/users").is_ok());
    }

    #[test]
    fn unsupported_type_is_a_configuration_error() {
        let mut router = Router::new();
        let err = router
            .load_routes_str(
                r#"[{ "url": "/user/{id}", "controller": "users", "action": "show",
                      "types": { "id": "array" } }]"#,
                &registry(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            RouterError::UnsupportedParameterType { name, type_name } if name == "id" && type_name == "array"
        ));
        assert!(!RouterError::UnsupportedParameterType {
            name: String::new(),
            type_name: String::new()
        }
        .is_client_error());
    }

    #[test]
    fn unknown_handler_is_rejected() {
        let mut router = Router::new();
        let err = router
            .load_routes_str(
                r#"[{ "url": "/x", "controller": "users", "action": "delete" }]"#,
                &registry(),
            )
            .unwrap_err();
        assert!(matches!(err, RouterError::UnknownHandler { action, .. } if action == "delete"));
    }

    #[test]
    fn malformed_table_is_rejected() {
        let mut router = Router::new();
        assert!(matches!(
            router.load_routes_str(r#"{ "not": "a list" }"#, &registry()),
            Err(RouterError::RouteFileFormat(_))
        ));
        assert!(matches!(
            router.load_routes_str(
                r#"[{ "url": "/x", "controller": "users", "action": "show", "verb": "GET" }]"#,
                &registry()
            ),
            Err(RouterError::RouteFileFormat(_))
        ));
    }

    #[test]
    fn missing_file_is_reported_with_path() {
        let mut router = Router::new();
        let err = router
            .load_routes("/nonexistent/watamelo/routes.json", &registry())
            .unwrap_err();
        assert!(matches!(err, RouterError::RouteFileIo { .. }));
        assert!(err.to_string().contains("/nonexistent/watamelo/routes.json"));
    }
}
