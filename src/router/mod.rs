//! Request routing: map URL patterns and HTTP methods to typed handler invocations.
//!
//! Routes are declared with a [`RouteDef`] and registered on a [`Router`] together
//! with the handler that serves them. Patterns use `{name}` placeholders:
//!
//! | Pattern            | Request path          | Arguments                         |
//! |--------------------|-----------------------|-----------------------------------|
//! | `/users`           | `/users`              | *(none)*                          |
//! | `/users/{id}`      | `/users/42`           | `id → 42` (when typed `Int`)      |
//! | `/users` + `page`  | `/users/3`            | `page → 3` (optional slot)        |
//! | *(catch-all)*      | anything              | *(none)*                          |
//!
//! Anything after the placeholder portion of a path is split on `/` or `|` and fed
//! to the route's optional parameter slots in order. Matching is case-insensitive
//! on the path and case-sensitive on the method.
//!
//! Routes are tried in registration order. Under [`MatchPolicy::First`] the first
//! match wins; under [`MatchPolicy::Last`] scanning continues and the last match
//! wins. When nothing matches, the default route (see [`Router::map_default`]) is
//! used, and failing that resolution ends with [`RouterError::NoRouteFound`].

use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::context::Context;
use crate::{Method, Request, Response};

pub mod error;
pub mod params;
pub mod pattern;
pub mod route;
pub mod table;

pub use error::RouterError;
pub use params::{Arguments, ParamType, ParamValue};
pub use pattern::CompiledPattern;
pub use route::{Route, RouteDef};
pub use table::HandlerRegistry;

/// Type-erased, heap-allocated async handler that processes a [`Context`] and returns a
/// [`Response`].
///
/// Handlers are stored behind `Arc<dyn Fn(…)>` so they can be cloned and shared across
/// threads without copying the underlying closure. Use [`Router::get`], [`Router::map`]
/// and friends rather than building one by hand.
pub type Handler =
    Arc<dyn Fn(Context) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync + 'static>;

/// Conversion trait for async handler functions.
///
/// Any `Fn(Context) -> impl Future<Output = Response> + Send` that is also
/// `Send + Sync + 'static` implements this trait automatically via the blanket impl
/// below.
pub trait IntoHandler: Send + Sync + 'static {
    /// Call the handler with the given context, boxing the returned future.
    fn call(&self, ctx: Context) -> Pin<Box<dyn Future<Output = Response> + Send>>;
}

impl<T, F> IntoHandler for T
where
    T: Fn(Context) -> F + Send + Sync + 'static,
    F: Future<Output = Response> + Send + 'static,
{
    fn call(&self, ctx: Context) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        Box::pin((self)(ctx))
    }
}

/// Erase the concrete handler type.
pub fn into_handler(handler: impl IntoHandler) -> Handler {
    Arc::new(move |ctx| handler.call(ctx))
}

/// Which route wins when several match the same request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// Stop at the first matching route in registration order.
    #[default]
    First,
    /// Keep scanning; the last matching route wins. Earlier specific routes are
    /// shadowed by later broader ones.
    Last,
}

/// A route selected for a request, with its typed arguments.
///
/// Produced fresh by every call to [`Router::resolve`]; the route itself is never
/// modified by matching.
#[derive(Debug)]
pub struct ResolvedRoute<'r> {
    route: &'r Route,
    arguments: Arguments,
    fallback: bool,
}

impl<'r> ResolvedRoute<'r> {
    pub fn route(&self) -> &'r Route {
        self.route
    }

    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    pub fn into_arguments(self) -> Arguments {
        self.arguments
    }

    /// `true` when the default route was used because nothing else matched.
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }
}

/// HTTP request router that resolves requests to registered handlers.
///
/// # Examples
///
/// ```rust,no_run
/// use watamelo::router::{ParamType, RouteDef, Router};
/// use watamelo::context::Context;
/// use watamelo::{Response, StatusCode};
///
/// # fn main() -> Result<(), watamelo::router::RouterError> {
/// let mut router = Router::new();
///
/// router.get(
///     RouteDef::new("/users/{id}", "users", "show").param("id", ParamType::Int),
///     |ctx: Context| async move {
///         let id = ctx.args().int("id").unwrap_or_default();
///         Response::new(StatusCode::Ok).body(id.to_string())
///     },
/// )?;
///
/// router.map_default("pages", "not_found", |_ctx| async {
///     Response::new(StatusCode::NotFound)
/// })?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
    default: Option<Route>,
    policy: MatchPolicy,
}

impl Router {
    /// Create a new, empty `Router` using [`MatchPolicy::First`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use watamelo::router::Router;
    ///
    /// let router = Router::new();
    /// assert!(router.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty router with the given tie-break policy.
    pub fn with_policy(policy: MatchPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Register `handler` for `method` requests matching `def`.
    ///
    /// # Errors
    ///
    /// Configuration errors from compiling and validating `def`:
    /// [`RouterError::InvalidPattern`], [`RouterError::DuplicateParameter`],
    /// [`RouterError::UnknownParameter`].
    pub fn map(
        &mut self,
        method: Method,
        def: RouteDef,
        handler: impl IntoHandler,
    ) -> Result<(), RouterError> {
        self.map_handler(Some(method), def, into_handler(handler))
    }

    pub(crate) fn map_handler(
        &mut self,
        method: Option<Method>,
        def: RouteDef,
        handler: Handler,
    ) -> Result<(), RouterError> {
        let route = Route::build(method, def, handler)?;
        debug!(route = %route, "route registered");
        self.routes.push(route);
        Ok(())
    }

    /// Register `handler` for `GET` requests matching `def`.
    pub fn get(&mut self, def: RouteDef, handler: impl IntoHandler) -> Result<(), RouterError> {
        self.map(Method::Get, def, handler)
    }

    /// Register `handler` for `POST` requests matching `def`.
    pub fn post(&mut self, def: RouteDef, handler: impl IntoHandler) -> Result<(), RouterError> {
        self.map(Method::Post, def, handler)
    }

    /// Register `handler` for `PUT` requests matching `def`.
    pub fn put(&mut self, def: RouteDef, handler: impl IntoHandler) -> Result<(), RouterError> {
        self.map(Method::Put, def, handler)
    }

    /// Register `handler` for `DELETE` requests matching `def`.
    pub fn delete(&mut self, def: RouteDef, handler: impl IntoHandler) -> Result<(), RouterError> {
        self.map(Method::Delete, def, handler)
    }

    /// Register `handler` for `PATCH` requests matching `def`.
    pub fn patch(&mut self, def: RouteDef, handler: impl IntoHandler) -> Result<(), RouterError> {
        self.map(Method::Patch, def, handler)
    }

    /// Register `handler` for `OPTIONS` requests matching `def`.
    pub fn options(&mut self, def: RouteDef, handler: impl IntoHandler) -> Result<(), RouterError> {
        self.map(Method::Options, def, handler)
    }

    /// Register the fallback route, used for any method and path when no other
    /// route matches.
    ///
    /// # Errors
    ///
    /// [`RouterError::DefaultAlreadySet`] if a default route exists already.
    pub fn map_default(
        &mut self,
        controller: impl Into<String>,
        action: impl Into<String>,
        handler: impl IntoHandler,
    ) -> Result<(), RouterError> {
        self.map_default_handler(RouteDef::catch_all(controller, action), into_handler(handler))
    }

    pub(crate) fn map_default_handler(
        &mut self,
        def: RouteDef,
        handler: Handler,
    ) -> Result<(), RouterError> {
        if let Some(existing) = &self.default {
            return Err(RouterError::DefaultAlreadySet {
                controller: existing.controller().to_owned(),
                action: existing.action().to_owned(),
            });
        }
        let route = Route::build(None, def, handler)?;
        debug!(route = %route, "default route registered");
        self.default = Some(route);
        Ok(())
    }

    /// Return the number of routes registered, not counting the default route.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Return `true` if no routes have been registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Registered routes in table order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn default_route(&self) -> Option<&Route> {
        self.default.as_ref()
    }

    /// Find the route serving `method` + `path` and extract its arguments.
    ///
    /// # Errors
    ///
    /// - [`RouterError::InvalidParameterValue`]: a route matched but one of its
    ///   values failed type coercion. Resolution stops there.
    /// - [`RouterError::NoRouteFound`]: nothing matched and there is no default.
    pub fn resolve(&self, method: &Method, path: &str) -> Result<ResolvedRoute<'_>, RouterError> {
        let mut found = None;

        for route in &self.routes {
            if let Some(arguments) = route.matches(method, path)? {
                found = Some(ResolvedRoute {
                    route,
                    arguments,
                    fallback: false,
                });
                if self.policy == MatchPolicy::First {
                    break;
                }
            }
        }

        if let Some(resolved) = found {
            debug!(%method, path, route = %resolved.route, "route matched");
            return Ok(resolved);
        }

        if let Some(route) = &self.default {
            debug!(%method, path, route = %route, "no route matched — using default route");
            if let Some(arguments) = route.matches(method, path)? {
                return Ok(ResolvedRoute {
                    route,
                    arguments,
                    fallback: true,
                });
            }
        }

        debug!(%method, path, "no route matched");
        Err(RouterError::NoRouteFound {
            method: method.to_string(),
            path: path.to_owned(),
        })
    }

    /// Resolve `request` by its own method and path and invoke the handler.
    ///
    /// # Errors
    ///
    /// Any error from [`resolve`](Self::resolve). Handler output is returned as-is.
    pub async fn dispatch(&self, request: Request) -> Result<Response, RouterError> {
        let path = request.path().to_owned();
        self.dispatch_path(request, &path).await
    }

    /// Like [`dispatch`](Self::dispatch), but route on `path` instead of the
    /// request's own path (e.g. after stripping a mount prefix).
    pub async fn dispatch_path(&self, request: Request, path: &str) -> Result<Response, RouterError> {
        let resolved = self.resolve(request.method(), path)?;
        let route = resolved.route();
        let ctx = Context::new(
            request,
            resolved.into_arguments(),
            route.controller(),
            route.action(),
        );
        Ok((route.handler)(ctx).await)
    }
}
