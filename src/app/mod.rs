//! The application: configuration plus route table, and the HTTP boundary that
//! turns routing outcomes into responses.
//!
//! The configured `base_path` is stripped before routing. Like route patterns it
//! matches ASCII case-insensitively, so `/SHOP/items/9` and `/shop/ITEMS/9` both
//! reach `/items/{id}` under a `/shop` mount.

use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::router::{HandlerRegistry, Router, RouterError};
use crate::{Request, Response, StatusCode};

/// A configured application ready to serve requests.
///
/// # Examples
///
/// ```rust
/// use watamelo::app::App;
/// use watamelo::config::AppConfig;
/// use watamelo::router::RouteDef;
/// use watamelo::{Response, StatusCode};
///
/// # fn main() -> Result<(), watamelo::router::RouterError> {
/// let config = AppConfig::default();
/// let mut router = App::router_for(&config);
/// router.get(RouteDef::new("/", "home", "index"), |_ctx| async {
///     Response::new(StatusCode::Ok).body("home")
/// })?;
/// let app = App::new(config, router);
/// assert_eq!(app.router().len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct App {
    config: AppConfig,
    router: Router,
}

impl App {
    pub fn new(config: AppConfig, router: Router) -> Self {
        Self { config, router }
    }

    /// An empty router using the match policy from `config`.
    pub fn router_for(config: &AppConfig) -> Router {
        Router::with_policy(config.match_policy)
    }

    /// Build the application from `config`, loading its route table (if any)
    /// against `handlers`.
    ///
    /// # Errors
    ///
    /// Any [`RouterError`] raised while loading or registering the route table.
    pub fn from_config(config: AppConfig, handlers: &HandlerRegistry) -> Result<Self, RouterError> {
        let mut router = Self::router_for(&config);
        if let Some(routes) = &config.routes {
            router.load_routes(routes, handlers)?;
        }
        Ok(Self::new(config, router))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Route `request` and produce its response.
    ///
    /// The configured `base_path` is stripped before routing; requests outside it
    /// get `404`. Routing errors become `404 Not Found` (no route),
    /// `400 Bad Request` (invalid parameter value) or `500`.
    pub async fn handle(&self, request: Request) -> Response {
        let start = Instant::now();
        let method = request.method().clone();
        let path = request.path().to_owned();

        let response = match self.routed_path(&path) {
            Some(routed) => {
                let routed = routed.to_owned();
                match self.router.dispatch_path(request, &routed).await {
                    Ok(response) => response,
                    Err(e) => error_response(&e),
                }
            }
            None => {
                warn!(%method, path = %path, base = self.config.mount_prefix(), "request outside base path");
                Response::new(StatusCode::NotFound).body("Not Found")
            }
        };

        let duration = start.elapsed();
        let status = response.status().as_u16();
        info!("{} {} - {} ({:?})", method, path, status, duration);

        response
    }

    // Path relative to the mount prefix, or `None` if `path` lies outside it.
    // The prefix compares ASCII case-insensitively, like route patterns.
    fn routed_path<'p>(&self, path: &'p str) -> Option<&'p str> {
        let prefix = self.config.mount_prefix();
        if prefix.is_empty() {
            return Some(path);
        }
        let head = path.get(..prefix.len())?;
        if !head.eq_ignore_ascii_case(prefix) {
            return None;
        }
        match &path[prefix.len()..] {
            "" => Some("/"),
            rest if rest.starts_with('/') => Some(rest),
            _ => None,
        }
    }
}

fn error_response(e: &RouterError) -> Response {
    match e {
        RouterError::NoRouteFound { .. } => Response::new(StatusCode::NotFound).body("Not Found"),
        RouterError::InvalidParameterValue { .. } => {
            warn!(error = %e, "rejecting request");
            Response::new(StatusCode::BadRequest).body(format!("Bad Request: {e}"))
        }
        other => {
            error!(error = %other, "routing failed");
            Response::new(StatusCode::InternalServerError).body("Internal Server Error")
        }
    }
}
