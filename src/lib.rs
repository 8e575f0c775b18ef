//! # watamelo
//!
//! The core of a small MVC web framework: declarative, typed URL routing over an
//! async HTTP/1.1 server.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use watamelo::app::App;
//! use watamelo::config::AppConfig;
//! use watamelo::context::Context;
//! use watamelo::router::{ParamType, RouteDef};
//! use watamelo::server::Server;
//! use watamelo::{Response, StatusCode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::default();
//!     let mut router = App::router_for(&config);
//!
//!     router.get(
//!         RouteDef::new("/user/{id}", "users", "show").param("id", ParamType::Int),
//!         |ctx: Context| async move {
//!             let id = ctx.args().int("id").unwrap_or_default();
//!             Response::new(StatusCode::Ok).body(format!("user #{id}"))
//!         },
//!     )?;
//!     router.map_default("pages", "not_found", |_ctx| async {
//!         Response::new(StatusCode::NotFound).body("nothing here")
//!     })?;
//!
//!     let server = Server::bind(&config.bind).await?;
//!     server.serve(App::new(config, router)).await?;
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod config;
pub mod context;
pub mod http;
pub mod router;
pub mod server;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use router::{Router, RouterError};
pub use server::{Server, ServerError};
