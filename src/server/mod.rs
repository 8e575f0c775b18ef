//! Async TCP server using Tokio.
//!
//! Accepts TCP connections and hands every parsed HTTP/1.1 request to an [`App`].
//! Connections are persistent (keep-alive) unless the client asks otherwise.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::app::App;
use crate::http::{
    StatusCode,
    request::{Request, RequestError},
    response::Response,
};

/// Errors produced by the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Initial read buffer capacity per connection.
const INITIAL_BUF_SIZE: usize = 4096;

/// The watamelo HTTP server.
///
/// # Examples
///
/// ```rust,no_run
/// use watamelo::app::App;
/// use watamelo::config::AppConfig;
/// use watamelo::router::HandlerRegistry;
/// use watamelo::server::Server;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = AppConfig::load("config/app.json")?;
///     let app = App::from_config(config, &HandlerRegistry::new())?;
///     let server = Server::bind(&app.config().bind).await?;
///     server.serve(app).await?;
///     Ok(())
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Server {
    /// Binds the server to the given TCP address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound
    /// (e.g. port already in use, insufficient permissions).
    pub async fn bind(addr: impl AsRef<str>) -> Result<Self, ServerError> {
        let addr = addr.as_ref();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.to_owned(),
                source: e,
            })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections forever, serving each request through `app`.
    ///
    /// The app is shared read-only by every connection task.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`] if the TCP listener itself fails.
    pub async fn serve(self, app: App) -> Result<(), ServerError> {
        let app = Arc::new(app);
        info!(
            address = %self.local_addr,
            routes = app.router().len(),
            "watamelo listening"
        );

        loop {
            let (stream, peer_addr) = match self.listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            debug!(peer = %peer_addr, "connection accepted");
            let app = Arc::clone(&app);

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, peer_addr, app).await {
                    warn!(peer = %peer_addr, error = %e, "connection closed with error");
                }
            });
        }
    }
}

// Serve requests on one connection until the peer closes it or opts out of
// keep-alive.
async fn handle_connection(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    app: Arc<App>,
) -> Result<(), std::io::Error> {
    let max_request_bytes = app.config().max_request_bytes;
    let mut buf = BytesMut::with_capacity(INITIAL_BUF_SIZE);
    // A pipelined request may already be buffered; only read when it is not.
    let mut need_read = true;

    loop {
        if need_read && stream.read_buf(&mut buf).await? == 0 {
            debug!(peer = %peer_addr, "connection closed by peer");
            break;
        }
        need_read = true;

        if buf.len() > max_request_bytes {
            warn!(peer = %peer_addr, limit = max_request_bytes, "request too large — sending 413");
            reject(&mut stream, StatusCode::PayloadTooLarge, "Request entity too large").await?;
            break;
        }

        let (request, body_offset) = match Request::parse(&buf) {
            Ok(pair) => pair,
            Err(RequestError::Incomplete) => continue,
            Err(e) => {
                warn!(peer = %peer_addr, error = %e, "bad request — sending 400");
                reject(&mut stream, StatusCode::BadRequest, &format!("Bad Request: {e}")).await?;
                break;
            }
        };

        let declared = body_offset.checked_add(request.content_length().unwrap_or(0));
        let total_needed = match declared {
            Some(total) if total <= max_request_bytes => total,
            _ => {
                warn!(peer = %peer_addr, limit = max_request_bytes, "declared body too large — sending 413");
                reject(&mut stream, StatusCode::PayloadTooLarge, "Request entity too large").await?;
                break;
            }
        };
        if buf.len() < total_needed {
            continue;
        }

        // Trim the body to this request so pipelined bytes stay in the buffer.
        let frame = buf.split_to(total_needed).freeze();
        let request = request.with_body(frame.slice(body_offset..));
        let keep_alive = request.is_keep_alive();
        need_read = buf.is_empty();

        debug!(
            peer = %peer_addr,
            method = %request.method(),
            path = %request.path(),
            "dispatching request"
        );

        let response = app.handle(request).await.keep_alive(keep_alive);
        stream.write_all(&response.into_bytes()).await?;
        stream.flush().await?;

        if !keep_alive {
            debug!(peer = %peer_addr, "Connection: close — shutting down");
            break;
        }
    }

    Ok(())
}

async fn reject(stream: &mut TcpStream, status: StatusCode, message: &str) -> std::io::Result<()> {
    let response = Response::new(status).body(message).keep_alive(false);
    stream.write_all(&response.into_bytes()).await
}
