//! Per-request handler context.
//!
//! A [`Context`] is built by the router once a route has been resolved. It carries
//! the request itself, the typed arguments extracted by the matcher, and the
//! controller/action labels of the route that was selected.

use crate::Request;
use crate::router::{Arguments, ParamValue};

/// Everything a handler receives for one request.
#[derive(Debug)]
pub struct Context {
    request: Request,
    args: Arguments,
    controller: String,
    action: String,
}

impl Context {
    /// Create a context for `request` resolved to `controller.action`.
    pub fn new(
        request: Request,
        args: Arguments,
        controller: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            request,
            args,
            controller: controller.into(),
            action: action.into(),
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Arguments in the route's declared order.
    pub fn args(&self) -> &Arguments {
        &self.args
    }

    /// Shorthand for `self.args().get(name)`.
    pub fn arg(&self, name: &str) -> Option<&ParamValue> {
        self.args.get(name)
    }

    pub fn controller(&self) -> &str {
        &self.controller
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    /// Decode the request body as JSON.
    pub fn json<T>(&self) -> Result<T, serde_json::Error>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_slice(self.request.body())
    }

    /// Take the request back, e.g. to forward it elsewhere.
    pub fn into_request(self) -> Request {
        self.request
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Login {
        user: String,
    }

    fn context(raw: &[u8]) -> Context {
        let (request, _) = Request::parse(raw).unwrap();
        Context::new(request, Arguments::new(), "auth", "login")
    }

    #[test]
    fn exposes_route_labels() {
        let ctx = context(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n");
        assert_eq!(ctx.controller(), "auth");
        assert_eq!(ctx.action(), "login");
        assert!(ctx.args().is_empty());
        assert!(ctx.arg("id").is_none());
    }

    #[test]
    fn decodes_json_body() {
        let ctx = context(
            b"POST /login HTTP/1.1\r\nHost: localhost\r\nContent-Length: 14\r\n\r\n{\"user\":\"ann\"}",
        );
        let login: Login = ctx.json().unwrap();
        assert_eq!(login, Login { user: "ann".into() });
        assert_eq!(ctx.into_request().path(), "/login");
    }
}
