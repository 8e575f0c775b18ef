//! Route definitions and the per-route matcher.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use super::Handler;
use super::error::RouterError;
use super::params::{Arguments, ParamType, ParamValue};
use super::pattern::CompiledPattern;
use crate::Method;

/// Declarative description of a route, consumed by [`Router::map`](super::Router::map).
///
/// # Examples
///
/// ```
/// use watamelo::router::{ParamType, RouteDef};
///
/// let def = RouteDef::new("/user/{id}", "users", "show")
///     .param("id", ParamType::Int)
///     .optional("tab", "profile")
///     .additional("section", "admin");
/// ```
#[derive(Debug, Clone)]
pub struct RouteDef {
    pattern: Option<String>,
    controller: String,
    action: String,
    types: Vec<(String, ParamType)>,
    optional: Vec<(String, ParamValue)>,
    additional: Vec<(String, ParamValue)>,
}

impl RouteDef {
    /// A route matching `pattern`, handled by `controller`'s `action`.
    pub fn new(
        pattern: impl Into<String>,
        controller: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self::with_pattern(Some(pattern.into()), controller, action)
    }

    /// A route without a pattern: matches every path.
    pub fn catch_all(controller: impl Into<String>, action: impl Into<String>) -> Self {
        Self::with_pattern(None, controller, action)
    }

    pub(crate) fn with_pattern(
        pattern: Option<String>,
        controller: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            pattern,
            controller: controller.into(),
            action: action.into(),
            types: Vec::new(),
            optional: Vec::new(),
            additional: Vec::new(),
        }
    }

    /// Declare the type of a required or optional parameter. Undeclared required
    /// parameters are strings.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, ty: ParamType) -> Self {
        self.types.push((name.into(), ty));
        self
    }

    /// Append an optional parameter slot with its default value.
    #[must_use]
    pub fn optional(mut self, name: impl Into<String>, default: impl Into<ParamValue>) -> Self {
        self.optional.push((name.into(), default.into()));
        self
    }

    /// Attach a constant parameter that is always passed to the handler.
    #[must_use]
    pub fn additional(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.additional.push((name.into(), value.into()));
        self
    }
}

/// A registered route. Immutable once built.
pub struct Route {
    method: Option<Method>,
    pattern: CompiledPattern,
    controller: String,
    action: String,
    types: HashMap<String, ParamType>,
    optional: Vec<(String, ParamValue)>,
    additional: Vec<(String, ParamValue)>,
    pub(crate) handler: Handler,
}

impl Route {
    /// Compile and validate `def`. A `None` method accepts every method.
    pub(crate) fn build(
        method: Option<Method>,
        def: RouteDef,
        handler: Handler,
    ) -> Result<Self, RouterError> {
        let pattern = CompiledPattern::compile(def.pattern.as_deref())?;
        let label = def.pattern.as_deref().unwrap_or("*").to_owned();

        let mut seen: Vec<&str> = pattern.required().iter().map(String::as_str).collect();
        for (name, _) in def.optional.iter().chain(&def.additional) {
            if seen.contains(&name.as_str()) {
                return Err(RouterError::DuplicateParameter {
                    name: name.clone(),
                    route: label,
                });
            }
            seen.push(name);
        }

        let mut types = HashMap::with_capacity(def.types.len());
        for (name, ty) in def.types {
            let known = pattern.required().contains(&name)
                || def.optional.iter().any(|(n, _)| *n == name);
            if !known {
                return Err(RouterError::UnknownParameter { name, route: label });
            }
            types.insert(name, ty);
        }

        Ok(Self {
            method,
            pattern,
            controller: def.controller,
            action: def.action,
            types,
            optional: def.optional,
            additional: def.additional,
            handler,
        })
    }

    /// The method this route accepts; `None` for any method.
    pub fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    pub fn pattern(&self) -> &CompiledPattern {
        &self.pattern
    }

    pub fn controller(&self) -> &str {
        &self.controller
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    /// Required parameter names in pattern order.
    pub fn required(&self) -> &[String] {
        self.pattern.required()
    }

    /// Optional parameter names and defaults in declaration order.
    pub fn optional(&self) -> &[(String, ParamValue)] {
        &self.optional
    }

    pub fn additional(&self) -> &[(String, ParamValue)] {
        &self.additional
    }

    /// Declared type for `name`. Optional parameters fall back to the type of their
    /// default, everything else to `String`.
    pub fn param_type(&self, name: &str) -> ParamType {
        if let Some(ty) = self.types.get(name) {
            return *ty;
        }
        self.optional
            .iter()
            .find(|(n, _)| n == name)
            .map_or(ParamType::String, |(_, default)| default.param_type())
    }

    /// Try this route against a request.
    ///
    /// Returns `Ok(None)` when the method differs, the pattern does not match, or
    /// the path supplies more optional values than the route declares.
    ///
    /// # Errors
    ///
    /// [`RouterError::InvalidParameterValue`] when the path matches but a value
    /// fails type coercion.
    pub fn matches(&self, method: &Method, path: &str) -> Result<Option<Arguments>, RouterError> {
        if let Some(own) = &self.method {
            if own != method {
                return Ok(None);
            }
        }

        let Some(found) = self.pattern.captures(path) else {
            return Ok(None);
        };

        let required = self.pattern.required();
        let mut args =
            Arguments::with_capacity(required.len() + self.optional.len() + self.additional.len());

        for (index, name) in required.iter().enumerate() {
            let value = self.param_type(name).coerce(name, found.required(index))?;
            args.push(name.as_str(), value);
        }

        let supplied: Vec<&str> = found
            .suffix()
            .split(['/', '|'])
            .filter(|s| !s.is_empty())
            .collect();

        if supplied.len() > self.optional.len() {
            debug!(
                route = %self,
                supplied = supplied.len(),
                slots = self.optional.len(),
                "too many optional values — skipping route"
            );
            return Ok(None);
        }

        for (index, (name, default)) in self.optional.iter().enumerate() {
            let value = match supplied.get(index) {
                Some(raw) => self.param_type(name).coerce(name, raw)?,
                None => default.clone(),
            };
            args.push(name.as_str(), value);
        }

        for (name, value) in &self.additional {
            args.push(name.as_str(), value.clone());
        }

        Ok(Some(args))
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let method = self.method.as_ref().map_or("*", Method::as_str);
        let pattern = self.pattern.source().unwrap_or("*");
        write!(f, "{method} {pattern} → {}.{}", self.controller, self.action)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern.source())
            .field("controller", &self.controller)
            .field("action", &self.action)
            .field("optional", &self.optional)
            .field("additional", &self.additional)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::into_handler;
    use crate::{Response, StatusCode};

    fn noop() -> Handler {
        into_handler(|_ctx| async { Response::new(StatusCode::Ok) })
    }

    fn route(def: RouteDef) -> Route {
        Route::build(Some(Method::Get), def, noop()).unwrap()
    }

    #[test]
    fn string_parameter_by_default() {
        let r = route(RouteDef::new("/a/{x}", "c", "a"));
        let args = r.matches(&Method::Get, "/a/42").unwrap().unwrap();
        assert_eq!(args.get("x"), Some(&ParamValue::Str("42".into())));
    }

    #[test]
    fn int_parameter_is_coerced() {
        let r = route(RouteDef::new("/a/{x}", "c", "a").param("x", ParamType::Int));
        let args = r.matches(&Method::Get, "/a/42").unwrap().unwrap();
        assert_eq!(args.get("x"), Some(&ParamValue::Int(42)));
    }

    #[test]
    fn invalid_int_is_an_error_not_a_miss() {
        let r = route(RouteDef::new("/a/{x}", "c", "a").param("x", ParamType::Int));
        assert!(matches!(
            r.matches(&Method::Get, "/a/notanumber"),
            Err(RouterError::InvalidParameterValue { name, .. }) if name == "x"
        ));
    }

    #[test]
    fn method_mismatch_is_a_miss() {
        let r = route(RouteDef::new("/a", "c", "a"));
        assert!(r.matches(&Method::Post, "/a").unwrap().is_none());
    }

    #[test]
    fn method_compare_is_case_sensitive() {
        let r = route(RouteDef::new("/a", "c", "a"));
        let lower: Method = "get".parse().unwrap();
        assert!(r.matches(&lower, "/a").unwrap().is_none());
    }

    #[test]
    fn any_method_route_accepts_everything() {
        let r = Route::build(None, RouteDef::new("/a", "c", "a"), noop()).unwrap();
        assert!(r.matches(&Method::Delete, "/a").unwrap().is_some());
    }

    #[test]
    fn optional_slots_fill_in_order_then_defaults() {
        let r = route(
            RouteDef::new("/list", "c", "a")
                .optional("page", 1)
                .optional("sort", "name")
                .optional("desc", false),
        );

        let args = r.matches(&Method::Get, "/list/3|date").unwrap().unwrap();
        assert_eq!(args.names().collect::<Vec<_>>(), vec!["page", "sort", "desc"]);
        assert_eq!(args.int("page"), Some(3));
        assert_eq!(args.str("sort"), Some("date"));
        assert_eq!(args.bool("desc"), Some(false));

        let args = r.matches(&Method::Get, "/list").unwrap().unwrap();
        assert_eq!(args.int("page"), Some(1));
    }

    #[test]
    fn trailing_slash_supplies_no_optional_value() {
        let r = route(RouteDef::new("/list", "c", "a").optional("page", 1));
        let args = r.matches(&Method::Get, "/list/").unwrap().unwrap();
        assert_eq!(args.int("page"), Some(1));
    }

    #[test]
    fn optional_overflow_is_a_miss() {
        let r = route(RouteDef::new("/a", "c", "a").optional("x", 0));
        assert!(r.matches(&Method::Get, "/a/1").unwrap().is_some());
        assert!(r.matches(&Method::Get, "/a/1/2").unwrap().is_none());
    }

    #[test]
    fn optional_value_uses_declared_type() {
        let r = route(
            RouteDef::new("/a", "c", "a")
                .optional("flag", "no")
                .param("flag", ParamType::Bool),
        );
        let args = r.matches(&Method::Get, "/a/yes").unwrap().unwrap();
        assert_eq!(args.bool("flag"), Some(true));
        assert!(r.matches(&Method::Get, "/a/perhaps").is_err());
    }

    #[test]
    fn additional_parameters_always_merged_last() {
        let r = route(
            RouteDef::new("/u/{id}", "c", "a")
                .optional("tab", "main")
                .additional("section", "admin"),
        );
        let args = r.matches(&Method::Get, "/u/9").unwrap().unwrap();
        assert_eq!(args.names().collect::<Vec<_>>(), vec!["id", "tab", "section"]);
        assert_eq!(args.str("section"), Some("admin"));
    }

    #[test]
    fn required_order_matches_pattern_order() {
        let r = route(RouteDef::new("/p/{id}/{slug}", "c", "a").param("id", ParamType::Int));
        let args = r.matches(&Method::Get, "/p/7/hello").unwrap().unwrap();
        let pairs: Vec<_> = args.iter().map(|(n, v)| (n.to_owned(), v.clone())).collect();
        assert_eq!(
            pairs,
            vec![
                ("id".to_owned(), ParamValue::Int(7)),
                ("slug".to_owned(), ParamValue::Str("hello".into())),
            ]
        );
    }

    #[test]
    fn catch_all_has_no_parameters() {
        let r = route(RouteDef::catch_all("c", "a"));
        let args = r.matches(&Method::Get, "/whatever/1/2").unwrap().unwrap();
        assert!(args.is_empty());
    }

    #[test]
    fn duplicate_names_across_kinds_are_rejected() {
        let err = Route::build(
            None,
            RouteDef::new("/a/{x}", "c", "a").optional("x", 1),
            noop(),
        )
        .unwrap_err();
        assert!(matches!(err, RouterError::DuplicateParameter { .. }));
    }

    #[test]
    fn type_for_unknown_parameter_is_rejected() {
        let err = Route::build(
            None,
            RouteDef::new("/a/{x}", "c", "a").param("y", ParamType::Int),
            noop(),
        )
        .unwrap_err();
        assert!(matches!(err, RouterError::UnknownParameter { name, .. } if name == "y"));
    }

    #[test]
    fn display_describes_route() {
        let r = route(RouteDef::new("/a/{x}", "users", "show"));
        assert_eq!(r.to_string(), "GET /a/{x} → users.show");
    }
}
