//! Request gate: public-path allowlist, session verification and a static role table.

use axum::{
    extract::{FromRef, Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, warn};

use crate::{
    auth::{cookies::SESSION_COOKIE, extractors::Identity, jwt::JwtKeys},
    error::AppError,
    state::AppState,
    store::Role,
};

use PathMatch::{Exact, Prefix, Section};

const PUBLIC_PATHS: &[&str] = &[
    "/",
    "/login",
    "/register",
    "/pricing",
    "/auth/magic-link",
    "/dashboard/unauthorized",
    "/dashboard/error",
    "/api/health",
    "/api/auth/send-magic-link",
    "/api/auth/verify-magic-link",
    "/api/auth/logout",
    "/api/payment/webhook",
];

const PUBLIC_PREFIXES: &[&str] = &["/_next", "/favicon.ico", "/public"];

const LOGIN_PATH: &str = "/login";
const UNAUTHORIZED_PATH: &str = "/dashboard/unauthorized";

#[derive(Debug, Clone, Copy)]
enum PathMatch {
    Exact(&'static str),
    Prefix(&'static str),
    /// The path itself or anything below it, split on `/`.
    Section(&'static str),
}

impl PathMatch {
    fn matches(self, path: &str) -> bool {
        match self {
            PathMatch::Exact(p) => path == p,
            PathMatch::Prefix(p) => path.starts_with(p),
            PathMatch::Section(p) => path
                .strip_prefix(p)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/')),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    Any,
    Get,
    Post,
    Patch,
}

impl Verb {
    fn allows(self, method: &Method) -> bool {
        match self {
            Verb::Any => true,
            Verb::Get => method == Method::GET || method == Method::HEAD,
            Verb::Post => method == Method::POST,
            Verb::Patch => method == Method::PATCH,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Who {
    Anyone,
    Only(Role),
}

struct Rule {
    path: PathMatch,
    verb: Verb,
    who: Who,
}

const fn rule(path: PathMatch, verb: Verb, who: Who) -> Rule {
    Rule { path, verb, who }
}

/// First rule whose path and verb match decides.
const RULES: &[Rule] = &[
    rule(Section("/dashboard/admin"), Verb::Any, Who::Only(Role::Admin)),
    rule(Section("/dashboard/teacher"), Verb::Any, Who::Only(Role::Teacher)),
    rule(Section("/dashboard/student"), Verb::Any, Who::Only(Role::Student)),
    rule(Prefix("/course/"), Verb::Get, Who::Anyone),
    rule(Exact("/payment/success"), Verb::Get, Who::Anyone),
    rule(Exact("/subscription/status"), Verb::Get, Who::Anyone),
    rule(Exact("/api/auth/me"), Verb::Get, Who::Anyone),
    rule(Exact("/api/courses"), Verb::Get, Who::Anyone),
    rule(Exact("/api/courses"), Verb::Post, Who::Only(Role::Teacher)),
    rule(Prefix("/api/courses/"), Verb::Patch, Who::Only(Role::Teacher)),
    rule(Exact("/api/users/roles"), Verb::Post, Who::Only(Role::Admin)),
    rule(Exact("/api/users/invite"), Verb::Post, Who::Only(Role::Admin)),
    rule(Exact("/api/ai/recommendations"), Verb::Get, Who::Only(Role::Student)),
    rule(Prefix("/api/payment/"), Verb::Post, Who::Anyone),
    rule(Exact("/api/subscription/status"), Verb::Get, Who::Anyone),
    rule(Exact("/api/access/activate"), Verb::Get, Who::Anyone),
    rule(Exact("/api/access/tokens"), Verb::Get, Who::Anyone),
    rule(Exact("/api/access/issue"), Verb::Post, Who::Only(Role::Admin)),
    rule(Exact("/api/access/revoke"), Verb::Post, Who::Only(Role::Admin)),
];

pub(crate) fn is_public(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path) || PUBLIC_PREFIXES.iter().any(|p| path.starts_with(p))
}

fn is_api(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

/// `true` when some rule lets `role` call `method path`. No matching rule means no.
pub(crate) fn is_allowed(path: &str, method: &Method, role: Role) -> bool {
    RULES
        .iter()
        .find(|r| r.path.matches(path) && r.verb.allows(method))
        .is_some_and(|r| match r.who {
            Who::Anyone => true,
            Who::Only(required) => required == role,
        })
}

/// Middleware wrapping every route and the fallback.
pub async fn enforce(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    if is_public(&path) {
        return next.run(req).await;
    }

    let keys = JwtKeys::from_ref(&state);
    let jar = CookieJar::from_headers(req.headers());
    let claims = jar
        .get(SESSION_COOKIE)
        .and_then(|c| keys.verify_session(c.value()));

    let Some(claims) = claims else {
        debug!(path = %path, "no valid session");
        return if is_api(&path) {
            AppError::unauthorized("Authentication required").into_response()
        } else {
            Redirect::temporary(LOGIN_PATH).into_response()
        };
    };
    let identity = Identity::from(claims);

    if path == "/dashboard" || path == "/dashboard/" {
        return Redirect::temporary(identity.role.dashboard_path()).into_response();
    }

    if !is_allowed(&path, req.method(), identity.role) {
        warn!(path = %path, method = %req.method(), role = %identity.role, user_id = %identity.user_id, "access denied");
        return if is_api(&path) {
            AppError::forbidden("Forbidden").into_response()
        } else {
            Redirect::temporary(UNAUTHORIZED_PATH).into_response()
        };
    }

    req.extensions_mut().insert(identity);
    next.run(req).await
}
