use axum::{
    Json,
    extract::{Request, State},
    http::{Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    AppState,
    auth::{SESSION_COOKIE, Session, resolve_session},
    models::Role,
};

/// Path of the login page anonymous callers are sent to.
pub const LOGIN_PATH: &str = "/auth/login";

// --- Error Envelope ---

/// ApiError
///
/// The single error-response contract for every denial produced by this
/// application: a status code plus a JSON body `{"error": ..., "code": ...}`.
/// Both the gate (401/403) and the handlers (404/409/...) respond through it,
/// so clients never see a mixed envelope shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub code: &'static str,
}

impl ApiError {
    pub fn unauthorized() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            error: "Authentication required".to_string(),
            code: "UNAUTHORIZED",
        }
    }

    pub fn forbidden() -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            error: "Forbidden".to_string(),
            code: "FORBIDDEN",
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            error: "Not found".to_string(),
            code: "NOT_FOUND",
        }
    }

    pub fn conflict(message: &str) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            error: message.to_string(),
            code: "CONFLICT",
        }
    }

    pub fn bad_request(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: message.to_string(),
            code: "BAD_REQUEST",
        }
    }

    pub fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: "Internal server error".to_string(),
            code: "INTERNAL",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "error": self.error,
            "code": self.code,
        }));
        (self.status, body).into_response()
    }
}

// --- Route Classification ---

/// RouteClass
///
/// Per-request categorization of the path, derived and discarded with the
/// request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Operational surface (health, API docs): never gated.
    Open,
    /// Anonymous-facing pages; signed-in callers are sent to their home area.
    PublicPage,
    AdminArea,
    TrainerArea,
    ClientArea,
    Api,
    /// Any other path: requires a session of any role.
    Protected,
}

// --- Policy ---

/// AccessRule
///
/// One static rule-table entry: requests whose path starts with `path_prefix`
/// and use `method` require at least `min_role`. First matching rule wins.
#[derive(Debug, Clone)]
pub struct AccessRule {
    pub path_prefix: &'static str,
    pub method: Method,
    pub min_role: Role,
}

/// UnmatchedApi
///
/// Outcome for authenticated API requests that match no rule. `Allow` keeps
/// every unlisted route open to any signed-in caller; `Deny` rejects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmatchedApi {
    Allow,
    Deny,
}

/// AccessPolicy
///
/// The complete, immutable gating configuration: the API rule table, the
/// public-path allow-lists and the unmatched-API default. Constructed once at
/// startup and carried in the application state; request handling never
/// mutates it.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    rules: Vec<AccessRule>,
    public_pages: Vec<&'static str>,
    public_api_prefixes: Vec<&'static str>,
    open_prefixes: Vec<&'static str>,
    unmatched_api: UnmatchedApi,
}

/// Matches `path` against `prefix` on path-segment boundaries, so
/// `/api/users` covers `/api/users` and `/api/users/{id}` but not
/// `/api/userstats`.
fn prefix_matches(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

impl AccessPolicy {
    pub fn new(rules: Vec<AccessRule>, unmatched_api: UnmatchedApi) -> Self {
        Self {
            rules,
            public_pages: vec![
                "/",
                LOGIN_PATH,
                "/auth/forgot-password",
                "/auth/reset-password",
                "/auth/activate",
            ],
            public_api_prefixes: vec![
                "/api/auth/login",
                "/api/auth/invite",
                "/api/auth/activate",
                "/api/auth/reset-password",
            ],
            open_prefixes: vec!["/health", "/swagger-ui", "/api-docs"],
            unmatched_api,
        }
    }

    /// The standing rule table. Entries are ordered; the first whose
    /// `(path_prefix, method)` matches a request decides its minimum role.
    pub fn standard(unmatched_api: UnmatchedApi) -> Self {
        let rules = vec![
            AccessRule { path_prefix: "/api/users", method: Method::POST, min_role: Role::Admin },
            AccessRule { path_prefix: "/api/users", method: Method::PUT, min_role: Role::Admin },
            AccessRule { path_prefix: "/api/users", method: Method::DELETE, min_role: Role::Admin },
            AccessRule { path_prefix: "/api/users", method: Method::GET, min_role: Role::Trainer },
            AccessRule { path_prefix: "/api/plans", method: Method::POST, min_role: Role::Trainer },
            AccessRule { path_prefix: "/api/plans", method: Method::PUT, min_role: Role::Trainer },
            AccessRule { path_prefix: "/api/plans", method: Method::DELETE, min_role: Role::Trainer },
            AccessRule { path_prefix: "/api/plans", method: Method::GET, min_role: Role::Client },
            AccessRule { path_prefix: "/api/exercises", method: Method::POST, min_role: Role::Trainer },
            AccessRule { path_prefix: "/api/exercises", method: Method::PUT, min_role: Role::Trainer },
            AccessRule { path_prefix: "/api/exercises", method: Method::DELETE, min_role: Role::Trainer },
            AccessRule { path_prefix: "/api/exercises", method: Method::GET, min_role: Role::Client },
        ];
        Self::new(rules, unmatched_api)
    }

    /// Fully public API endpoints. These bypass session resolution entirely
    /// and are checked before any other work on the request.
    pub fn is_public_api(&self, path: &str) -> bool {
        self.public_api_prefixes
            .iter()
            .any(|p| prefix_matches(path, p))
    }

    /// classify
    ///
    /// Pure path categorization. Public pages are an explicit allow-list;
    /// role areas are prefix-scoped; everything else that is not API or an
    /// open operational path requires some authenticated session.
    pub fn classify(&self, path: &str) -> RouteClass {
        if self.open_prefixes.iter().any(|p| prefix_matches(path, p)) {
            return RouteClass::Open;
        }
        if self.public_pages.contains(&path) {
            return RouteClass::PublicPage;
        }
        if prefix_matches(path, "/api") {
            return RouteClass::Api;
        }
        if prefix_matches(path, "/admin") {
            return RouteClass::AdminArea;
        }
        if prefix_matches(path, "/trainer") {
            return RouteClass::TrainerArea;
        }
        if prefix_matches(path, "/client") {
            return RouteClass::ClientArea;
        }
        RouteClass::Protected
    }

    /// First rule whose prefix and method match the request, if any.
    pub fn match_rule(&self, path: &str, method: &Method) -> Option<&AccessRule> {
        self.rules
            .iter()
            .find(|r| r.method == *method && prefix_matches(path, r.path_prefix))
    }
}

// --- Decision Logic ---

/// Decision
///
/// Terminal outcome of gate evaluation: let the request through, redirect it,
/// redirect it after clearing the session cookie, or reject it with the
/// uniform error envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(&'static str),
    SignOutRedirect(&'static str),
    Unauthorized,
    Forbidden,
}

/// evaluate
///
/// The complete allow/redirect/deny computation, as a pure function of the
/// policy, the request path and method, and the resolved session. Evaluating
/// the same inputs twice yields the same decision.
///
/// Two distinct role policies apply on purpose: API rules use the privilege
/// hierarchy ([`Role::satisfies`]), while role areas demand an exact role
/// match and bounce mismatched callers to `/`.
pub fn evaluate(policy: &AccessPolicy, path: &str, method: &Method, session: &Session) -> Decision {
    // Public API endpoints pass before any session consideration.
    if policy.is_public_api(path) {
        return Decision::Allow;
    }

    let class = policy.classify(path);
    if class == RouteClass::Open {
        return Decision::Allow;
    }

    let user = match session {
        Session::Anonymous => {
            return match class {
                RouteClass::PublicPage => Decision::Allow,
                RouteClass::Api => Decision::Unauthorized,
                _ => Decision::Redirect(LOGIN_PATH),
            };
        }
        // A valid token whose account or role no longer resolves must not
        // linger half-authenticated: drop the cookie and restart at login.
        Session::Revoked => return Decision::SignOutRedirect(LOGIN_PATH),
        Session::Authenticated(user) => user,
    };

    match class {
        RouteClass::Open => Decision::Allow,
        // Signed-in callers have no business on the anonymous pages; send
        // them to their role's landing area.
        RouteClass::PublicPage => Decision::Redirect(user.role.home_path()),
        RouteClass::Api => match policy.match_rule(path, method) {
            Some(rule) => {
                if user.role.satisfies(rule.min_role) {
                    Decision::Allow
                } else {
                    Decision::Forbidden
                }
            }
            None => match policy.unmatched_api {
                UnmatchedApi::Allow => Decision::Allow,
                UnmatchedApi::Deny => Decision::Forbidden,
            },
        },
        RouteClass::AdminArea => exact_area_match(user.role, Role::Admin),
        RouteClass::TrainerArea => exact_area_match(user.role, Role::Trainer),
        RouteClass::ClientArea => exact_area_match(user.role, Role::Client),
        RouteClass::Protected => Decision::Allow,
    }
}

/// Exact-match policy for role areas. An admin visiting `/client` is bounced
/// just like a client visiting `/admin`.
fn exact_area_match(caller: Role, area: Role) -> Decision {
    if caller == area {
        Decision::Allow
    } else {
        Decision::Redirect("/")
    }
}

// --- Gate Middleware ---

/// access_gate
///
/// Router-wide middleware that runs the full pipeline for every request:
/// public-API short-circuit, session resolution, decision evaluation, and
/// translation of the decision into a response. On `Allow` with a resolved
/// identity the `AuthUser` is stored in request extensions so handler
/// extractors do not resolve the session a second time.
pub async fn access_gate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    let method = request.method().clone();

    // Checked before any session lookup; these endpoints must work for
    // callers who cannot have a session yet.
    if state.policy.is_public_api(&path) {
        return next.run(request).await;
    }

    let session = resolve_session(request.headers(), &state.repo, &state.config).await;

    match evaluate(&state.policy, &path, &method, &session) {
        Decision::Allow => {
            if let Session::Authenticated(user) = session {
                request.extensions_mut().insert(user);
            }
            next.run(request).await
        }
        Decision::Redirect(target) => Redirect::to(target).into_response(),
        Decision::SignOutRedirect(target) => {
            tracing::warn!(path = %path, "session revoked, signing caller out");
            let mut response = Redirect::to(target).into_response();
            // Expire the session cookie so the stale token stops arriving.
            let cleared = format!("{}=; Path=/; Max-Age=0; HttpOnly", SESSION_COOKIE);
            if let Ok(value) = header::HeaderValue::from_str(&cleared) {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            response
        }
        Decision::Unauthorized => ApiError::unauthorized().into_response(),
        Decision::Forbidden => ApiError::forbidden().into_response(),
    }
}
