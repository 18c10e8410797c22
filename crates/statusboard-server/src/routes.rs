//! HTTP routes
//!
//! | Method | Path       | Behaviour                                   |
//! |--------|------------|---------------------------------------------|
//! | GET    | `/`        | dashboard (login form without a session)    |
//! | POST   | `/login`   | check password, set session cookie          |
//! | POST   | `/logout`  | drop session, clear cookie                  |
//! | GET    | `/healthz` | `ok`                                        |

use crate::gate::{check_password, AccessContext, SessionStore, SESSION_COOKIE};
use crate::render::{render_dashboard, render_login};
use serde::Deserialize;
use statusboard_core::{Query, RowFilter, TableView};
use statusboard_upstream::{SnapshotCache, UpstreamSource};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use warp::http::header::SET_COOKIE;
use warp::http::{StatusCode, Uri};
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

const MAX_FORM_BYTES: u64 = 4 * 1024;

/// Shared state behind every route
#[derive(Clone)]
pub struct AppState {
    password: Arc<str>,
    sessions: Arc<SessionStore>,
    cache: SnapshotCache,
    source: Arc<dyn UpstreamSource>,
}

impl AppState {
    /// Create state
    #[must_use]
    pub fn new(
        password: impl Into<Arc<str>>,
        source: Arc<dyn UpstreamSource>,
        cache: SnapshotCache,
    ) -> Self {
        Self {
            password: password.into(),
            sessions: Arc::new(SessionStore::default()),
            cache,
            source,
        }
    }

    /// With a specific session store
    #[must_use]
    pub fn with_sessions(mut self, sessions: Arc<SessionStore>) -> Self {
        self.sessions = sessions;
        self
    }

    /// Session store
    #[inline]
    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("source", &self.source.identity())
            .field("sessions", &self.sessions.len())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default, Deserialize)]
struct DashboardParams {
    #[serde(default)]
    search: String,
    #[serde(default)]
    flag: String,
}

impl DashboardParams {
    fn into_query(self) -> Query {
        let flag = self.flag.parse().unwrap_or_else(|e| {
            debug!(error = %e, "ignoring unknown flag");
            RowFilter::None
        });
        Query::new(self.search, flag)
    }
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    #[serde(default)]
    password: String,
}

/// All routes, with request tracing
pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let with_state = warp::any().map(move || state.clone());
    let session = warp::cookie::optional::<String>(SESSION_COOKIE);

    let health = warp::get()
        .and(warp::path("healthz"))
        .and(warp::path::end())
        .map(|| "ok".into_response());

    let dashboard = warp::get()
        .and(warp::path::end())
        .and(session.clone())
        .and(warp::query::<DashboardParams>())
        .and(with_state.clone())
        .then(dashboard_page);

    let login = warp::post()
        .and(warp::path("login"))
        .and(warp::path::end())
        .and(warp::body::content_length_limit(MAX_FORM_BYTES))
        .and(warp::body::form::<LoginForm>())
        .and(with_state.clone())
        .map(submit_login);

    let logout = warp::post()
        .and(warp::path("logout"))
        .and(warp::path::end())
        .and(session)
        .and(with_state)
        .map(submit_logout);

    health
        .or(dashboard)
        .unify()
        .or(login)
        .unify()
        .or(logout)
        .unify()
        .with(warp::trace::request())
}

async fn dashboard_page(cookie: Option<String>, params: DashboardParams, state: AppState) -> Response {
    let ctx = AccessContext::from_cookie(cookie.as_deref());
    if !state.sessions.is_granted(&ctx) {
        return warp::reply::html(render_login(false)).into_response();
    }

    let query = params.into_query();
    let snapshot = state.cache.get_or_refresh(state.source.as_ref()).await;
    let view = TableView::Loaded(query.apply(&snapshot.table));
    warp::reply::html(render_dashboard(&snapshot, &query, &view)).into_response()
}

fn submit_login(form: LoginForm, state: AppState) -> Response {
    if !check_password(&form.password, &state.password) {
        warn!("wrong password submitted");
        return warp::reply::with_status(
            warp::reply::html(render_login(true)),
            StatusCode::UNAUTHORIZED,
        )
        .into_response();
    }

    let id = state.sessions.grant();
    let cookie = format!(
        "{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        state.sessions.lifetime().as_secs()
    );
    redirect_home(cookie)
}

fn submit_logout(cookie: Option<String>, state: AppState) -> Response {
    let ctx = AccessContext::from_cookie(cookie.as_deref());
    state.sessions.revoke(&ctx);
    info!("session closed");
    redirect_home(format!(
        "{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"
    ))
}

fn redirect_home(cookie: String) -> Response {
    warp::reply::with_header(
        warp::redirect::see_other(Uri::from_static("/")),
        SET_COOKIE,
        cookie,
    )
    .into_response()
}
