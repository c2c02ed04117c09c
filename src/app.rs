use std::net::SocketAddr;
use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;
use crate::state::AppState;
use crate::{auth, tasks};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(auth::router())
        .merge(tasks::router())
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().path().to_string();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, ?latency, "response");
                        } else {
                            tracing::info!(%status, ?latency, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, host: &str, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{
            header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
            Request, StatusCode,
        },
        response::Response,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    const FORM: &str = "application/x-www-form-urlencoded";

    async fn send(app: &Router, req: Request<Body>) -> Response {
        app.clone().oneshot(req).await.unwrap()
    }

    fn get(path: &str, cookie: Option<&str>) -> Request<Body> {
        let mut b = Request::builder().uri(path);
        if let Some(c) = cookie {
            b = b.header(COOKIE, c);
        }
        b.body(Body::empty()).unwrap()
    }

    fn post(path: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
        let mut b = Request::builder()
            .method("POST")
            .uri(path)
            .header(CONTENT_TYPE, FORM);
        if let Some(c) = cookie {
            b = b.header(COOKIE, c);
        }
        b.body(Body::from(body.to_string())).unwrap()
    }

    fn location(resp: &Response) -> String {
        resp.headers().get(LOCATION).unwrap().to_str().unwrap().to_string()
    }

    async fn json(resp: Response) -> Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Registers and logs in; returns the `name=value` cookie pair.
    async fn sign_up(app: &Router, username: &str, password: &str) -> String {
        let body = format!("username={username}&password={password}&confirm_password={password}");
        let resp = send(app, post("/register", None, &body)).await;
        assert!(location(&resp).starts_with("/login?notice="));

        let resp = send(app, post("/login", None, &format!("username={username}&password={password}"))).await;
        assert_eq!(location(&resp), "/");
        let set_cookie = resp.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(set_cookie.contains("HttpOnly"));
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = build_app(AppState::fake());
        let resp = send(&app, get("/health", None)).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn anonymous_requests_redirect_to_login() {
        let app = build_app(AppState::fake());
        for path in ["/", "/search?q=x", "/filter/done", "/toggle/abc", "/delete/abc"] {
            let resp = send(&app, get(path, None)).await;
            assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{path}");
            assert_eq!(location(&resp), "/login", "{path}");
        }
        let resp = send(&app, post("/add", None, "title=x")).await;
        assert_eq!(location(&resp), "/login");
        let resp = send(&app, post("/toggle_theme", Some("session=bogus"), "")).await;
        assert_eq!(location(&resp), "/login");
    }

    #[tokio::test]
    async fn alice_and_bob_scenario() {
        let app = build_app(AppState::fake());
        let alice = sign_up(&app, "alice", "s3cret").await;

        let resp = send(&app, post("/add", Some(&alice), "title=Buy+milk&priority=Low")).await;
        assert_eq!(location(&resp), "/");

        let list = json(send(&app, get("/", Some(&alice))).await).await;
        let id = list["tasks"][0]["id"].as_str().unwrap().to_string();
        let resp = send(&app, get(&format!("/toggle/{id}"), Some(&alice))).await;
        assert_eq!(location(&resp), "/");

        let list = json(send(&app, get("/", Some(&alice))).await).await;
        let tasks = list["tasks"].as_array().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0]["complete"], true);
        assert_eq!(tasks[0]["priority"], "Low");

        let bob = sign_up(&app, "bob", "hunter2").await;
        let list = json(send(&app, get("/", Some(&bob))).await).await;
        assert!(list["tasks"].as_array().unwrap().is_empty());

        let resp = send(&app, get(&format!("/toggle/{id}"), Some(&bob))).await;
        let forbidden = location(&resp);
        assert!(forbidden.starts_with("/?notice="));
        let resp = send(&app, get(&format!("/delete/{}", uuid::Uuid::new_v4()), Some(&bob))).await;
        assert_eq!(location(&resp), forbidden);

        let list = json(send(&app, get("/", Some(&alice))).await).await;
        assert_eq!(list["tasks"][0]["complete"], true);
    }

    #[tokio::test]
    async fn duplicate_and_bad_login_bounce_with_notice() {
        let app = build_app(AppState::fake());
        sign_up(&app, "alice", "s3cret").await;

        let resp = send(&app, post("/register", None, "username=alice&password=x")).await;
        assert!(location(&resp).starts_with("/register?notice="));

        let resp = send(&app, post("/register", None, "username=carol&password=a&confirm_password=b")).await;
        assert!(location(&resp).starts_with("/register?notice="));

        let wrong = location(&send(&app, post("/login", None, "username=alice&password=nope")).await);
        let unknown = location(&send(&app, post("/login", None, "username=zed&password=nope")).await);
        assert_eq!(wrong, unknown);
        assert!(wrong.starts_with("/login?notice="));
    }

    #[tokio::test]
    async fn search_filter_and_delete() {
        let app = build_app(AppState::fake());
        let alice = sign_up(&app, "alice", "s3cret").await;
        send(&app, post("/add", Some(&alice), "title=Buy+milk")).await;
        send(&app, post("/add", Some(&alice), "title=Rent&description=due+friday")).await;
        send(&app, post("/add", Some(&alice), "title=+++")).await;

        let found = json(send(&app, get("/search?q=friday", Some(&alice))).await).await;
        assert_eq!(found["tasks"].as_array().unwrap().len(), 1);
        assert_eq!(found["search_query"], "friday");

        let pending = json(send(&app, get("/filter/pending", Some(&alice))).await).await;
        assert_eq!(pending["tasks"].as_array().unwrap().len(), 2);
        assert_eq!(pending["status"], "pending");
        let done = json(send(&app, get("/filter/done", Some(&alice))).await).await;
        assert!(done["tasks"].as_array().unwrap().is_empty());

        let id = found["tasks"][0]["id"].as_str().unwrap().to_string();
        send(&app, get(&format!("/delete/{id}"), Some(&alice))).await;
        let all = json(send(&app, get("/filter/all", Some(&alice))).await).await;
        assert_eq!(all["tasks"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn bad_deadline_redirects_with_notice() {
        let app = build_app(AppState::fake());
        let alice = sign_up(&app, "alice", "s3cret").await;
        let resp = send(&app, post("/add", Some(&alice), "title=x&deadline=soon")).await;
        assert!(location(&resp).starts_with("/?notice="));
        let list = json(send(&app, get("/", Some(&alice))).await).await;
        assert!(list["tasks"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn theme_toggle_and_logout() {
        let app = build_app(AppState::fake());
        let alice = sign_up(&app, "alice", "s3cret").await;
        let list = json(send(&app, get("/", Some(&alice))).await).await;
        assert_eq!(list["theme"], "light");

        send(&app, post("/toggle_theme", Some(&alice), "")).await;
        let list = json(send(&app, get("/", Some(&alice))).await).await;
        assert_eq!(list["theme"], "dark");

        let resp = send(&app, get("/logout", Some(&alice))).await;
        assert_eq!(location(&resp), "/login");
        let resp = send(&app, get("/", Some(&alice))).await;
        assert_eq!(location(&resp), "/login");

        let resp = send(&app, post("/login", None, "username=alice&password=s3cret")).await;
        let again = resp.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        let again = again.split(';').next().unwrap().to_string();
        let list = json(send(&app, get("/", Some(&again))).await).await;
        assert_eq!(list["theme"], "dark");
    }
}
