//! A scripted stand-in for the remote API, served by a real `actix-web`
//! server on a random local port.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use actix_web::dev::ServerHandle;
use actix_web::http::StatusCode;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};

use crate::config::ApiConfig;

pub const TOKEN: &str = "test-token";
pub const ORG: &str = "org-1";

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: Option<serde_json::Value>,
}

#[derive(Default)]
struct Script {
    routes: HashMap<(String, String), VecDeque<(u16, String)>>,
    requests: Vec<RecordedRequest>,
}

pub struct MockApi {
    script: web::Data<Mutex<Script>>,
    handle: ServerHandle,
    base: String,
}

impl MockApi {
    pub async fn start() -> Self {
        let script = web::Data::new(Mutex::new(Script::default()));
        let app_script = script.clone();

        let server = HttpServer::new(move || {
            App::new()
                .app_data(app_script.clone())
                .default_service(web::to(dispatch))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .expect("bind mock API");

        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        actix_web::rt::spawn(server);

        Self {
            script,
            handle,
            base: format!("http://{}/v1/", addr),
        }
    }

    pub fn config(&self) -> ApiConfig {
        ApiConfig::new(&self.base, TOKEN, ORG).expect("mock config")
    }

    /// Queue a response for `method path`. Responses are served in order and
    /// the last one repeats.
    pub fn respond(&self, method: &str, path: &str, code: u16, body: serde_json::Value) {
        let body = if body.is_null() {
            String::new()
        } else {
            body.to_string()
        };
        self.script
            .lock()
            .expect("script lock")
            .routes
            .entry((method.to_string(), format!("/v1/organizations/{}/{}", ORG, path)))
            .or_default()
            .push_back((code, body));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.script.lock().expect("script lock").requests.clone()
    }

    pub fn requests_to(&self, method: &str, path: &str) -> Vec<RecordedRequest> {
        let full = format!("/v1/organizations/{}/{}", ORG, path);
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == full)
            .collect()
    }

    pub async fn stop(self) {
        self.handle.stop(false).await;
    }
}

async fn dispatch(
    req: HttpRequest,
    body: web::Bytes,
    script: web::Data<Mutex<Script>>,
) -> HttpResponse {
    let mut script = script.lock().expect("script lock");
    let method = req.method().to_string();
    let path = req.path().to_string();

    script.requests.push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        authorization: req
            .headers()
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string()),
        body: serde_json::from_slice(&body).ok(),
    });

    let scripted = script.routes.get_mut(&(method, path.clone())).and_then(|queue| {
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    });

    match scripted {
        Some((code, body)) => {
            HttpResponse::build(StatusCode::from_u16(code).unwrap_or(StatusCode::IM_A_TEAPOT))
                .content_type("application/json")
                .body(body)
        }
        None => HttpResponse::NotFound()
            .content_type("application/json")
            .body(serde_json::json!({ "detail": format!("no route for {}", path) }).to_string()),
    }
}
