//! In-process fake etcd serving the handful of HTTP calls the abort command makes.

use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use warp::Filter;
use warp::http::StatusCode;

const READY_KEY: &str = "/calico/v1/Ready";

#[derive(Debug)]
pub struct EtcdState {
    pub ready: Option<String>,
    pub ready_writes: Vec<String>,
    /// `Authorization` header of every Ready write, if one was sent.
    pub write_auth: Vec<Option<String>>,
    pub healthy: bool,
    pub reject_writes: bool,
}

impl EtcdState {
    /// A healthy server whose v1 Ready flag holds `ready`.
    pub fn with_ready(ready: Option<&str>) -> Self {
        EtcdState {
            ready: ready.map(str::to_string),
            ready_writes: Vec::new(),
            write_auth: Vec::new(),
            healthy: true,
            reject_writes: false,
        }
    }
}

type Shared = Arc<Mutex<EtcdState>>;

pub struct FakeEtcd {
    addr: SocketAddr,
    state: Shared,
}

impl FakeEtcd {
    /// Starts the server on an ephemeral port. Must be called inside a tokio runtime.
    pub fn start(state: EtcdState) -> Self {
        let state: Shared = Arc::new(Mutex::new(state));
        let shared = state.clone();
        let with_state = warp::any().map(move || shared.clone());

        let version = warp::get()
            .and(warp::path("version"))
            .and(warp::path::end())
            .map(|| {
                warp::reply::with_status(
                    warp::reply::json(&json!({"etcdserver": "3.5.9", "etcdcluster": "3.5.0"})),
                    StatusCode::OK,
                )
            });

        let health = warp::get()
            .and(warp::path("health"))
            .and(warp::path::end())
            .and(with_state.clone())
            .map(|state: Shared| {
                let healthy = state.lock().unwrap().healthy;
                let status = if healthy {
                    StatusCode::OK
                } else {
                    StatusCode::SERVICE_UNAVAILABLE
                };
                warp::reply::with_status(
                    warp::reply::json(&json!({"health": healthy.to_string()})),
                    status,
                )
            });

        let get_ready = warp::get()
            .and(warp::path!("v2" / "keys" / "calico" / "v1" / "Ready"))
            .and(with_state.clone())
            .map(|state: Shared| match state.lock().unwrap().ready.clone() {
                Some(value) => warp::reply::with_status(
                    warp::reply::json(&json!({
                        "action": "get",
                        "node": {"key": READY_KEY, "value": value, "modifiedIndex": 7, "createdIndex": 7}
                    })),
                    StatusCode::OK,
                ),
                None => warp::reply::with_status(
                    warp::reply::json(&json!({
                        "errorCode": 100, "message": "Key not found", "cause": READY_KEY, "index": 7
                    })),
                    StatusCode::NOT_FOUND,
                ),
            });

        let put_ready = warp::put()
            .and(warp::path!("v2" / "keys" / "calico" / "v1" / "Ready"))
            .and(warp::header::optional::<String>("authorization"))
            .and(warp::body::form())
            .and(with_state)
            .map(|auth: Option<String>, form: HashMap<String, String>, state: Shared| {
                let mut state = state.lock().unwrap();
                state.write_auth.push(auth);
                if state.reject_writes {
                    return warp::reply::with_status(
                        warp::reply::json(&json!({
                            "errorCode": 110,
                            "message": "The request requires user authentication",
                            "cause": "Insufficient credentials",
                            "index": 0
                        })),
                        StatusCode::UNAUTHORIZED,
                    );
                }
                let value = form.get("value").cloned().unwrap_or_default();
                state.ready_writes.push(value.clone());
                state.ready = Some(value.clone());
                warp::reply::with_status(
                    warp::reply::json(&json!({
                        "action": "set",
                        "node": {"key": READY_KEY, "value": value}
                    })),
                    StatusCode::OK,
                )
            });

        let routes = version.or(health).or(get_ready).or(put_ready);
        let (addr, server) = warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        FakeEtcd { addr, state }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ready(&self) -> Option<String> {
        self.state.lock().unwrap().ready.clone()
    }

    pub fn ready_writes(&self) -> Vec<String> {
        self.state.lock().unwrap().ready_writes.clone()
    }

    pub fn write_auth(&self) -> Vec<Option<String>> {
        self.state.lock().unwrap().write_auth.clone()
    }
}
