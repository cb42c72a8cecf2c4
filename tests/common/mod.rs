//! Fake upstream and image hosts shared by the integration tests
#![allow(dead_code)]

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use posterkit::StudioConfig;
use std::io::Read;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tiny_http::{Header, Response, Server};

#[derive(Debug, Clone)]
pub struct Seen {
    pub url: String,
    pub api_key: Option<String>,
    pub body: String,
}

/// A server on an ephemeral port that answers every request the same way
pub struct FakeHost {
    pub base: String,
    hits: Arc<AtomicUsize>,
    pub seen: Arc<Mutex<Vec<Seen>>>,
}

impl FakeHost {
    pub fn start(status: u16, content_type: &str, body: Vec<u8>) -> Self {
        let server = Server::http("127.0.0.1:0").unwrap();
        let port = server.server_addr().to_ip().unwrap().port();
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let content_type = content_type.to_string();

        let (h, s) = (hits.clone(), seen.clone());
        std::thread::spawn(move || {
            for mut request in server.incoming_requests() {
                h.fetch_add(1, Ordering::SeqCst);
                let mut text = String::new();
                let _ = request.as_reader().read_to_string(&mut text);
                let api_key = request
                    .headers()
                    .iter()
                    .find(|hd| hd.field.equiv("x-goog-api-key"))
                    .map(|hd| hd.value.as_str().to_string());
                s.lock().unwrap().push(Seen {
                    url: request.url().to_string(),
                    api_key,
                    body: text,
                });
                let resp = Response::from_data(body.clone())
                    .with_status_code(status)
                    .with_header(Header::from_bytes("Content-Type", content_type.as_bytes()).unwrap());
                let _ = request.respond(resp);
            }
        });

        FakeHost {
            base: format!("http://127.0.0.1:{}", port),
            hits,
            seen,
        }
    }

    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self::start(status, "application/json", body.to_string().into_bytes())
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn last_body(&self) -> serde_json::Value {
        let seen = self.seen.lock().unwrap();
        serde_json::from_str(&seen.last().unwrap().body).unwrap()
    }
}

pub fn image_answer(bytes: &[u8]) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{
            "content": {
                "parts": [
                    { "text": "Aquí está tu imagen" },
                    { "inlineData": { "mimeType": "image/png", "data": BASE64.encode(bytes) } }
                ]
            }
        }]
    })
}

pub fn config_for(upstream: &FakeHost) -> StudioConfig {
    StudioConfig {
        api_key: Some("test-key".into()),
        api_key_env: vec![],
        endpoint: upstream.base.clone(),
        timeout_ms: 5_000,
        ..Default::default()
    }
}

