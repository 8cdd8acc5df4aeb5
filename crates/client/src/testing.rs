//! In-process `Network` for worker tests.

use async_trait::async_trait;
use bgsw_core::Error;
use bytes::Bytes;
use reqwest::{StatusCode, header};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::fetch::{FetchRequest, FetchResponse, Network};

enum Route {
    Respond { status: u16, body: &'static str, headers: Vec<(&'static str, &'static str)> },
    Fail,
}

/// Answers from a fixed route table and records every request it sees.
#[derive(Default)]
pub struct StubNetwork {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<Vec<String>>,
}

impl StubNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, url: &str, status: u16, body: &'static str) -> Self {
        self.respond_with_headers(url, status, body, Vec::new())
    }

    pub fn respond_with_headers(
        self, url: &str, status: u16, body: &'static str, headers: Vec<(&'static str, &'static str)>,
    ) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Route::Respond { status, body, headers });
        self
    }

    pub fn fail(self, url: &str) -> Self {
        self.routes.lock().unwrap().insert(url.to_string(), Route::Fail);
        self
    }

    /// URLs requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn perform(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        let url = request.url.to_string();
        self.calls.lock().unwrap().push(url.clone());

        let routes = self.routes.lock().unwrap();
        match routes.get(&url) {
            Some(Route::Respond { status, body, headers }) => {
                let mut map = header::HeaderMap::new();
                for (name, value) in headers {
                    map.append(*name, header::HeaderValue::from_static(value));
                }
                Ok(FetchResponse {
                    url: request.url.clone(),
                    status: StatusCode::from_u16(*status).unwrap(),
                    headers: map,
                    bytes: Bytes::from_static(body.as_bytes()),
                })
            }
            Some(Route::Fail) => Err(Error::FetchFailed(format!("connection refused: {url}"))),
            None => Ok(FetchResponse {
                url: request.url.clone(),
                status: StatusCode::NOT_FOUND,
                headers: header::HeaderMap::new(),
                bytes: Bytes::new(),
            }),
        }
    }
}
