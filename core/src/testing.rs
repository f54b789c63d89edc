//! In-process stand-in for the catalog API used by unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::HttpExecutor;

pub(crate) const BASE_URL: &str = "http://stub/api/v2";

/// Serves a fixed catalog and records every request it sees.
pub(crate) struct StubExecutor {
    names: Vec<String>,
    offline: AtomicBool,
    outage: Mutex<Option<HttpResponse>>,
    paused: AtomicBool,
    release: Notify,
    requests: Mutex<Vec<String>>,
}

impl StubExecutor {
    /// Catalog whose ids are the 1-based positions of `names`.
    pub(crate) fn with_catalog(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
            offline: AtomicBool::new(false),
            outage: Mutex::new(None),
            paused: AtomicBool::new(false),
            release: Notify::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Catalog of `count` entries named `mon-1`, `mon-2`, ...
    pub(crate) fn numbered(count: u32) -> Self {
        let names: Vec<String> = (1..=count).map(|i| format!("mon-{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        Self::with_catalog(&refs)
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Answer every request with `status` and `body` until cleared.
    pub(crate) fn set_outage(&self, outage: Option<(u16, &str)>) {
        *self.outage.lock().unwrap() =
            outage.map(|(status, body)| HttpResponse::new(status, body));
    }

    /// Hold every request after it is recorded until `resume`.
    pub(crate) fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub(crate) fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.release.notify_waiters();
    }

    /// Request paths relative to `BASE_URL`, in arrival order.
    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn respond(&self, path: &str) -> HttpResponse {
        if let Some(query) = path.strip_prefix("pokemon?") {
            let (limit, offset) = parse_paging(query);
            return HttpResponse::new(200, self.listing_json(limit, offset));
        }
        if let Some(key) = path.strip_prefix("pokemon/") {
            return match self.lookup(key) {
                Some((id, name)) => HttpResponse::new(200, pokemon_json(id, name)),
                None => HttpResponse::new(404, "Not Found"),
            };
        }
        if let Some(name) = path.strip_prefix("ability/") {
            return HttpResponse::new(
                200,
                format!(
                    r#"{{"id":1,"name":"{name}","effect_entries":[{{"effect":"long","short_effect":"short","language":{{"name":"en","url":"u"}}}}],"pokemon":[]}}"#
                ),
            );
        }
        if let Some(name) = path.strip_prefix("type/") {
            return HttpResponse::new(
                200,
                format!(
                    r#"{{"id":10,"name":"{name}","damage_relations":{{"double_damage_from":[{{"name":"water","url":"u"}}],"double_damage_to":[],"half_damage_from":[],"half_damage_to":[],"no_damage_from":[],"no_damage_to":[]}}}}"#
                ),
            );
        }
        HttpResponse::new(404, "Not Found")
    }

    fn lookup<'a>(&'a self, key: &'a str) -> Option<(u32, &'a str)> {
        if let Ok(id) = key.parse::<u32>() {
            let name = self.names.get((id as usize).checked_sub(1)?)?;
            return Some((id, name));
        }
        self.names
            .iter()
            .position(|n| n == key)
            .map(|i| (i as u32 + 1, self.names[i].as_str()))
    }

    fn listing_json(&self, limit: u32, offset: u32) -> String {
        let results: Vec<serde_json::Value> = self
            .names
            .iter()
            .enumerate()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|(i, name)| {
                serde_json::json!({
                    "name": name,
                    "url": format!("{BASE_URL}/pokemon/{}/", i + 1),
                })
            })
            .collect();
        serde_json::json!({
            "count": self.names.len(),
            "next": null,
            "previous": null,
            "results": results,
        })
        .to_string()
    }
}

#[async_trait]
impl HttpExecutor for StubExecutor {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let path = request
            .url
            .strip_prefix(BASE_URL)
            .unwrap_or(&request.url)
            .trim_start_matches('/')
            .to_string();
        self.requests.lock().unwrap().push(path.clone());
        while self.paused.load(Ordering::SeqCst) {
            let released = self.release.notified();
            if !self.paused.load(Ordering::SeqCst) {
                break;
            }
            released.await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(ApiError::Transport("connection refused".to_string()));
        }
        if let Some(outage) = self.outage.lock().unwrap().clone() {
            return Ok(outage);
        }
        Ok(self.respond(&path))
    }
}

fn parse_paging(query: &str) -> (u32, u32) {
    let mut limit = 20;
    let mut offset = 0;
    for pair in query.split('&') {
        match pair.split_once('=') {
            Some(("limit", v)) => limit = v.parse().unwrap_or(limit),
            Some(("offset", v)) => offset = v.parse().unwrap_or(offset),
            _ => {}
        }
    }
    (limit, offset)
}

pub(crate) fn pokemon_json(id: u32, name: &str) -> String {
    serde_json::json!({
        "id": id,
        "name": name,
        "height": 7,
        "weight": 69,
        "base_experience": 64,
        "sprites": {"front_default": format!("https://img/{id}.png"), "front_shiny": null},
        "types": [{"slot": 1, "type": {"name": "grass", "url": "u"}}],
        "stats": [{"base_stat": 45, "effort": 0, "stat": {"name": "hp", "url": "u"}}],
        "abilities": [{"is_hidden": false, "slot": 1, "ability": {"name": "overgrow", "url": "u"}}],
    })
    .to_string()
}
