use crate::gallery::{Gallery, GalleryError};
use rosterspin_core::{Roster, PNG_MIME};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fs;
use std::io::ErrorKind;
use tiny_http::Method;

pub struct WebState {
    pub gallery: Gallery,
    pub roster: Roster,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Json { status: u16, body: Value },
    Bytes {
        content_type: &'static str,
        data: Vec<u8>,
    },
    Empty(u16),
}

impl Reply {
    fn json(status: u16, body: Value) -> Self {
        Self::Json { status, body }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self::json(status, json!({ "error": message.into() }))
    }

    pub fn status(&self) -> u16 {
        match self {
            Self::Json { status, .. } | Self::Empty(status) => *status,
            Self::Bytes { .. } => 200,
        }
    }
}

impl From<GalleryError> for Reply {
    fn from(err: GalleryError) -> Self {
        if err.status() >= 500 {
            tracing::warn!(error = %err, "gallery request failed");
        }
        Self::error(err.status(), err.to_string())
    }
}

#[derive(Deserialize)]
struct UrlRequest {
    name: String,
    url: String,
}

#[derive(Deserialize)]
struct DefaultRequest {
    name: String,
}

pub fn route(state: &mut WebState, method: &Method, url: &str, body: &[u8], now: i64) -> Reply {
    let (path, query) = url.split_once('?').unwrap_or((url, ""));
    let result = match (method, path) {
        (&Method::Get, "/api/characters") => {
            to_json(state.gallery.records()).map(|body| Reply::json(200, body))
        }
        (&Method::Post, "/api/characters/upload") => {
            let name = query_param(query, "name").unwrap_or_default();
            state
                .gallery
                .upload(&name, body, now)
                .and_then(|record| to_json(&record))
                .map(|body| Reply::json(201, body))
        }
        (&Method::Post, "/api/characters/url") => match parse_body::<UrlRequest>(body) {
            Ok(req) => state
                .gallery
                .add_url(&req.name, &req.url, now)
                .and_then(|record| to_json(&record))
                .map(|body| Reply::json(201, body)),
            Err(reply) => Ok(reply),
        },
        (&Method::Get, "/api/default") => Ok(Reply::json(
            200,
            json!({ "name": state.gallery.default_name() }),
        )),
        (&Method::Post, "/api/default") => match parse_body::<DefaultRequest>(body) {
            Ok(req) => state
                .gallery
                .set_default(&req.name)
                .map(|()| Reply::json(200, json!({ "name": req.name }))),
            Err(reply) => Ok(reply),
        },
        (&Method::Get, "/api/roster") => {
            to_json(state.roster.entries()).map(|body| Reply::json(200, body))
        }
        (&Method::Delete, path) if path.starts_with("/api/characters/") => {
            match percent_decode(&path["/api/characters/".len()..]) {
                Some(name) => state.gallery.remove(&name).map(|_| Reply::Empty(204)),
                None => Ok(Reply::error(400, "invalid name encoding")),
            }
        }
        (&Method::Get, path) if path.starts_with("/uploads/") => {
            serve_upload(&state.gallery, &path["/uploads/".len()..])
        }
        _ => Ok(Reply::error(404, "not found")),
    };
    result.unwrap_or_else(Reply::from)
}

fn serve_upload(gallery: &Gallery, file: &str) -> Result<Reply, GalleryError> {
    let Some(path) = gallery.upload_path(file) else {
        return Ok(Reply::error(404, "not found"));
    };
    match fs::read(path) {
        Ok(data) => Ok(Reply::Bytes {
            content_type: PNG_MIME,
            data,
        }),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(Reply::error(404, "not found")),
        Err(err) => Err(err.into()),
    }
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<Value, GalleryError> {
    Ok(serde_json::to_value(value)?)
}

fn parse_body<T: for<'de> Deserialize<'de>>(body: &[u8]) -> Result<T, Reply> {
    serde_json::from_slice(body).map_err(|err| Reply::error(400, format!("invalid json: {err}")))
}

fn query_param(query: &str, key: &str) -> Option<String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, _)| *name == key)
        .and_then(|(_, value)| percent_decode(&value.replace('+', " ")))
}

fn percent_decode(raw: &str) -> Option<String> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut idx = 0;
    while idx < bytes.len() {
        if bytes[idx] == b'%' {
            let hex = raw.get(idx + 1..idx + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            idx += 3;
        } else {
            out.push(bytes[idx]);
            idx += 1;
        }
    }
    String::from_utf8(out).ok()
}
