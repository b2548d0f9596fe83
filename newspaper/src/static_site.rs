//! Static front-end server with SPA routing, a diagnostic page and a built-in fallback page.
//!
//! Mounted last by the API server, or run alone with `--static-only` when only the bundle
//! needs to stay reachable.

use chrono::{DateTime, Utc};
use rocket::http::{ContentType, Status};
use rocket::response::{self, Responder, Response};
use rocket::{catch, catchers, get, routes, Build, Catcher, Request, Rocket, Route, State};
use std::io::Cursor;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, error, warn};

const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; img-src 'self' https: data:; \
     style-src 'self' 'unsafe-inline'; script-src 'self'; connect-src 'self' https:; \
     frame-ancestors 'none'";

const FALLBACK_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Newspaper.AI</title>
<style>
body { font-family: system-ui, sans-serif; max-width: 40rem; margin: 4rem auto; padding: 0 1rem; color: #222; }
h1 { font-size: 1.6rem; }
a { color: #0b57d0; }
</style>
</head>
<body>
<h1>Newspaper.AI is starting up</h1>
<p>The application bundle is not available right now. Please try again in a moment.</p>
<p><a href="/">Reload</a> &middot; <a href="/diagnostic.html">Diagnostics</a></p>
</body>
</html>
"#;

/// Extension to MIME type. Anything not listed is served as `application/octet-stream`.
const MIME_TYPES: &[(&str, &str)] = &[
    ("html", "text/html; charset=utf-8"),
    ("htm", "text/html; charset=utf-8"),
    ("css", "text/css; charset=utf-8"),
    ("js", "text/javascript; charset=utf-8"),
    ("mjs", "text/javascript; charset=utf-8"),
    ("json", "application/json"),
    ("map", "application/json"),
    ("webmanifest", "application/manifest+json"),
    ("txt", "text/plain; charset=utf-8"),
    ("xml", "application/xml"),
    ("svg", "image/svg+xml"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("ico", "image/x-icon"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
    ("ttf", "font/ttf"),
    ("wasm", "application/wasm"),
];

/// Where the bundle lives and when the server started
#[derive(Debug, Clone)]
pub struct StaticSite {
    pub root: PathBuf,
    pub started_at: DateTime<Utc>,
}

impl StaticSite {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            started_at: Utc::now(),
        }
    }

    fn index_path(&self) -> PathBuf {
        self.root.join("index.html")
    }
}

/// In-memory response body with its content type. HTML bodies get the security headers.
#[derive(Debug)]
pub struct StaticFile {
    status: Status,
    content_type: ContentType,
    html: bool,
    body: Vec<u8>,
}

impl StaticFile {
    pub fn new(content_type: ContentType, body: Vec<u8>) -> Self {
        let html = content_type.is_html();
        Self {
            status: Status::Ok,
            content_type,
            html,
            body,
        }
    }

    pub fn html(body: impl Into<String>) -> Self {
        Self::new(ContentType::HTML, body.into().into_bytes())
    }

    pub fn fallback() -> Self {
        Self::html(FALLBACK_PAGE)
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }
}

impl<'r> Responder<'r, 'static> for StaticFile {
    fn respond_to(self, _req: &'r Request<'_>) -> response::Result<'static> {
        let mut builder = Response::build();
        builder
            .status(self.status)
            .header(self.content_type)
            .raw_header("X-Content-Type-Options", "nosniff");
        if self.html {
            builder
                .raw_header("Content-Security-Policy", CONTENT_SECURITY_POLICY)
                .raw_header("X-Frame-Options", "DENY")
                .raw_header("Referrer-Policy", "strict-origin-when-cross-origin");
        }
        builder.sized_body(self.body.len(), Cursor::new(self.body));
        builder.ok()
    }
}

pub fn content_type_for(path: &Path) -> ContentType {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    MIME_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .and_then(|(_, mime)| ContentType::parse_flexible(mime))
        .unwrap_or(ContentType::Binary)
}

/// Join a request path onto `root`. `None` for anything but plain names (`..`, absolute, prefixes).
pub fn resolve_path(root: &Path, requested: &Path) -> Option<PathBuf> {
    let mut resolved = root.to_path_buf();
    for component in requested.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(resolved)
}

/// `None` for missing paths and directories; other I/O errors are a 500.
/// Unmatched `/api/...` requests are never SPA routes.
fn is_api_path(path: &Path) -> bool {
    matches!(path.components().next(), Some(Component::Normal(first)) if first == "api")
}

async fn read_file(path: &Path) -> Result<Option<StaticFile>, Status> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if !meta.is_file() => return Ok(None),
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            error!("static: failed to stat {}: {}", path.display(), e);
            return Err(Status::InternalServerError);
        }
    }
    match tokio::fs::read(path).await {
        Ok(body) => Ok(Some(StaticFile::new(content_type_for(path), body))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => {
            error!("static: failed to read {}: {}", path.display(), e);
            Err(Status::InternalServerError)
        }
    }
}

/// index.html, or the built-in page when the bundle is missing
async fn index_or_fallback(site: &StaticSite) -> Result<StaticFile, Status> {
    match read_file(&site.index_path()).await? {
        Some(file) => Ok(file),
        None => {
            warn!("static: {} missing, serving fallback page", site.index_path().display());
            Ok(StaticFile::fallback())
        }
    }
}

#[get("/")]
async fn index(site: &State<StaticSite>) -> Result<StaticFile, Status> {
    index_or_fallback(site).await
}

#[get("/ping")]
fn ping() -> String {
    format!("pong {}", Utc::now().to_rfc3339())
}

#[get("/fallback.html")]
fn fallback() -> StaticFile {
    StaticFile::fallback()
}

#[get("/diagnostic.html")]
async fn diagnostic(site: &State<StaticSite>) -> StaticFile {
    let now = Utc::now();
    let uptime = (now - site.started_at).num_seconds();
    let has_index = tokio::fs::metadata(site.index_path()).await.is_ok();
    let files = count_files(&site.root).await;

    StaticFile::html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Newspaper.AI diagnostics</title></head>
<body>
<h1>Server diagnostics</h1>
<table>
<tr><th>Server time</th><td>{}</td></tr>
<tr><th>Uptime</th><td>{} s</td></tr>
<tr><th>Static directory</th><td>{}</td></tr>
<tr><th>index.html present</th><td>{}</td></tr>
<tr><th>Files</th><td>{}</td></tr>
</table>
</body>
</html>
"#,
        now.to_rfc3339(),
        uptime,
        escape_html(&site.root.display().to_string()),
        if has_index { "yes" } else { "no" },
        files
    ))
}

/// Existing files by path; extensionless misses fall back to index.html for client routing.
#[get("/<path..>", rank = 20)]
async fn asset(path: PathBuf, site: &State<StaticSite>) -> Result<StaticFile, Status> {
    if is_api_path(&path) {
        debug!("static: unknown api route /{}", path.display());
        return Err(Status::NotFound);
    }
    let Some(full) = resolve_path(&site.root, &path) else {
        warn!("static: rejected path {}", path.display());
        return Err(Status::NotFound);
    };

    if let Some(file) = read_file(&full).await? {
        return Ok(file);
    }
    if path.extension().is_some() {
        debug!("static: no such file {}", full.display());
        return Err(Status::NotFound);
    }
    index_or_fallback(site).await
}

#[catch(404)]
fn not_found(req: &Request<'_>) -> StaticFile {
    debug!("static: 404 for {}", req.uri());
    StaticFile::fallback().with_status(Status::NotFound)
}

#[catch(500)]
fn internal_error(req: &Request<'_>) -> StaticFile {
    error!("static: 500 for {}", req.uri());
    StaticFile::fallback().with_status(Status::InternalServerError)
}

pub fn routes() -> Vec<Route> {
    routes![index, ping, fallback, diagnostic, asset]
}

pub fn catchers() -> Vec<Catcher> {
    catchers![not_found, internal_error]
}

/// Rocket serving only the static routes.
pub fn build_rocket(site: StaticSite, figment: rocket::figment::Figment) -> Rocket<Build> {
    rocket::custom(figment)
        .manage(site)
        .mount("/", routes())
        .register("/", catchers())
}

async fn count_files(root: &Path) -> usize {
    let mut count = 0;
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let Ok(mut entries) = tokio::fs::read_dir(&dir).await else {
            continue;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            match entry.file_type().await {
                Ok(ft) if ft.is_dir() => pending.push(entry.path()),
                Ok(_) => count += 1,
                Err(_) => {}
            }
        }
    }
    count
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
