//! shelfmark RPC Server: JSON-RPC over stdin/stdout.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"bookmark.add", "params":{"url":"...","title":"..."}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}
//!
//! Logs go to stderr. The filter comes from `SHELFMARK_LOG`, else from the
//! `logging.level` setting.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Instant;

use serde_json::{json, Value};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use shelfmark::app::App;
use shelfmark::rpc_handler::handle_method;
use shelfmark::services::settings_engine::{SettingsEngine, SettingsEngineTrait};

/// Fixed one-second window request limiter.
struct RateLimiter {
    window_start: Instant,
    request_count: u32,
    max_per_second: u32,
}

impl RateLimiter {
    fn new(max_per_second: u32) -> Self {
        Self {
            window_start: Instant::now(),
            request_count: 0,
            max_per_second,
        }
    }

    /// Returns true if the request is allowed, false if rate-limited.
    fn check(&mut self) -> bool {
        if self.window_start.elapsed().as_secs() >= 1 {
            self.window_start = Instant::now();
            self.request_count = 0;
        }
        self.request_count += 1;
        self.request_count <= self.max_per_second
    }
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_env("SHELFMARK_LOG")
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn send(out: &mut impl Write, response: &Value) -> io::Result<()> {
    writeln!(out, "{}", response)?;
    out.flush()
}

fn run(app: &Mutex<App>) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    send(&mut out, &json!({"event": "ready", "version": env!("CARGO_PKG_VERSION")}))?;

    let mut rate_limiter = RateLimiter::new(200);

    for line in io::stdin().lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let req: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "unparseable request");
                send(&mut out, &json!({"id": null, "error": format!("parse error: {}", e)}))?;
                continue;
            }
        };
        let id = req.get("id").cloned().unwrap_or(Value::Null);

        if !rate_limiter.check() {
            warn!("rate limit exceeded");
            send(&mut out, &json!({"id": id, "error": "rate limit exceeded"}))?;
            continue;
        }

        let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("");
        let params = req.get("params").cloned().unwrap_or(json!({}));

        let response = match handle_method(app, method, &params) {
            Ok(val) => json!({"id": id, "result": val}),
            Err(err) => {
                warn!(method, error = %err, "request failed");
                json!({"id": id, "error": err})
            }
        };
        send(&mut out, &response)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let mut settings_engine = SettingsEngine::new(std::env::var("SHELFMARK_CONFIG").ok());
    let settings_error = settings_engine.load().err();
    init_logging(&settings_engine.get_settings().logging.level);
    if let Some(e) = settings_error {
        warn!(error = %e, "failed to load settings, using defaults");
    }

    let app = match std::env::var("SHELFMARK_DB") {
        Ok(path) => App::with_settings(&path, settings_engine),
        Err(_) => App::from_settings(settings_engine),
    };
    let app = match app {
        Ok(app) => Mutex::new(app),
        Err(e) => {
            error!(error = %e, "failed to initialize shelfmark");
            return ExitCode::FAILURE;
        }
    };
    info!("shelfmark rpc server ready");

    let result = run(&app);
    if let Ok(mut app) = app.lock() {
        app.shutdown();
    }
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "rpc loop stopped");
            ExitCode::FAILURE
        }
    }
}
