#![forbid(unsafe_code)]

mod config;
mod controllers;
mod entry;
mod handlers;
mod identity;
mod notify;
mod server;
mod support;

pub(crate) use support::*;

use clap::Parser as _;
use controllers::board::BoardController;
use identity::{Identity, StaticIdentity};
use notify::ToastBuffer;
use pb_core::ids::ProjectId;
use pb_storage::SqliteStore;
use std::collections::HashMap;
use std::fmt::Write as _;

// Some MCP clients are strict about the server echoing a compatible protocol version.
const MCP_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "planeboard-mcp";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

pub(crate) struct McpServer {
    initialized: bool,
    store: SqliteStore,
    identity: Box<dyn Identity>,
    toasts: ToastBuffer,
    boards: HashMap<ProjectId, BoardController>,
}

fn write_last_crash(storage_dir: &std::path::Path, kind: &str, detail: &str) {
    // Best-effort; never touches stdout, which carries the protocol.
    let _ = std::fs::create_dir_all(storage_dir);
    let path = storage_dir.join("planeboard_last_crash.txt");

    let mut out = String::new();
    let ts_ms = time::OffsetDateTime::now_utc().unix_timestamp() * 1000;
    let _ = writeln!(out, "ts={}", crate::support::ts_ms_to_rfc3339(ts_ms));
    let _ = writeln!(out, "pid={}", std::process::id());
    let _ = writeln!(out, "kind={kind}");
    let _ = writeln!(out, "version={SERVER_VERSION}");
    let _ = writeln!(out, "args={:?}", std::env::args().collect::<Vec<_>>());
    let _ = writeln!(out, "detail={detail}");

    let _ = std::fs::write(path, out);
}

fn install_crash_reporter(storage_dir: std::path::PathBuf) {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let mut detail = info.to_string();
        let backtrace = std::backtrace::Backtrace::force_capture();
        let _ = write!(&mut detail, "\nbacktrace:\n{backtrace}");
        write_last_crash(&storage_dir, "panic", &detail);
        default_hook(info);
    }));
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::Config::parse();
    config::init_logging(config.log_level.as_deref())?;
    let user = config.auth_user()?;

    let storage_dir = config.storage_dir.clone();
    install_crash_reporter(storage_dir.clone());

    let store = match SqliteStore::open(&storage_dir) {
        Ok(store) => store,
        Err(err) => {
            tracing::error!(storage_dir = %storage_dir.display(), error = %err, "cannot open store");
            return Err(err.into());
        }
    };
    tracing::info!(
        storage_dir = %storage_dir.display(),
        user = user.as_ref().map_or("<none>", |user| user.email.as_str()),
        version = SERVER_VERSION,
        "{SERVER_NAME} starting"
    );

    let mut server = McpServer::new(store, Box::new(StaticIdentity::new(user)));
    let result = entry::run_stdio(&mut server);
    if let Err(err) = &result {
        tracing::error!(error = %err, "transport failed");
        write_last_crash(&storage_dir, "error", &format!("{err:?}"));
    }
    result
}
