//! # Example: hello_queue
//!
//! A tiny job service supervised by exitvisor: one HTTP server and two job
//! workers sharing an in-memory store.
//!
//! ```text
//! POST /enqueue  key=<k>   → 202 "accepted job <id>"
//! GET  /dequeue?key=<k>    → 200 "hello from job <id>" (answer removed)
//! GET  /stats              → {"processed":..,"failed":..,"pending":..}
//! ```
//!
//! A newer answer for a key replaces an unread one. `failed` counts enqueue
//! requests refused because the queue was full or already closed.
//!
//! Ctrl-C (or SIGTERM) stops the HTTP server gracefully. Workers are stopped
//! according to `--stop-workers`:
//! - `always`: workers stop immediately, pending jobs are dropped;
//! - `on-fatal`: workers stop immediately only when an action failed, otherwise
//!   the queue is closed and drained first.
//!
//! ## Run
//! ```bash
//! cargo run --example hello_queue --features logging -- --port 3000
//! curl -d key=a localhost:3000/enqueue
//! curl 'localhost:3000/dequeue?key=a'
//! ```

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use axum::{
    Form, Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use exitvisor::{
    ActionError, ActionFn, ActionRef, LogWriter, ShutdownCause, ShutdownFn, Supervisor,
    SupervisorConfig,
};

const WORKERS: usize = 2;
const QUEUE_CAPACITY: usize = 128;

#[derive(Parser, Debug)]
#[command(about = "Job queue demo supervised by exitvisor")]
struct Args {
    /// Port the HTTP server listens on.
    #[arg(long, default_value_t = 3000)]
    port: u16,

    /// When to stop job workers on shutdown.
    #[arg(long, value_enum, default_value_t = StopPolicy::Always)]
    stop_workers: StopPolicy,

    /// Deadline for the shutdown procedure and the HTTP drain (0 = unbounded).
    #[arg(long, default_value_t = 5000)]
    shutdown_timeout_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum StopPolicy {
    Always,
    OnFatal,
}

impl StopPolicy {
    fn stop_now(self, cause: &ShutdownCause) -> bool {
        match self {
            StopPolicy::Always => true,
            StopPolicy::OnFatal => cause.is_fatal(),
        }
    }
}

struct Job {
    id: u64,
    key: String,
}

#[derive(Default)]
struct Store {
    answers: Mutex<HashMap<String, String>>,
}

impl Store {
    fn put(&self, key: String, value: String) {
        if let Ok(mut answers) = self.answers.lock() {
            answers.insert(key, value);
        }
    }

    fn pop(&self, key: &str) -> Option<String> {
        self.answers.lock().ok()?.remove(key)
    }
}

#[derive(Default)]
struct Stats {
    processed: AtomicU64,
    failed: AtomicU64,
    pending: AtomicU64,
}

#[derive(Serialize)]
struct StatsView {
    processed: u64,
    failed: u64,
    pending: u64,
}

struct AppState {
    store: Store,
    stats: Stats,
    next_id: AtomicU64,
    /// `None` once the queue is closed for shutdown.
    jobs: Mutex<Option<mpsc::Sender<Job>>>,
}

/// Everything the shutdown procedure needs to stop what `start` brought up.
struct ServerHandle {
    state: Arc<AppState>,
    server_stop: CancellationToken,
    workers_stop: CancellationToken,
    policy: StopPolicy,
}

impl ServerHandle {
    fn stop(&self, cause: &ShutdownCause) {
        info!(%cause, "stopping http server");
        self.server_stop.cancel();

        if let Ok(mut jobs) = self.state.jobs.lock() {
            jobs.take();
        }
        if self.policy.stop_now(cause) {
            info!("stopping job workers");
            self.workers_stop.cancel();
        } else {
            info!(
                pending = self.state.stats.pending.load(Ordering::Relaxed),
                "draining job queue"
            );
        }
    }
}

#[derive(Deserialize)]
struct EnqueueForm {
    key: Option<String>,
}

#[derive(Deserialize)]
struct DequeueQuery {
    key: Option<String>,
}

async fn enqueue(
    State(state): State<Arc<AppState>>,
    Form(form): Form<EnqueueForm>,
) -> (StatusCode, String) {
    let Some(key) = form.key.filter(|k| !k.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "no key".into());
    };
    let tx = state.jobs.lock().ok().and_then(|jobs| jobs.clone());
    let Some(tx) = tx else {
        state.stats.failed.fetch_add(1, Ordering::Relaxed);
        return (StatusCode::INTERNAL_SERVER_ERROR, "enqueue failed".into());
    };

    let id = state.next_id.fetch_add(1, Ordering::Relaxed) + 1;
    state.stats.pending.fetch_add(1, Ordering::Relaxed);
    // Never waits for queue space, so the graceful HTTP drain cannot stall here.
    match tx.try_send(Job { id, key }) {
        Ok(()) => (StatusCode::ACCEPTED, format!("accepted job {id}")),
        Err(err) => {
            state.stats.pending.fetch_sub(1, Ordering::Relaxed);
            state.stats.failed.fetch_add(1, Ordering::Relaxed);
            warn!(job = id, error = %err, "enqueue failed");
            let status = match err {
                mpsc::error::TrySendError::Full(_) => StatusCode::SERVICE_UNAVAILABLE,
                mpsc::error::TrySendError::Closed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, "enqueue failed".into())
        }
    }
}

async fn dequeue(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DequeueQuery>,
) -> (StatusCode, String) {
    let Some(key) = query.key.filter(|k| !k.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "no key".into());
    };
    match state.store.pop(&key) {
        Some(answer) => (StatusCode::OK, answer),
        None => (StatusCode::NOT_FOUND, "no answer for you".into()),
    }
}

async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsView> {
    let s = &state.stats;
    Json(StatsView {
        processed: s.processed.load(Ordering::Relaxed),
        failed: s.failed.load(Ordering::Relaxed),
        pending: s.pending.load(Ordering::Relaxed),
    })
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/enqueue", post(enqueue))
        .route("/dequeue", get(dequeue))
        .route("/stats", get(stats))
        .with_state(state)
}

fn http_action(
    addr: SocketAddr,
    state: Arc<AppState>,
    stop: CancellationToken,
    grace: Option<Duration>,
) -> ActionRef {
    ActionFn::boxed("http-server", move |_ctx| async move {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("listening on {addr}");

        let serve = axum::serve(listener, router(state))
            .with_graceful_shutdown(stop.clone().cancelled_owned())
            .into_future();
        let Some(grace) = grace else {
            return Ok(serve.await?);
        };

        tokio::pin!(serve);
        tokio::select! {
            res = &mut serve => return Ok(res?),
            _ = stop.cancelled() => {}
        }
        match tokio::time::timeout(grace, serve).await {
            Ok(res) => Ok(res?),
            Err(_) => Err(ActionError::fail("http drain timed out")),
        }
    })
}

fn worker_action(
    n: usize,
    state: Arc<AppState>,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<Job>>>,
    stop: CancellationToken,
) -> ActionRef {
    ActionFn::boxed(format!("job-worker-{n}"), move |_ctx| async move {
        loop {
            let job = tokio::select! {
                biased;
                _ = stop.cancelled() => return Err(ActionError::Canceled),
                job = async { rx.lock().await.recv().await } => job,
            };
            // Queue closed and drained.
            let Some(job) = job else {
                return Ok(());
            };

            state.stats.pending.fetch_sub(1, Ordering::Relaxed);
            info!(job = job.id, "processing job");
            state.store.put(job.key, format!("hello from job {}", job.id));
            state.stats.processed.fetch_add(1, Ordering::Relaxed);
        }
    })
}

/// Brings up the HTTP server and the workers; the handle stops them again.
fn start(args: &Args, grace: Option<Duration>) -> (Vec<ActionRef>, ServerHandle) {
    let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
    let rx = Arc::new(tokio::sync::Mutex::new(rx));
    let state = Arc::new(AppState {
        store: Store::default(),
        stats: Stats::default(),
        next_id: AtomicU64::new(0),
        jobs: Mutex::new(Some(tx)),
    });

    let handle = ServerHandle {
        state: state.clone(),
        server_stop: CancellationToken::new(),
        workers_stop: CancellationToken::new(),
        policy: args.stop_workers,
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let mut actions = vec![http_action(
        addr,
        state.clone(),
        handle.server_stop.clone(),
        grace,
    )];
    for n in 0..WORKERS {
        actions.push(worker_action(
            n,
            state.clone(),
            rx.clone(),
            handle.workers_stop.clone(),
        ));
    }
    (actions, handle)
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,exitvisor=debug".into()),
        )
        .init();

    let args = Args::parse();
    let cfg = SupervisorConfig {
        shutdown_timeout: Duration::from_millis(args.shutdown_timeout_ms),
        ..SupervisorConfig::default()
    };
    let grace = cfg.shutdown_deadline();

    let (actions, handle) = start(&args, grace);
    let sup = Supervisor::builder(cfg)
        .with_subscribers(vec![Arc::new(LogWriter)])
        .build();

    sup.run(
        ShutdownFn::blocking(move |cause| handle.stop(&cause)),
        actions,
    )
    .await?;

    info!("bye");
    Ok(())
}
