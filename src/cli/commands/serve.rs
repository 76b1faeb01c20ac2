//! Serve command - answer JSON-lines requests
//!
//! Each stdin line is a request object (`distro`, `releasever`, `arch`,
//! `url`, `ref`, optional `allow_stale` and `id`). Every request runs in its
//! own task, so responses come back in completion order; the `id` is echoed
//! to pair them up. The result sweeper runs for as long as the server does.

use crate::cli::args::ServeArgs;
use crate::cli::commands::open_result_cache;
use crate::config::Config;
use crate::error::{GenrepoError, GenrepoResult, ResolveError};
use crate::service::{Genrepo, ResolveRequest, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(flatten)]
    request: ResolveRequest,
}

#[derive(Debug, Serialize)]
struct Reply {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<serde_json::Value>,
    #[serde(flatten)]
    response: Response,
}

/// Execute the serve command
pub async fn execute(args: ServeArgs, config: &Config) -> GenrepoResult<()> {
    let cache = open_result_cache(config).await?;
    let service = Arc::new(Genrepo::from_config(config, Arc::clone(&cache)));

    let interval = args
        .sweep_interval
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.cache.sweep_interval());
    let sweeper = cache.spawn_sweeper(interval, config.cache.retention());
    info!(
        "Serving requests from stdin (store {}, sweep every {:?})",
        cache.path().display(),
        interval
    );

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = rx.recv().await {
            if let Err(e) = stdout.write_all(line.as_bytes()).await {
                warn!("Failed to write response: {}", e);
                break;
            }
            let _ = stdout.flush().await;
        }
    });

    let stdin = BufReader::new(tokio::io::stdin());
    let served = tokio::select! {
        result = serve(service, stdin, tx) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
            0
        }
    };

    if let Err(e) = writer.await {
        warn!("Response writer failed: {}", e);
    }
    sweeper.abort();
    info!("Served {} request(s)", served);
    Ok(())
}

/// Answer every line of `input`, sending one JSON line per request to `output`.
///
/// Returns once the input is exhausted and every request has been answered.
pub async fn serve<R>(
    service: Arc<Genrepo>,
    input: R,
    output: mpsc::UnboundedSender<String>,
) -> GenrepoResult<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut tasks = JoinSet::new();
    let mut served = 0;

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| GenrepoError::io("reading request", e))?
    {
        if line.trim().is_empty() {
            continue;
        }
        served += 1;

        let service = Arc::clone(&service);
        let output = output.clone();
        tasks.spawn(async move {
            let reply = answer(&service, &line).await;
            match serde_json::to_string(&reply) {
                Ok(mut json) => {
                    json.push('\n');
                    if output.send(json).is_err() {
                        debug!("Response channel closed");
                    }
                }
                Err(e) => warn!("Failed to encode response: {}", e),
            }
        });
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            warn!("Request task failed: {}", e);
        }
    }
    Ok(served)
}

async fn answer(service: &Genrepo, line: &str) -> Reply {
    match serde_json::from_str::<Envelope>(line) {
        Ok(envelope) => Reply {
            id: envelope.id,
            response: service.resolve(&envelope.request).await,
        },
        Err(e) => {
            debug!("Rejecting request {:?}: {}", line, e);
            Reply {
                id: None,
                response: Response::failure(&ResolveError::bad_request(format!(
                    "invalid request: {}",
                    e
                ))),
            }
        }
    }
}
