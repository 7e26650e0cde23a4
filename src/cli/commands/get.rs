//! Get command - route one request through the cache

use crate::cli::args::GetArgs;
use crate::config::Config;
use crate::error::{PrecacheError, PrecacheResult};
use crate::intercept::FetchOutcome;
use crate::network::{FetchMode, Response};
use crate::request::Request;
use crate::runtime;
use crate::worker::{EventOutcome, Worker, WorkerEvent};
use reqwest::Method;
use std::io::Write;
use tokio::fs;
use tracing::{debug, info};

pub async fn execute(args: GetArgs, config: &Config) -> PrecacheResult<()> {
    let method = Method::from_bytes(args.method.to_uppercase().as_bytes())
        .map_err(|_| PrecacheError::User(format!("Invalid HTTP method: {}", args.method)))?;

    let worker_ctx = runtime::build_context(config).await?;
    let url = worker_ctx.normalizer.resolve(&args.url)?;
    let fetcher = worker_ctx.fetcher.clone();
    let worker = Worker::new(worker_ctx);

    let outcome = worker
        .dispatch(WorkerEvent::Fetch(Request::new(method.clone(), url.as_str())))
        .await?;

    let response = match outcome {
        EventOutcome::Fetched(FetchOutcome::Response(response)) => response,
        _ if method != Method::GET => {
            return Err(PrecacheError::User(format!(
                "{} {} is not intercepted and only GET can be sent directly",
                method, url
            )));
        }
        _ => {
            debug!("Not intercepted, fetching {} directly", url);
            fetcher.fetch(&url, FetchMode::Default).await?
        }
    };

    info!(
        "{} {} -> {} ({} bytes)",
        method,
        url,
        response.status,
        response.body.len()
    );
    if !response.is_success() {
        return Err(PrecacheError::BadStatus {
            url: url.to_string(),
            status: response.status,
        });
    }

    write_body(&response, args.output.as_deref()).await
}

async fn write_body(response: &Response, output: Option<&std::path::Path>) -> PrecacheResult<()> {
    match output {
        Some(path) => fs::write(path, &response.body)
            .await
            .map_err(|e| PrecacheError::io(format!("writing {}", path.display()), e)),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(&response.body)
                .and_then(|()| stdout.flush())
                .map_err(|e| PrecacheError::io("writing response to stdout", e))
        }
    }
}
