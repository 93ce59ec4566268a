//! Fetch the OData `Products` feed through the deferred REST client, in the
//! three ways a pending response can be consumed.
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use rest_client::{AsyncConnectionHandler, GzipInputAdapter, RestClient};
use rest_client_sdk::{ClientConfig, ClientResponse, HandlerContext, Json};
use tokio::runtime::Runtime;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

mod odata;

use odata::{DEFAULT_PRODUCTS_URL, Feed, print_feed};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Submit, then block on the response right away.
    Blocking,
    /// Submit, then await the response from async code.
    Awaited,
    /// Submit, poll until done, then resolve.
    Polled,
    All,
}

#[derive(Parser)]
#[command(version, about)]
struct Args {
    #[arg(long, value_enum, default_value_t = Mode::All)]
    mode: Mode,

    /// Feed URL. Must return OData JSON.
    #[arg(long, default_value = DEFAULT_PRODUCTS_URL)]
    url: String,

    /// Give up polling after this many milliseconds.
    #[arg(long, default_value_t = 30_000)]
    poll_limit_ms: u64,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // REST_CLIENT_* variables override the defaults.
    let config = ClientConfig::from_env()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;

    let handler = Arc::new(AsyncConnectionHandler::new(runtime.handle().clone()));
    let client = RestClient::new(config, handler.clone())
        .with_context(HandlerContext::new().with_input_adapter(GzipInputAdapter));

    let result = run(&args, &client, &runtime);
    handler.shutdown();
    result
}

fn run(args: &Args, client: &RestClient, runtime: &Runtime) -> anyhow::Result<()> {
    let modes: &[Mode] = match args.mode {
        Mode::All => &[Mode::Blocking, Mode::Awaited, Mode::Polled],
        Mode::Blocking => &[Mode::Blocking],
        Mode::Awaited => &[Mode::Awaited],
        Mode::Polled => &[Mode::Polled],
    };

    for (i, mode) in modes.iter().enumerate() {
        if i > 0 {
            println!();
        }
        let feed = match mode {
            Mode::Blocking => {
                println!("*********** Blocking get");
                blocking(client, &args.url)?
            }
            Mode::Awaited => {
                println!("*********** Awaited get");
                runtime.block_on(awaited(client, &args.url))?
            }
            Mode::Polled | Mode::All => {
                println!("*********** Polled get");
                polled(client, &args.url, Duration::from_millis(args.poll_limit_ms))?
            }
        };
        print_feed(&feed);
    }
    Ok(())
}

fn blocking(client: &RestClient, url: &str) -> anyhow::Result<Feed> {
    let response = client.resource(url).accept(&mime::APPLICATION_JSON)?.get()?;
    info!(status = %response.status()?, "Response received");
    let Json(feed) = response.entity::<Json<Feed>>()?;
    Ok(feed)
}

async fn awaited(client: &RestClient, url: &str) -> anyhow::Result<Feed> {
    let pending = client
        .resource(url)
        .accept(&mime::APPLICATION_JSON)?
        .get()?
        .into_pending();
    let response = pending.resolve().await?;
    info!(status = %response.status()?, "Response received");

    // The body is a blocking reader.
    let Json(feed) = tokio::task::spawn_blocking(move || response.entity::<Json<Feed>>()).await??;
    Ok(feed)
}

fn polled(client: &RestClient, url: &str, limit: Duration) -> anyhow::Result<Feed> {
    let pending = client
        .resource(url)
        .accept(&mime::APPLICATION_JSON)?
        .get()?
        .into_pending();

    let started = Instant::now();
    let mut polls = 0_u32;
    while !pending.is_done() {
        if started.elapsed() > limit {
            if pending.cancel() {
                debug!(polls, "Aborted pending request");
            }
            bail!("no response from {url} within {limit:?}");
        }
        polls += 1;
        debug!(polls, "Not yet done");
        std::thread::sleep(Duration::from_millis(10));
    }
    info!(polls, elapsed = ?started.elapsed(), "Response ready");

    let response = pending.get()?;
    let Json(feed) = response.entity::<Json<Feed>>()?;
    Ok(feed)
}
