use anyhow::Result;
use clap::Parser;
use std::time::Duration;
use storefront_metrics::config::EndpointContext;
use storefront_metrics::orchestrator::{fetch_metrics, fetch_metrics_with_deadline};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "storefront-metrics")]
#[command(about = "Fetch session count and conversion rate for a storefront")]
struct Args {
    /// Time window: today, yesterday or YYYY-MM-DD
    #[arg(short, long, default_value = "today")]
    window: String,

    /// Shop domain (or set STOREFRONT_SHOP_DOMAIN)
    #[arg(long)]
    shop: Option<String>,

    /// Admin API access token (or set STOREFRONT_ACCESS_TOKEN)
    #[arg(long)]
    token: Option<String>,

    /// Admin API version (or set STOREFRONT_API_VERSION)
    #[arg(long)]
    api_version: Option<String>,

    /// Full GraphQL URL override (or set STOREFRONT_ENDPOINT_URL)
    #[arg(long)]
    endpoint_url: Option<String>,

    /// Abandon the whole fetch after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let ctx = build_context(&args)?;
    info!("Fetching metrics for {} ({})", ctx.shop_domain, args.window);

    let outcome = match args.timeout_secs {
        Some(secs) => fetch_metrics_with_deadline(&ctx, &args.window, Duration::from_secs(secs)).await,
        None => fetch_metrics(&ctx, &args.window).await,
    };

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn build_context(args: &Args) -> Result<EndpointContext> {
    let mut ctx = match (&args.shop, &args.token) {
        (Some(shop), Some(token)) => EndpointContext::new(shop, token.clone()),
        _ => {
            let mut ctx = EndpointContext::from_env()
                .map_err(|e| anyhow::anyhow!("Failed to load endpoint configuration: {}", e))?;
            if let Some(shop) = &args.shop {
                ctx = ctx.with_shop_domain(shop);
            }
            if let Some(token) = &args.token {
                ctx.access_token = token.clone();
            }
            ctx
        }
    };

    if let Some(version) = &args.api_version {
        ctx = ctx.with_api_version(version.clone());
    }
    if let Some(url) = &args.endpoint_url {
        ctx = ctx.with_endpoint_url(url.clone());
    }
    Ok(ctx)
}
