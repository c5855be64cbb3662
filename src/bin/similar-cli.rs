use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "similar-cli")]
#[command(about = "Client and management CLI for the similar-products service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:5000")]
    url: String,

    /// Admin API key
    #[arg(short, long, default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch products similar to the given id
    Similar { product_id: String },
    /// Check service status
    Status,
    /// Show circuit breaker state per dependency
    Breakers,
    /// Force a dependency's circuit breaker back to CLOSED
    ResetBreaker { name: String },
    /// Show response cache size
    Cache,
    /// Drop cached responses whose key contains PATTERN (all if omitted)
    Invalidate {
        #[arg(short, long)]
        pattern: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let request = match &cli.command {
        Commands::Similar { product_id } => {
            client.get(format!("{}/product/{}/similar", base, product_id))
        }
        Commands::Status => admin(&client, Method::GET, base, "status", &headers),
        Commands::Breakers => admin(&client, Method::GET, base, "breakers", &headers),
        Commands::ResetBreaker { name } => admin(
            &client,
            Method::POST,
            base,
            &format!("breakers/{}/reset", name),
            &headers,
        ),
        Commands::Cache => admin(&client, Method::GET, base, "cache", &headers),
        Commands::Invalidate { pattern } => {
            let request = admin(&client, Method::DELETE, base, "cache", &headers);
            match pattern {
                Some(pattern) => request.query(&[("pattern", pattern)]),
                None => request,
            }
        }
    };

    print_response(request.send().await?).await
}

fn admin(
    client: &reqwest::Client,
    method: Method,
    base: &str,
    resource: &str,
    headers: &HeaderMap,
) -> reqwest::RequestBuilder {
    client
        .request(method, format!("{}/admin/{}", base, resource))
        .headers(headers.clone())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
