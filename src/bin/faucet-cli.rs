use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "faucet-cli")]
#[command(about = "Command-line client for the testnet faucet", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the faucet is up
    Health,
    /// Show faucet account, network and payout
    Info,
    /// Request a payout to an address
    Claim {
        /// Destination address (0x-prefixed hex)
        address: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Health => {
            let res = client.get(format!("{}/health", base)).send().await?;
            let status = res.status();
            let body = res.text().await?;
            if status.is_success() {
                println!("{}", body);
            } else {
                eprintln!("Error: faucet returned status {}: {}", status, body);
            }
        }
        Commands::Info => {
            let res = client.get(format!("{}/api/info", base)).send().await?;
            print_response(res).await?;
        }
        Commands::Claim { address } => {
            let res = client
                .post(format!("{}/api/claim", base))
                .json(&json!({ "address": address }))
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    match serde_json::from_str::<Value>(&text) {
        Ok(json) if status.is_success() => {
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        Ok(json) => {
            let message = json
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or(text.as_str());
            eprintln!("Error ({}): {}", status, message);
        }
        Err(_) => {
            eprintln!("Error: faucet returned status {}", status);
            eprintln!("Response: {}", text);
        }
    }
    Ok(())
}
