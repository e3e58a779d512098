use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "pingctl")]
#[command(about = "Management CLI for the pingd host registry", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Daemon version and host count
    Status,
    /// List monitored hosts with their statistics
    List,
    /// Show one host
    Get { id: String },
    /// Start monitoring an address
    Add {
        address: String,
        /// Registry key (defaults to the address)
        #[arg(long)]
        id: Option<String>,
    },
    /// Stop monitoring a host
    Remove { id: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Status => client.get(format!("{}/status", base)).send().await?,
        Commands::List => client.get(format!("{}/hosts", base)).send().await?,
        Commands::Get { id } => client.get(format!("{}/hosts/{}", base, id)).send().await?,
        Commands::Add { address, id } => {
            let body = json!({ "id": id, "address": address });
            client.post(format!("{}/hosts", base)).json(&body).send().await?
        }
        Commands::Remove { id } => client.delete(format!("{}/hosts/{}", base, id)).send().await?,
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: pingd returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let text = res.text().await?;
    if text.is_empty() {
        println!("{}", status);
        return Ok(());
    }
    let json: Value = serde_json::from_str(&text)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
