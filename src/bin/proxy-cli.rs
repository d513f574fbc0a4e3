use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Control CLI for the WebDriver blocking proxy", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8111")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or set whether the proxy waits for page stability
    Enabled {
        /// New value; omit to print the current one
        value: Option<bool>,
    },
    /// Show or set the WebDriver server commands are forwarded to
    Upstream {
        /// New address; omit to print the current one
        address: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let (command, value) = match cli.command {
        Commands::Enabled { value } => ("enabled", value.map(Value::Bool)),
        Commands::Upstream { address } => ("selenium_address", address.map(Value::String)),
    };
    let url = format!("{}/stabilize_proxy/{}", base, command);

    let res = match value {
        Some(value) => client.post(url).json(&json!({ "value": value })).send().await?,
        None => client.get(url).send().await?,
    };
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: proxy returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let text = res.text().await?;
    if text.is_empty() {
        println!("OK");
        return Ok(());
    }
    let json: Value = serde_json::from_str(&text)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
