use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "statestore-cli")]
#[command(about = "Management CLI for the state store daemon", long_about = None)]
struct Cli {
    /// Diagnostic webserver base URL
    #[arg(short, long, default_value = "http://localhost:25010")]
    webserver: String,

    /// State store API base URL
    #[arg(short, long, default_value = "http://localhost:24000")]
    store: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Version, hostname, uptime and CPU summary
    Status,
    /// Effective configuration
    Flags,
    /// Recent log lines
    Logs {
        #[arg(short = 'n', long)]
        lines: Option<usize>,
    },
    /// Prometheus metrics
    Metrics,
    /// Published membership and subscriptions
    Members,
    /// Register a member of a service
    Register {
        service_id: String,
        member_id: String,
        address: String,
    },
    /// Remove a member from a service
    Unregister {
        service_id: String,
        member_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let res = match cli.command {
        Commands::Status => client.get(format!("{}/", cli.webserver)).send().await?,
        Commands::Flags => client.get(format!("{}/varz", cli.webserver)).send().await?,
        Commands::Logs { lines } => {
            let mut req = client.get(format!("{}/logs", cli.webserver));
            if let Some(lines) = lines {
                req = req.query(&[("lines", lines)]);
            }
            req.send().await?
        }
        Commands::Metrics => client.get(format!("{}/metrics", cli.webserver)).send().await?,
        Commands::Members => {
            client
                .get(format!("{}/state_store", cli.webserver))
                .send()
                .await?
        }
        Commands::Register {
            service_id,
            member_id,
            address,
        } => {
            client
                .post(format!("{}/services/{}/members", cli.store, service_id))
                .json(&json!({ "member_id": member_id, "address": address }))
                .send()
                .await?
        }
        Commands::Unregister {
            service_id,
            member_id,
        } => {
            client
                .delete(format!(
                    "{}/services/{}/members/{}",
                    cli.store, service_id, member_id
                ))
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
        if !text.is_empty() {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) if text.is_empty() => println!("{}", status),
        Err(_) => print!("{}", text),
    }
    Ok(())
}
