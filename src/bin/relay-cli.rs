use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Submit test forms to a running form relay", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3001")]
    url: String,

    /// Sent as the `Origin` header.
    #[arg(short, long)]
    origin: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the relay is up
    Health,
    /// POST a JSON file to a form endpoint
    Submit {
        #[arg(value_enum)]
        form: Form,
        /// Path to the JSON body
        file: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Form {
    Contact,
    Checkup,
    Quiz,
}

impl Form {
    fn path(self) -> &'static str {
        match self {
            Form::Contact => "/api/contact-form",
            Form::Checkup => "/api/send-email",
            Form::Quiz => "/api/submit-quiz",
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut request = match cli.command {
        Commands::Health => client.get(format!("{}/health", base)),
        Commands::Submit { form, file } => {
            let body: Value = serde_json::from_str(&std::fs::read_to_string(file)?)?;
            client.post(format!("{}{}", base, form.path())).json(&body)
        }
    };
    if let Some(origin) = cli.origin {
        request = request.header(reqwest::header::ORIGIN, origin);
    }

    print_response(request.send().await?).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    let rendered = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };

    if status.is_success() {
        println!("{}", rendered);
    } else {
        eprintln!("Error: relay returned status {}", status);
        eprintln!("Response: {}", rendered);
        std::process::exit(1);
    }
    Ok(())
}
