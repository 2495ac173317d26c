//! cmdwire controller: sends one command to an agent and prints the reply.
//!
//! ```bash
//! cmdwire-controller dir /tmp
//! cmdwire-controller photo screen.jpg --output sent_screen.jpg
//! cmdwire-controller raw DIR --params '{"path": "."}'
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use cmdwire::protocol::Params;
use cmdwire::transport::{DEFAULT_HOST, DEFAULT_PORT};
use cmdwire::{Reply, Session};
use serde_json::Value;

#[derive(Debug, Parser)]
#[command(name = "cmdwire-controller", version, about = "Send a command to a cmdwire agent")]
struct Args {
    /// Agent host
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Agent port
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    #[command(subcommand)]
    action: Action,
}

#[derive(Debug, Subcommand)]
enum Action {
    /// List `*.*` entries of a directory
    Dir {
        #[arg(default_value = ".")]
        path: String,
    },
    /// Delete a file
    Delete { file_path: String },
    /// Copy a file
    Copy { source: String, destination: String },
    /// Launch a program
    Execute { program_path: String },
    /// Capture the agent's screen
    Screenshot {
        #[arg(default_value = "screen.jpg")]
        save_path: String,
    },
    /// Download an image
    Photo {
        image_path: String,
        /// Where to write the received bytes
        #[arg(long, default_value = "sent_screen.jpg")]
        output: PathBuf,
    },
    /// Send any command with JSON parameters
    Raw {
        command: String,
        #[arg(long, default_value = "{}")]
        params: String,
    },
}

fn print_reply(reply: &Reply) {
    println!("[{}] {}", reply.status.as_str().to_uppercase(), reply.message);
    for file in reply.files() {
        println!("  {}", file);
    }
}

fn parse_params(raw: &str) -> Result<Params, String> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("--params must be a JSON object, got {}", other)),
        Err(e) => Err(format!("--params is not valid JSON: {}", e)),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    let mut session = match Session::connect(&addr).await {
        Ok(session) => session,
        Err(e) => {
            eprintln!("[ERROR] {}", e);
            return ExitCode::FAILURE;
        }
    };

    let reply = match args.action {
        Action::Dir { path } => session.dir(&path).await,
        Action::Delete { file_path } => session.delete(&file_path).await,
        Action::Copy {
            source,
            destination,
        } => session.copy(&source, &destination).await,
        Action::Execute { program_path } => session.execute(&program_path).await,
        Action::Screenshot { save_path } => session.take_screenshot(Some(&save_path)).await,
        Action::Photo { image_path, output } => {
            let reply = session.send_photo(&image_path).await;
            if let Some(bytes) = &reply.binary {
                match tokio::fs::write(&output, bytes).await {
                    Ok(()) => println!("Saved {} bytes to {}", bytes.len(), output.display()),
                    Err(e) => eprintln!("[ERROR] Failed to write {}: {}", output.display(), e),
                }
            }
            reply
        }
        Action::Raw { command, params } => match parse_params(&params) {
            Ok(params) => session.request(&command, params).await,
            Err(message) => Reply::error(message),
        },
    };

    print_reply(&reply);
    if session.is_connected() {
        session.exit().await;
    }

    if reply.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
