use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use common_types::{LoginRequest, PinId, RegisterRequest};
use pinboard_client::{
    navigation::ChannelNavigator, status::RequestStatus, types::Environment, PinboardStore,
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "pinboard", about = "Drive a pinboard session from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every pin
    Pins,
    /// Show a single pin
    Pin { id: PinId },
    /// List the comments of a pin
    Comments { pin: PinId },
    /// Create an account
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "PINBOARD_PASSWORD")]
        password: String,
    },
    /// Check credentials against the token endpoint
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "PINBOARD_PASSWORD")]
        password: String,
    },
    /// Upload an image and print its public URL
    Upload {
        path: PathBuf,
        /// Object name, defaults to the file name
        #[arg(long)]
        name: Option<String>,
    },
}

fn print_status(request: &RequestStatus) {
    if let (Some(status), Some(message)) = (request.status, &request.message) {
        println!("[{status}] {message}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let environment = Environment::from_env();

    // JSON logs for staging/production, human readable for development
    match environment {
        Environment::Production | Environment::Staging => {
            fmt()
                .json()
                .with_env_filter(EnvFilter::from_default_env())
                .with_writer(std::io::stderr)
                .init();
        }
        Environment::Development { .. } => {
            fmt()
                .with_env_filter(
                    EnvFilter::builder()
                        .with_default_directive(
                            LevelFilter::from_level(environment.tracing_level()).into(),
                        )
                        .from_env_lossy(),
                )
                .with_writer(std::io::stderr)
                .init();
        }
    }

    let (navigator, mut routes) = ChannelNavigator::channel();
    let store = PinboardStore::from_environment(&environment, Arc::new(navigator))
        .await
        .context("Failed to set up the pinboard client")?;

    let ok = match cli.command {
        Command::Pins => {
            let ok = store.fetch_pins().await;
            for pin in store.pins() {
                println!("{}", serde_json::to_string(&pin)?);
            }
            ok
        }
        Command::Pin { id } => {
            let ok = store.fetch_pins().await;
            match store.single_pin(id) {
                Some(pin) => println!("{}", serde_json::to_string_pretty(&pin)?),
                None if ok => println!("Pin {id} not found"),
                None => {}
            }
            ok && store.single_pin(id).is_some()
        }
        Command::Comments { pin } => {
            let ok = store.fetch_comments(pin).await;
            for comment in store.comments() {
                println!("{}", serde_json::to_string(&comment)?);
            }
            ok
        }
        Command::Register {
            username,
            email,
            password,
        } => {
            store
                .register(RegisterRequest {
                    username,
                    email,
                    password,
                })
                .await
        }
        Command::Login { username, password } => {
            let ok = store.login(LoginRequest { username, password }).await;
            if let Some(user) = store.user() {
                println!("Logged in as {}", user.username);
            }
            ok
        }
        Command::Upload { path, name } => {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let filename = match name {
                Some(name) => name,
                None => path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .context("Path has no usable file name, pass --name")?
                    .to_string(),
            };

            let ok = store.upload_image(filename, bytes).await;
            if let Some(image) = store.image() {
                println!("{}", image.public_url);
            }
            ok
        }
    };

    print_status(&store.request());
    while let Ok(route) = routes.try_recv() {
        println!("-> {route}");
    }
    store.shutdown();

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
