//! generation-gateway CLI: submit generations and follow them from a terminal.
//!
//! Usage:
//!   generation-gateway submit --template <t> --style <s> [--topic <text>] [--mode <m>] [--param k=v]...
//!   generation-gateway status <generation-id>
//!   generation-gateway cancel <generation-id>
//!   generation-gateway watch <generation-id>

use anyhow::{anyhow, bail, Context};
use generation_gateway::{
    GatewayClient, GenerationMode, GenerationRequest, GenerationState, ProgressEvent,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let outcome = match args[1].as_str() {
        "submit" => cmd_submit(&args[2..]).await,
        "status" => cmd_status(&args[2..]).await,
        "cancel" => cmd_cancel(&args[2..]).await,
        "watch" => cmd_watch(&args[2..]).await,
        "version" | "--version" | "-V" => {
            cmd_version();
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = outcome {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!(
        r#"generation-gateway: submit and follow content generations

USAGE:
    generation-gateway <COMMAND> [OPTIONS]

COMMANDS:
    submit --template <t> --style <s>   Submit a generation and print the result
        [--topic <text>]                 Topic (synthesized when omitted)
        [--mode standard|async|streaming]
        [--param key=value]...           Extra parameters (values parsed as JSON when possible)
    status <generation-id>              Show backend status
    cancel <generation-id>              Ask the backend to cancel
    watch <generation-id>               Follow progress until a terminal state
    version                             Show version information
    help                                Show this help message

ENVIRONMENT:
    GENERATION_API_URL                  Backend base URL (default http://localhost:8000)
    GENERATION_WS_URL                   WebSocket base URL (derived from the API URL)
    GENERATION_API_KEY                  Bearer token
    RUST_LOG                            Log filter (default info)"#
    );
}

fn cmd_version() {
    println!("generation-gateway {}", env!("CARGO_PKG_VERSION"));
}

fn flag_values<'a>(args: &'a [String], flag: &str) -> Vec<&'a str> {
    args.iter()
        .enumerate()
        .filter(|(_, a)| a.as_str() == flag)
        .filter_map(|(i, _)| args.get(i + 1).map(String::as_str))
        .collect()
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    flag_values(args, flag).into_iter().last()
}

fn positional_id(args: &[String]) -> anyhow::Result<&str> {
    args.first()
        .map(String::as_str)
        .filter(|s| !s.starts_with('-'))
        .ok_or_else(|| anyhow!("missing <generation-id>"))
}

fn parse_mode(s: &str) -> anyhow::Result<GenerationMode> {
    match s {
        "standard" => Ok(GenerationMode::Standard),
        "async" => Ok(GenerationMode::Async),
        "streaming" => Ok(GenerationMode::Streaming),
        other => bail!("unknown mode '{other}' (expected standard, async or streaming)"),
    }
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn cmd_submit(args: &[String]) -> anyhow::Result<()> {
    let template = flag_value(args, "--template").unwrap_or_default();
    let style = flag_value(args, "--style").unwrap_or_default();
    let mut request = GenerationRequest::new(template, style);
    if let Some(topic) = flag_value(args, "--topic") {
        request = request.with_topic(topic);
    }
    if let Some(mode) = flag_value(args, "--mode") {
        request = request.with_mode(parse_mode(mode)?);
    }
    for pair in flag_values(args, "--param") {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("--param expects key=value, got '{pair}'"))?;
        let value = serde_json::from_str(raw).unwrap_or_else(|_| serde_json::json!(raw));
        request = request.with_parameter(key, value);
    }

    let client = GatewayClient::from_env()?;
    let submission = client
        .submit_tracked(&request)
        .await
        .context("generation failed")?;
    print_json(&submission.result)?;

    if let Some(e) = &submission.channel_error {
        eprintln!("progress channel unavailable: {e}");
    }
    if let Some(handle) = submission.progress {
        follow(handle).await?;
    }
    Ok(())
}

async fn cmd_status(args: &[String]) -> anyhow::Result<()> {
    let id = positional_id(args)?;
    let client = GatewayClient::from_env()?;
    let snapshot = client.status(id).await?;
    print_json(&snapshot)
}

async fn cmd_cancel(args: &[String]) -> anyhow::Result<()> {
    let id = positional_id(args)?;
    let client = GatewayClient::from_env()?;
    let ack = client.cancel(id).await;
    print_json(&ack)
}

async fn cmd_watch(args: &[String]) -> anyhow::Result<()> {
    let id = positional_id(args)?;
    let client = GatewayClient::from_env()?;
    let handle = client.open_progress(id).await?;
    follow(handle).await
}

async fn follow(handle: generation_gateway::ProgressHandle) -> anyhow::Result<()> {
    handle.on_update(|event| match event {
        ProgressEvent::Status {
            state,
            progress,
            current_step,
        } => eprintln!(
            "[{state}] {progress:>3}% {}",
            current_step.as_deref().unwrap_or("")
        ),
        ProgressEvent::Agent(update) => eprintln!("  {} {}", update.agent, update.action),
        ProgressEvent::ConnectionLost { reason } => eprintln!(
            "connection lost: {}",
            reason.as_deref().unwrap_or("peer closed")
        ),
        _ => {}
    });

    let finished = handle.wait_terminal().await?;
    print_json(&finished)?;
    if finished.state == GenerationState::Error {
        bail!(
            "generation failed: {}",
            finished.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}
