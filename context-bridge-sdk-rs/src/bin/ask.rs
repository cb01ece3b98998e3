//! `bridge-ask`: ask a running bridge one question from the command line

use clap::Parser;
use context_bridge::{BridgeClient, SdkError};
use std::process::ExitCode;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "bridge-ask", about = "Ask the model through a Context Bridge")]
struct Args {
    /// Question to send
    message: String,

    /// Session to continue; a fresh `chat-xxxxxxxx` id is generated when omitted
    session_id: Option<String>,

    /// Bridge WebSocket endpoint
    #[arg(long, env = "BRIDGE_URL", default_value = "ws://127.0.0.1:8080/ws")]
    url: String,

    /// Seconds to wait for the reply
    #[arg(long, default_value_t = 45)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let session_id = args.session_id.clone().unwrap_or_else(|| {
        let id = uuid::Uuid::new_v4().simple().to_string();
        format!("chat-{}", &id[..8])
    });

    println!("Session:  {session_id}");
    println!("Question: {}", args.message);

    match ask(&args, &session_id).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

async fn ask(args: &Args, session_id: &str) -> Result<(), SdkError> {
    let mut client = BridgeClient::connect(&args.url)
        .await?
        .with_reply_timeout(Duration::from_secs(args.timeout));

    let reply = client.ask(&args.message, Some(session_id)).await?;
    println!();
    println!("Claude: {}", reply.response);
    println!();
    println!("Context: {} messages", reply.context_length);
    println!("Session: {}", reply.session_id);

    client.close().await
}
