//! Command-line interface for the HubBridge device bridge core.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use hubbridge_commands::config::env_vars;
use hubbridge_commands::{Bridge, BridgeConfig};
use hubbridge_protocol::{
    decode_frame, encode, encode_frame, frame_bytes_from_base64, hex_to_two_items,
    is_valid_checksum, status_to_action_code, AbstractCommand, TransportKind, PAYLOAD_LEN,
};

/// HubBridge - inspect frames and command payloads.
#[derive(Parser, Debug)]
#[command(name = "hubbridge")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Command,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// BLE frame utilities.
    Frame {
        #[command(subcommand)]
        frame_cmd: FrameCommand,
    },
    /// Encode a command into its per-transport payloads.
    Command {
        /// Command JSON, e.g. {"cmd": "brightness", "value": 50}.
        json: String,
    },
    /// Print the effective configuration.
    Config {
        /// Also build the bridge core to check the configuration.
        #[arg(long)]
        check: bool,
    },
}

/// Frame subcommands.
#[derive(Subcommand, Debug)]
enum FrameCommand {
    /// Build a base64 frame from hex bytes (marker first, at most 19 bytes).
    Encode {
        /// Hex bytes, e.g. `33 01 01` or `330101`.
        #[arg(required = true)]
        bytes: Vec<String>,
    },
    /// Show the hex bytes of a base64 frame.
    Decode {
        /// Base64 frame.
        frame: String,
    },
    /// Turn a status frame into the matching action frame.
    ToAction {
        /// Base64 status frame.
        frame: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Check if JSON logging is requested
    let json_logging = std::env::var(env_vars::LOG_JSON)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false);

    let default_level = if args.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "hubbridge={0},hubbridge_commands={0},hubbridge_protocol={0}",
            default_level
        ))
        .add_directive(tracing::Level::WARN.into())
    });

    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    }

    match args.command {
        Command::Frame { frame_cmd } => run_frame_cmd(frame_cmd),
        Command::Command { json } => run_command(&json),
        Command::Config { check } => run_config(check).await,
    }
}

fn run_frame_cmd(cmd: FrameCommand) -> Result<()> {
    match cmd {
        FrameCommand::Encode { bytes } => {
            let bytes = parse_hex_bytes(&bytes.concat())?;
            if bytes.len() > PAYLOAD_LEN {
                bail!(
                    "A frame carries at most {} bytes before the checksum, got {}",
                    PAYLOAD_LEN,
                    bytes.len()
                );
            }
            println!("{}", encode_frame(&bytes));
        }
        FrameCommand::Decode { frame } => {
            let items = decode_frame(&frame);
            if items.is_empty() {
                bail!("Not a base64 frame: {}", frame);
            }
            println!("{}", items.join(" "));

            match frame_bytes_from_base64(&frame) {
                Ok(raw) if is_valid_checksum(&raw) => println!("checksum: ok"),
                Ok(_) => println!("checksum: mismatch"),
                Err(e) => println!("checksum: not checked ({})", e),
            }
        }
        FrameCommand::ToAction { frame } => {
            let action = status_to_action_code(&frame)
                .with_context(|| format!("Not a 20-byte status frame: {}", frame))?;
            println!("{}", action);
        }
    }
    Ok(())
}

fn run_command(json: &str) -> Result<()> {
    let value: serde_json::Value = serde_json::from_str(json).context("Invalid command JSON")?;
    let cmd = value
        .get("cmd")
        .and_then(|c| c.as_str())
        .context("Command JSON needs a string \"cmd\" field")?;
    let arg = value.get("value").cloned().unwrap_or(serde_json::Value::Null);

    let command = AbstractCommand::from_parts(cmd, arg)?;
    let payloads = encode(&command)?;

    println!("{}", serde_json::to_string_pretty(&payloads)?);
    if let Some(ble) = &payloads.ble {
        tracing::debug!(transport = %TransportKind::Ble, "Frame {}", ble.to_base64());
    }
    Ok(())
}

async fn run_config(check: bool) -> Result<()> {
    let config = BridgeConfig::from_env();
    println!("{}", serde_json::to_string_pretty(&config)?);

    if check {
        let (_bridge, _inbound) =
            Bridge::new(config, Vec::new()).context("Configuration rejected")?;
        println!("configuration: ok");
    }
    Ok(())
}

fn parse_hex_bytes(hex: &str) -> Result<Vec<u8>> {
    let compact: String = hex.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.len() % 2 != 0 || !compact.is_ascii() {
        bail!("Expected pairs of hex digits, got {}", compact);
    }
    hex_to_two_items(&compact)
        .iter()
        .map(|pair| {
            u8::from_str_radix(pair, 16).with_context(|| format!("Invalid hex byte: {}", pair))
        })
        .collect()
}
