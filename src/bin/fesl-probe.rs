use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use fesl_frontend::protocol::{self, Class, Packet};
use fesl_frontend::transactions::{ADD_ACCOUNT, GET_TOS, HELLO, LOGIN};

/// First client-side request id; clients count up from here.
const CLIENT_ID: u32 = 0xC000_0001;

#[derive(Parser)]
#[command(name = "fesl-probe")]
#[command(about = "Send a single transaction to a plain-TCP front-end and print the replies", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "127.0.0.1:18800")]
    addr: String,

    /// Seconds to wait for each reply.
    #[arg(short, long, default_value_t = 5)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Greeting; expects the advertisement and a keep-alive challenge
    Hello,
    /// Fetch the terms of service
    Tos,
    /// Log in, optionally with an accepted terms version
    Login {
        #[arg(long)]
        tos_version: Option<String>,
    },
    /// Register an account
    AddAccount {
        #[arg(long)]
        nuid: String,
        #[arg(long)]
        password: String,
    },
}

impl Commands {
    fn request(&self) -> (Packet, usize) {
        match self {
            Commands::Hello => (
                Packet::builder(Class::FSYS, CLIENT_ID)
                    .txn(HELLO)
                    .field("clientString", "fesl-probe")
                    .field("sku", "PS3")
                    .build(),
                2,
            ),
            Commands::Tos => (Packet::builder(Class::ACCT, CLIENT_ID).txn(GET_TOS).build(), 1),
            Commands::Login { tos_version } => {
                let mut builder = Packet::builder(Class::ACCT, CLIENT_ID).txn(LOGIN);
                if let Some(version) = tos_version {
                    builder = builder.field("tosVersion", version);
                }
                (builder.build(), 1)
            }
            Commands::AddAccount { nuid, password } => (
                Packet::builder(Class::ACCT, CLIENT_ID)
                    .txn(ADD_ACCOUNT)
                    .field("nuid", nuid)
                    .field("password", password)
                    .build(),
                1,
            ),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let (request, expected) = cli.command.request();

    let mut stream = TcpStream::connect(&cli.addr).await?;
    stream.write_all(&protocol::encode(&request, 0)?).await?;

    let limit = Duration::from_secs(cli.timeout);
    for _ in 0..expected {
        match tokio::time::timeout(limit, protocol::read_frame(&mut stream, u32::MAX)).await {
            Ok(Ok(Some(frame))) => {
                let packet = protocol::decode(&frame)?;
                println!("{}", serde_json::to_string_pretty(&packet)?);
            }
            Ok(Ok(None)) => {
                eprintln!("Error: server closed the connection");
                break;
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                eprintln!("Error: no reply within {}s", cli.timeout);
                break;
            }
        }
    }

    Ok(())
}
