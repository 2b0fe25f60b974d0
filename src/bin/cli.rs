//! SSMP CLI Client
//!
//! Command-line interface for interacting with an SSMP server.

use clap::{Parser, Subcommand};
use ssmp::protocol::{Reply, Token};
use ssmp::Client;
use tracing_subscriber::{fmt, EnvFilter};

/// SSMP CLI
#[derive(Parser, Debug)]
#[command(name = "ssmp-cli")]
#[command(about = "CLI for the SSMP key-value store")]
struct Args {
    /// Server host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = 6380)]
    port: u16,

    /// Largest accepted reply payload in MB
    #[arg(short = 'm', long, default_value_t = 16)]
    max_payload_mb: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ping the server
    Ping,

    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Check whether a key exists
    Exists {
        /// The key to check
        key: String,
    },

    /// Run the PING/SET/GET/EXISTS/DEL walkthrough against the server
    Demo,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    let mut client =
        Client::new(&addr).with_max_payload_size(args.max_payload_mb.saturating_mul(1024 * 1024));
    if let Err(e) = client.connect() {
        eprintln!("Could not connect to {}: {}", addr, e);
        std::process::exit(1);
    }

    let ok = match args.command {
        Commands::Demo => run_demo(&mut client),
        Commands::Ping => print_reply(client.call(&["PING"])),
        Commands::Get { key } => print_reply(client.call(&["GET", key.as_str()])),
        Commands::Set { key, value } => {
            print_reply(client.call(&["SET", key.as_str(), value.as_str()]))
        }
        Commands::Del { key } => print_reply(client.call(&["DEL", key.as_str()])),
        Commands::Exists { key } => print_reply(client.call(&["EXISTS", key.as_str()])),
    };

    if !ok {
        std::process::exit(1);
    }
}

fn print_reply(reply: ssmp::Result<Reply>) -> bool {
    match reply {
        Ok(reply) => {
            println!("{}", reply);
            matches!(reply, Reply::Ok(_))
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            false
        }
    }
}

fn run_demo(client: &mut Client) -> bool {
    let text = |s: &str| Token::text(s);
    let steps: Vec<(&str, Vec<&str>, Reply)> = vec![
        ("Pinging server", vec!["PING"], Reply::Ok(vec![text("PONG")])),
        ("Setting 'user:1' to 'Alice'", vec!["SET", "user:1", "Alice"], Reply::Ok(vec![])),
        ("Getting 'user:1'", vec!["GET", "user:1"], Reply::Ok(vec![text("Alice")])),
        ("Checking 'user:1' exists", vec!["EXISTS", "user:1"], Reply::Ok(vec![Token::Count(1)])),
        ("Deleting 'user:1'", vec!["DEL", "user:1"], Reply::Ok(vec![Token::Count(1)])),
        ("Checking 'user:1' again", vec!["EXISTS", "user:1"], Reply::Ok(vec![Token::Count(0)])),
        ("Getting deleted 'user:1'", vec!["GET", "user:1"], Reply::Err("NOT_FOUND".to_string())),
    ];

    for (i, (label, request, expected)) in steps.into_iter().enumerate() {
        println!("{}. {}...", i + 1, label);
        match client.call(request.as_slice()) {
            Ok(reply) if reply == expected => println!("   -> {}", reply),
            Ok(reply) => {
                println!("   -> {} (expected {})", reply, expected);
                return false;
            }
            Err(e) => {
                eprintln!("   -> error: {}", e);
                return false;
            }
        }
    }

    println!("All steps passed");
    true
}
