// ABOUTME: Demo application sending one SMS through an SSMI gateway
// ABOUTME: Shows ClientBuilder::quick for connect and login, then waits for the gateway's SEQ

use argh::FromArgs;
use ssmi::client::{ClientBuilder, Event};
use std::error::Error;
use std::time::Duration;

/// Send a single SMS over SSMI and print what the gateway says back
#[derive(FromArgs)]
struct CliArgs {
    /// whether or not to enable debugging
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// the gateway username
    #[argh(option, short = 'u')]
    username: Option<String>,

    /// the password
    #[argh(option)]
    password: Option<String>,

    /// the hostname or IP address of the gateway (default: localhost)
    #[argh(option)]
    host: Option<String>,

    /// the port to use when connecting to the gateway (default: 2020)
    #[argh(option, short = 'p')]
    port: Option<u32>,

    /// the message to send
    #[argh(option, short = 'm')]
    message: String,

    /// the recipient telephone number
    #[argh(option, short = 't')]
    to: String,

    /// seconds to keep listening for delivery reports (default: 0)
    #[argh(option, short = 'w')]
    wait: Option<u64>,
}

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli_args: CliArgs = argh::from_env();

    let level = if cli_args.debugging {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let host = cli_args.host.unwrap_or_else(|| "localhost".to_owned());
    let port = cli_args.port.unwrap_or(2020);
    let username = cli_args.username.unwrap_or_default();
    let password = cli_args.password.unwrap_or_default();

    let client = ClientBuilder::quick(format!("{host}:{port}"), username, password)
        .await
        .map_err(|e| {
            eprintln!("Connection/login failed: {e}");
            e
        })?;

    println!("Connected and authenticated");

    let seq = client
        .send_message(&cli_args.to, &cli_args.message, None)
        .await?
        .await?;
    println!("Message accepted, gateway sequence {}", seq.sequence);

    let wait = Duration::from_secs(cli_args.wait.unwrap_or(0));
    let listen = async {
        while let Some(event) = client.next_event().await {
            match event {
                Event::DeliveryReport(dr) if dr.sequence == seq.sequence => {
                    println!("Delivery report: {:?}", dr.result());
                    break;
                }
                other => println!("<- {other:?}"),
            }
        }
    };
    if tokio::time::timeout(wait, listen).await.is_err() && !wait.is_zero() {
        println!("No delivery report within {}s", wait.as_secs());
    }

    client.logout().await?;
    client.close().await?;
    println!("Logged out");

    Ok(())
}
