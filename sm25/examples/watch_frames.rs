//! Connect to a reader and print every event until Ctrl-C

use sm25::{Command, Reader, ReaderEvent, SendCommand};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> sm25::Result<()> {
    // Initialize logging (override with RUST_LOG=sm25=trace)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sm25=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Change to your reader IP
    let ip = std::env::var("READER_IP").unwrap_or_else(|_| "192.168.0.200".to_string());

    let reader = Reader::new(ip, sm25::DEFAULT_PORT);
    let mut events = reader.subscribe();

    reader.connect().await;
    if !reader.is_connected() {
        println!("✗ Reader unreachable");
        return Ok(());
    }
    println!("✓ Connected!");

    reader
        .send(SendCommand::new(Command::TestConnection, &[])?)
        .await?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(ReaderEvent::FrameReceived(frame)) => println!("< {}", frame),
                Ok(ReaderEvent::CommandSent(command)) => println!("> {}", command),
                Ok(ReaderEvent::ConnectionStateChanged(status)) => {
                    println!("= {}", status);
                }
                Err(e) => {
                    println!("✗ {}", e);
                    break;
                }
            },
        }
    }

    reader.close().await;
    println!("✓ Disconnected");

    Ok(())
}
