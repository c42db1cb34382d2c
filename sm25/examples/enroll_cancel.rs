//! Start an enrollment, then disconnect mid-way
//!
//! The reader sends the cancel command on close so the device does not stay
//! waiting for a finger.

use std::time::Duration;

use sm25::{Command, Reader, SendCommand};
use tokio::time::sleep;

#[tokio::main]
async fn main() -> sm25::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let ip = std::env::var("READER_IP").unwrap_or_else(|_| "192.168.0.200".to_string());

    let reader = Reader::new(ip, sm25::DEFAULT_PORT);
    reader.connect().await;

    if !reader.is_connected() {
        println!("Reader unreachable");
        return Ok(());
    }

    // Enroll into slot 1
    reader.send(SendCommand::new(Command::Enroll, &[1, 0])?).await?;
    reader.enrollment().begin();

    // Ignored while enrolling
    reader
        .send(SendCommand::new(Command::GetFwVersion, &[])?)
        .await?;

    sleep(Duration::from_secs(3)).await;

    println!("Closing mid-enrollment...");
    reader.close().await;

    println!("Done!");
    Ok(())
}
