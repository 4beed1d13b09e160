//! Example walking through configuration and a simulated talk/quiet cycle
//!
//! Run with: cargo run --package audiotrigger-core --example config_demo

use audiotrigger_core::domain::config::RelayConfig;
use audiotrigger_core::domain::cue::{CueSink, Delivery, OutboundMessage, Result};
use audiotrigger_core::domain::dispatcher::Dispatcher;
use audiotrigger_core::domain::sample::Sample;

/// Prints cues instead of sending them
struct StdoutSink;

impl CueSink for StdoutSink {
    fn send(&self, message: &OutboundMessage) -> Result<Delivery> {
        println!("   -> {}", message.to_json()?);
        Ok(Delivery::Sent)
    }

    fn is_connected(&self) -> bool {
        true
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("audiotrigger_core=debug,info")
        .init();

    println!("=== AudioTrigger Configuration Demo ===\n");

    // 1. Save and reload the default configuration
    println!("1. Saving default configuration...");
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("config.toml");
    RelayConfig::default().save_to_file(&path).await?;
    let config = RelayConfig::load_from_file(&path).await?;
    println!("{}", config.to_toml()?);

    // 2. Simulate one speaker on scene "desk"
    let trigger = config.trigger.clone();
    let mut dispatcher = Dispatcher::new(trigger.clone(), StdoutSink);

    println!("2. Speaker talks (volume -10, limit -25)");
    dispatcher.ingest(Sample::new("mic-1", -10, "desk", -25));
    dispatcher.tick();

    println!("3. Speaker goes quiet (volume -40)");
    dispatcher.ingest(Sample::new("mic-1", -40, "desk", -25));
    let mut ticks = 0;
    while dispatcher.tick().is_idle() {
        ticks += 1;
    }
    println!(
        "   quiet for {} ticks of {} ms before the cue",
        ticks + 1,
        trigger.tick_period_ms
    );

    println!("\n=== Demo Complete ===");
    Ok(())
}
