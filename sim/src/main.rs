use std::error::Error;

use sim::{RobotConfig, Simulator};

/// Usage: `sim [ADDR] [CONFIG.json]`
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let addr = args.next().unwrap_or_else(|| "0.0.0.0:6001".to_string());
    let config = match args.next() {
        Some(path) => RobotConfig::load(path)?,
        None => RobotConfig::default(),
    };

    let mut simulator = Simulator::start(&addr, config).await?;
    simulator.wait().await?;
    Ok(())
}
