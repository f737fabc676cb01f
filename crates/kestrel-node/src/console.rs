//! Operator commands read line by line from standard input.
//!
//! ```text
//! order <location> <operation>
//! withdraw-order <name>
//! withdraw-job <name>
//! ```

use std::io::BufRead;
use std::str::FromStr;
use std::sync::Arc;

use kestrel_core::{Destination, Result, TransportOrderCreation};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::engine::Engine;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Order { location: String, operation: String },
    WithdrawOrder(String),
    WithdrawJob(String),
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> anyhow::Result<Self> {
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            ["order", location, operation] => Ok(Command::Order {
                location: location.to_string(),
                operation: operation.to_string(),
            }),
            ["withdraw-order", name] => Ok(Command::WithdrawOrder(name.to_string())),
            ["withdraw-job", name] => Ok(Command::WithdrawJob(name.to_string())),
            _ => anyhow::bail!("Unknown command: {}", line.trim()),
        }
    }
}

impl Command {
    pub async fn execute(self, engine: &Engine) -> Result<()> {
        match self {
            Command::Order {
                location,
                operation,
            } => {
                let creation = TransportOrderCreation::builder("Order-")
                    .incomplete_name(true)
                    .destination(Destination::new(location, operation))
                    .build()?;
                engine.submit_order(creation)?;
            }
            Command::WithdrawOrder(name) => engine.withdraw_order(&name).await?,
            Command::WithdrawJob(name) => engine.withdraw_job(&name).await?,
        }
        Ok(())
    }
}

/// Forward lines from standard input until it is closed.
///
/// Reading happens on a plain thread so a pending read never holds up shutdown.
pub fn read_stdin() -> mpsc::Receiver<String> {
    let (lines, receiver) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if lines.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Failed to read from stdin: {}", e);
                    break;
                }
            }
        }
    });
    receiver
}

/// Execute every received line as a command.
pub async fn run(engine: Arc<Engine>, mut lines: mpsc::Receiver<String>) {
    while let Some(line) = lines.recv().await {
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<Command>() {
            Ok(command) => {
                if let Err(e) = command.execute(&engine).await {
                    warn!("{}: {}", line.trim(), e);
                }
            }
            Err(e) => warn!("{}", e),
        }
    }
    info!("Console closed");
}
