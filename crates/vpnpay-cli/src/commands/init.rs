//! `vpnpay init`: write a default node configuration.

use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (defaults to current directory).
    #[arg(default_value = ".")]
    pub dir: PathBuf,
}

const DEFAULT_CONFIG: &str = r#"# vpnpay node configuration

[api]
listen_addr = "127.0.0.1"
port = 7070

[storage]
data_dir = "./data"

[logging]
level = "info"
format = "text"

[policy]
refund_timeout_secs = 86400
min_collateral = 100

# Accounts funded on first start.
# [[genesis]]
# account = "alice"
# balance = 10000
"#;

pub fn run(args: &InitArgs) -> anyhow::Result<()> {
    let config_path = args.dir.join("vpnpay.toml");

    if config_path.exists() {
        anyhow::bail!("configuration file already exists at {}", config_path.display());
    }

    std::fs::create_dir_all(&args.dir)?;
    std::fs::write(&config_path, DEFAULT_CONFIG)?;
    std::fs::create_dir_all(args.dir.join("data"))?;

    println!("Initialized vpnpay node at {}", config_path.display());
    println!("Run 'vpnpay-node --config {}' to start it.", config_path.display());
    Ok(())
}
