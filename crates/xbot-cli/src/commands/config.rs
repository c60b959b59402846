use std::path::Path;
use xbot_core::Config;

const SAMPLE_CONFIG: &str = r#"# xbot agent settings

server:
  url: https://api.practitest.com
  api_key: ""
  api_secret: ""
  client_id: ""
  # proxy:
  #   host: proxy.example.com
  #   port: 3128
  #   user: alice
  #   password: secret
  accept_invalid_certs: false

scheduler:
  poll_delay_secs: 60
  initial_delay_secs: 3
  log_capacity: 100
"#;

pub fn run(config_path: &Path, path: bool, init: bool) -> anyhow::Result<()> {
    if path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config already exists at: {}", config_path.display());
            println!("Remove it first if you want to reinitialize.");
            return Ok(());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(config_path, SAMPLE_CONFIG)?;
        println!("Sample config written to: {}", config_path.display());
        return Ok(());
    }

    println!("Config path: {}", config_path.display());
    if config_path.exists() {
        let config = Config::load_from(config_path)?;
        println!("Server:      {}", config.server.url);
        println!(
            "Client ID:   {}",
            if config.server.client_id.is_empty() { "-" } else { &config.server.client_id }
        );
        println!(
            "Configured:  {}",
            if config.client_settings().is_some() { "yes" } else { "no" }
        );
        println!(
            "Polling:     every {}s (first after {}s)",
            config.scheduler.poll_delay_secs, config.scheduler.initial_delay_secs
        );
    } else {
        println!("Status:      not found");
        println!("Run `xbot config --init` to create one.");
    }

    Ok(())
}
