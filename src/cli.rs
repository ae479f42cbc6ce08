use std::path::PathBuf;

use clap::Parser;

use crate::config::RootConfig;
use crate::error::Result;
use crate::ingest::Ingestor;
use crate::server::{self, ServerConfig};

#[derive(Parser)]
pub struct Cli {
  #[clap(subcommand)]
  subcmd: SubCommand,

  /// Path to the YAML configuration file
  #[clap(long, short, env = "FOLIO_CONFIG")]
  config: PathBuf,
}

#[derive(Parser)]
enum SubCommand {
  /// Run the HTTP server
  Server(ServerConfig),
  /// Fetch the blog feed once and print the normalized entries as JSON
  Fetch,
}

impl Cli {
  pub async fn run(self) -> Result<()> {
    let config = RootConfig::load_from_file(&self.config)?;

    match self.subcmd {
      SubCommand::Server(server_config) => {
        server::serve(server_config, config).await
      }
      SubCommand::Fetch => fetch(config).await,
    }
  }
}

// Exercises the ingestion path without standing up the server.
async fn fetch(config: RootConfig) -> Result<()> {
  let client = config.client.build()?;
  let ingestor = Ingestor::new(&config.blog, client);
  let entries = ingestor.ingest().await?;

  println!("{}", serde_json::to_string_pretty(&entries)?);
  Ok(())
}
