use std::path::PathBuf;

use clap::Parser;

use crate::{
  app::{database::DocumentStore, errors::StagsError, tags::split_tags},
  utils::version,
};

#[derive(Parser, Debug, Clone, Default)]
#[command(author, version = version(), about)]
pub struct Cli {
  #[arg(short, long, value_name = "FILE", help = "read configuration from FILE")]
  pub config: Option<PathBuf>,

  #[arg(
    short,
    long,
    help = "keep documents in memory instead of PostgreSQL",
    default_value_t = false
  )]
  pub memory: bool,

  #[arg(short, long, value_name = "PORT", help = "listen on PORT instead of the configured port")]
  pub port: Option<u16>,

  #[arg(
    short,
    long = "list-tags",
    help = "list every known tag and exit",
    default_value_t = false
  )]
  pub list_tags: bool,

  #[arg(
    short,
    long,
    value_name = "TAGS",
    requires = "uid",
    help = "print the documents of --uid carrying every tag in TAGS and exit"
  )]
  pub query: Option<String>,

  #[arg(short, long, value_name = "ID", help = "user id for --query")]
  pub uid: Option<i32>,

  #[arg(long, help = "apply pending database migrations and exit", default_value_t = false)]
  pub migrate: bool,
}

/// Runs the one-shot commands. `None` means nothing was asked and the server should start.
pub async fn run_cli(args: &Cli, store: &dyn DocumentStore) -> Result<Option<String>, StagsError> {
  Ok(match args {
    Cli { list_tags: true, .. } => {
      let tags = store.tags().await?;
      if tags.is_empty() {
        Some("No tags found".to_string())
      } else {
        let lines: Vec<String> =
          tags.into_iter().map(|t| format!("{}\t{}", t.id, t.name)).collect();
        Some(lines.join("\n"))
      }
    },
    Cli { query: Some(tags), uid: Some(uid), .. } => {
      let documents = store.query(*uid, &split_tags(tags)).await?;
      Some(serde_json::to_string_pretty(&documents)?)
    },
    _ => None,
  })
}
