use std::path::PathBuf;

use color_eyre::eyre::Result;
use directories::ProjectDirs;
use tracing::error;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
  self, fmt, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt, EnvFilter,
  Layer,
};

use crate::app::consts::*;

fn project_directory() -> Option<ProjectDirs> {
  ProjectDirs::from("org", "stags", PROJECT_NAME.clone().to_lowercase().as_str())
}

pub fn get_data_dir() -> PathBuf {
  if let Some(s) = DATA_FOLDER.clone() {
    s
  } else if let Some(proj_dirs) = project_directory() {
    proj_dirs.data_local_dir().to_path_buf()
  } else {
    PathBuf::from(".").join(".data")
  }
}

pub fn get_config_dir() -> PathBuf {
  if let Some(s) = CONFIG_FOLDER.clone() {
    s
  } else if let Some(proj_dirs) = project_directory() {
    proj_dirs.config_local_dir().to_path_buf()
  } else {
    PathBuf::from(".").join(".config")
  }
}

/// `STAGS_LOG_LEVEL`, then `RUST_LOG`, then info for this crate.
fn log_filter() -> EnvFilter {
  let directives = std::env::var(LOG_ENV.clone())
    .or_else(|_| std::env::var("RUST_LOG"))
    .unwrap_or_else(|_| format!("{}=info", env!("CARGO_CRATE_NAME")));
  EnvFilter::new(directives)
}

pub fn initialize_logging() -> Result<()> {
  let directory = get_data_dir();
  std::fs::create_dir_all(directory.clone())?;
  let log_path = directory.join(LOG_FILE.clone());
  let log_file = std::fs::OpenOptions::new().create(true).append(true).open(log_path)?;

  let file_subscriber = fmt::layer()
    .with_file(true)
    .with_line_number(true)
    .with_writer(log_file)
    .with_target(false)
    .with_ansi(false)
    .with_filter(log_filter());

  let console_subscriber =
    fmt::layer().compact().with_writer(std::io::stderr).with_target(true).with_filter(log_filter());

  tracing_subscriber::registry()
    .with(file_subscriber)
    .with(console_subscriber)
    .with(ErrorLayer::default())
    .try_init()?;
  Ok(())
}

/// Similar to the `std::dbg!` macro, but generates `tracing` events rather
/// than printing to stdout.
///
/// By default, the verbosity level for the generated events is `DEBUG`, but
/// this can be customized.
#[macro_export]
macro_rules! trace_dbg {
    (target: $target:expr, level: $level:expr, $ex:expr) => {{
        match $ex {
            value => {
                tracing::event!(target: $target, $level, ?value, stringify!($ex));
                value
            }
        }
    }};
    (level: $level:expr, $ex:expr) => {
        $crate::trace_dbg!(target: module_path!(), level: $level, $ex)
    };
    (target: $target:expr, $ex:expr) => {
        $crate::trace_dbg!(target: $target, level: tracing::Level::DEBUG, $ex)
    };
    ($ex:expr) => {
        $crate::trace_dbg!(level: tracing::Level::DEBUG, $ex)
    };
}

fn hook_builder() -> color_eyre::config::HookBuilder {
  color_eyre::config::HookBuilder::default()
    .panic_section(format!(
      "This is a bug. Consider reporting it at {}",
      env!("CARGO_PKG_REPOSITORY")
    ))
    .display_location_section(true)
    .display_env_section(true)
    .issue_url(concat!(env!("CARGO_PKG_REPOSITORY"), "/issues/new"))
    .add_issue_metadata("version", env!("CARGO_PKG_VERSION"))
    .add_issue_metadata("os", std::env::consts::OS)
    .add_issue_metadata("arch", std::env::consts::ARCH)
}

pub fn initialize_panic_handler() -> Result<()> {
  let (panic_hook, eyre_hook) = hook_builder().into_hooks();
  eyre_hook.install()?;
  std::panic::set_hook(Box::new(move |panic_info| {
    let msg = format!("{}", panic_hook.panic_report(panic_info));
    eprintln!("{}", msg);
    error!("Error: {}", strip_ansi_escapes::strip_str(msg));

    use human_panic::{handle_dump, print_msg, Metadata};
    let meta = Metadata {
      version: env!("CARGO_PKG_VERSION").into(),
      name: env!("CARGO_PKG_NAME").into(),
      authors: env!("CARGO_PKG_AUTHORS").replace(':', ", ").into(),
      homepage: env!("CARGO_PKG_HOMEPAGE").into(),
    };

    let file_path = handle_dump(&meta, panic_info);
    if let Err(err) = print_msg(file_path, &meta) {
      eprintln!("human-panic: printing error message to console failed: {}", err);
    }

    // Better Panic. Only enabled *when* debugging.
    #[cfg(debug_assertions)]
    {
      better_panic::Settings::auto()
        .most_recent_first(false)
        .lineno_suffix(true)
        .verbosity(better_panic::Verbosity::Full)
        .create_panic_handler()(panic_info);
    }

    std::process::exit(libc::EXIT_FAILURE);
  }));
  Ok(())
}

pub fn version() -> String {
  let author = clap::crate_authors!();

  let commit_hash = GIT_COMMIT_HASH.clone();

  let config_dir_path = get_config_dir().display().to_string();
  let data_dir_path = get_data_dir().display().to_string();

  format!(
    "\
{commit_hash}

Authors: {author}

Config directory: {config_dir_path}
Data directory: {data_dir_path}"
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn version_lists_both_directories() {
    let version = version();
    assert!(version.contains("Config directory: "));
    assert!(version.contains("Data directory: "));
  }

  #[test]
  fn panic_hooks_carry_issue_metadata() {
    let (panic_hook, eyre_hook) = hook_builder().into_hooks();
    drop(eyre_hook);
    drop(panic_hook);
  }

  #[test]
  fn trace_dbg_returns_its_value() {
    assert_eq!(trace_dbg!(2 + 2), 4);
  }
}
