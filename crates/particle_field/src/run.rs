//! Main entrypoint for running the particle field

use clap::Parser as _;
use color_eyre::eyre::{ContextCompat as _, Result};
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _, Layer as _};

use particle_field_protocol::PluginInputMessages;

use crate::cli_args::CliArgs;
use crate::config::{Config, LogLevel};
use crate::renderer::Renderer;

/// The env variable for manually setting log filters.
const LOG_FILTERS_ENV: &str = "PARTICLE_FIELD_LOG";

/// How many parsed messages can be waiting for the renderer.
const MESSAGE_BUFFER_SIZE: usize = 16;

/// Main entrypoint
pub async fn run() -> Result<()> {
    let cli_args = CliArgs::parse();
    let config = setup(&cli_args)?;

    let (messages_tx, messages_rx) = tokio::sync::mpsc::channel(MESSAGE_BUFFER_SIZE);
    let stdin_handle = read_stdin(messages_tx);

    Renderer::start(&config, messages_rx).await?;

    // The renderer only stops once the reader has dropped its sender, so this doesn't block.
    stdin_handle
        .join()
        .map_err(|err| color_eyre::eyre::eyre!("STDIN handle: {err:?}"))??;

    tracing::trace!("Leaving the main `run()` function");
    Ok(())
}

/// Load the config and start logging.
fn setup(cli_args: &CliArgs) -> Result<Config> {
    let mut config = Config::load(cli_args.config.clone())?;

    if let Some(level) = cli_args.log_level.clone() {
        config.log_level = level;
    }
    if let Some(path) = cli_args.log_path.clone() {
        config.log_path = path;
    }

    setup_logging(&config)?;

    tracing::info!("Starting particle field");
    tracing::debug!("Loaded config: {config:?}");

    Ok(config)
}

/// Parse a single line from the host. Blank lines are ignored.
pub fn parse_message(line: &str) -> Result<Option<PluginInputMessages>> {
    if line.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(line)?))
}

/// Read protocol messages from the host on a dedicated thread, because STDIN reads block.
fn read_stdin(
    messages_tx: tokio::sync::mpsc::Sender<PluginInputMessages>,
) -> std::thread::JoinHandle<Result<()>> {
    std::thread::spawn(move || {
        tracing::trace!("Starting to parse JSON stream from host...");
        let result = forward_messages(std::io::stdin().lock(), &messages_tx);
        if let Err(error) = &result {
            tracing::error!("Couldn't read from STDIN: {error:?}");
        }

        tracing::debug!("Leaving STDIN loop");
        result
    })
}

/// Parse every line from the host and send the messages on to the renderer. Lines that aren't
/// valid messages, including ones that aren't even UTF-8, are logged and skipped.
fn forward_messages<R: std::io::BufRead>(
    reader: R,
    messages_tx: &tokio::sync::mpsc::Sender<PluginInputMessages>,
) -> Result<()> {
    for maybe_bytes in reader.split(b'\n') {
        let bytes = maybe_bytes?;
        let line = String::from_utf8_lossy(&bytes);
        match parse_message(&line) {
            Ok(Some(message)) => {
                if messages_tx.blocking_send(message).is_err() {
                    break;
                }
            }
            Ok(None) => (),
            Err(error) => tracing::error!("Couldn't parse message from host: {error:?}"),
        }
    }

    Ok(())
}

/// Setup logging. STDOUT belongs to the protocol, so logs always go to a file.
fn setup_logging(config: &Config) -> Result<()> {
    let are_log_filters_manually_set = std::env::var(LOG_FILTERS_ENV).is_ok();
    let level_as_string = format!("{:?}", config.log_level).to_lowercase();

    let is_loggable = !matches!(config.log_level, LogLevel::Off) || are_log_filters_manually_set;
    if !is_loggable {
        return Ok(());
    }

    let directory = config
        .log_path
        .parent()
        .context("Couldn't get log path's parent")?;
    std::fs::create_dir_all(directory)?;
    let file = std::fs::File::create(&config.log_path)?;

    let filters = match std::env::var(LOG_FILTERS_ENV) {
        Ok(user_filters) => tracing_subscriber::EnvFilter::builder()
            .with_default_directive("error".parse()?)
            .parse_lossy(user_filters),
        Err(_) => tracing_subscriber::EnvFilter::builder()
            .with_default_directive("off".parse()?)
            .from_env_lossy()
            .add_directive(format!("particle_field={level_as_string}").parse()?),
    };

    let logfile_layer = tracing_subscriber::fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_filter(filters);

    tracing_subscriber::registry().with(logfile_layer).init();

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_host_messages() {
        assert_eq!(
            parse_message(r#"{"tty_resize":{"width":80,"height":24}}"#).unwrap(),
            Some(PluginInputMessages::TTYResize {
                width: 80,
                height: 24
            })
        );
        assert_eq!(
            parse_message("\"pointer_leave\"").unwrap(),
            Some(PluginInputMessages::PointerLeave)
        );
        assert_eq!(parse_message("   ").unwrap(), None);
        assert!(parse_message("{\"nonsense\":1}").is_err());
    }

    #[test]
    fn bad_lines_do_not_stop_the_stream() {
        let (messages_tx, mut messages_rx) = tokio::sync::mpsc::channel(MESSAGE_BUFFER_SIZE);
        let mut input = b"{\"tty_resize\":{\"width\":80,\"height\":24}}\n".to_vec();
        input.extend_from_slice(b"\xff\xfe\n");
        input.extend_from_slice(b"not json\n");
        input.extend_from_slice(b"\"pointer_leave\"\n");

        forward_messages(std::io::Cursor::new(input), &messages_tx).unwrap();

        assert_eq!(
            messages_rx.try_recv().unwrap(),
            PluginInputMessages::TTYResize {
                width: 80,
                height: 24
            }
        );
        assert_eq!(
            messages_rx.try_recv().unwrap(),
            PluginInputMessages::PointerLeave
        );
        assert!(messages_rx.try_recv().is_err());
    }
}
