//! All the CLI arguments for the particle field

/// An ambient particle field plugin. Reads host messages on STDIN and writes frames to STDOUT.
#[derive(clap::Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
#[non_exhaustive]
pub struct CliArgs {
    /// Path to a config file. Defaults to `particle-field.toml` in the system's config directory.
    #[arg(long)]
    pub config: Option<std::path::PathBuf>,

    /// Override the log level from the config file.
    #[arg(long, value_enum)]
    pub log_level: Option<crate::config::LogLevel>,

    /// Override the path of the log file.
    #[arg(long)]
    pub log_path: Option<std::path::PathBuf>,
}

#[cfg(test)]
mod test {
    use clap::Parser as _;

    use super::*;

    #[test]
    fn overrides() {
        let args = CliArgs::parse_from([
            "particle-field",
            "--config",
            "/tmp/field.toml",
            "--log-level",
            "trace",
        ]);
        assert_eq!(args.config, Some("/tmp/field.toml".into()));
        assert_eq!(args.log_level, Some(crate::config::LogLevel::Trace));
        assert!(args.log_path.is_none());
    }
}
