use std::path::PathBuf;

use clap::Parser;
use torrent_helper::config::Config;

/// CLI flags of the bots. These values take preference over the config
/// file and the environment.
#[derive(Parser, Debug, Default)]
#[clap(name = "torrent-helper")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Read the configuration from this file instead of the default one.
    #[clap(short, long)]
    pub config: Option<PathBuf>,

    /// Token of the bot that converts .torrent files to magnet links.
    #[clap(long)]
    pub torrent_bot_token: Option<String>,

    /// Token of the bot that converts magnet links to .torrent files.
    #[clap(long)]
    pub magnet_bot_token: Option<String>,

    /// How many magnet links may be resolved at the same time.
    #[clap(short, long)]
    pub workers: Option<usize>,

    /// Seconds to wait for the metadata of a magnet link.
    #[clap(short, long)]
    pub timeout: Option<u64>,

    /// Write logs to this file.
    #[clap(long)]
    pub log_file: Option<PathBuf>,

    /// Log filter, e.g. `info` or `torrent_helper=debug`.
    #[clap(short, long)]
    pub log_level: Option<String>,
}

impl Args {
    /// Write every flag that was given over `config`.
    pub fn apply(self, config: &mut Config) {
        if let Some(token) = self.torrent_bot_token {
            config.torrent_bot_token = Some(token);
        }
        if let Some(token) = self.magnet_bot_token {
            config.magnet_bot_token = Some(token);
        }
        if let Some(workers) = self.workers {
            config.fetch_workers = workers;
        }
        if let Some(timeout) = self.timeout {
            config.metadata_timeout_secs = timeout;
        }
        if let Some(log_file) = self.log_file {
            config.log_file = log_file;
        }
        if let Some(log_level) = self.log_level {
            config.log_level = log_level;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let args = Args::parse_from([
            "torrent-helper",
            "--magnet-bot-token",
            "1:cli",
            "-w",
            "3",
            "--timeout",
            "60",
        ]);

        let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        let mut config =
            Config::load_with_env(Some(file.path()), Some(Default::default())).unwrap();

        args.apply(&mut config);

        assert_eq!(config.magnet_bot_token(), Some("1:cli"));
        assert_eq!(config.torrent_bot_token(), None);
        assert_eq!(config.fetch_workers, 3);
        assert_eq!(config.metadata_timeout_secs, 60);
        assert_eq!(config.log_level, "info");
    }
}
