mod args;
mod logging;

use std::sync::Arc;

use args::Args;
use clap::Parser;
use tokio::{signal, spawn, task::JoinSet};
use tokio_util::sync::CancellationToken;
use torrent_helper::{
    bot::{Bot, MagnetToTorrent, TorrentToMagnet},
    config::Config,
    engine::CacheEngine,
    error::Error,
    fetch::FetchPool,
    transport::TelegramTransport,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;

    let _guard = logging::init(&config.log_file, &config.log_level)?;

    info!("config: {config:?}");

    let cancel = CancellationToken::new();
    let mut bots = JoinSet::new();

    if let Some(token) = config.torrent_bot_token() {
        let transport = TelegramTransport::new(
            &config.telegram_api,
            token,
            config.long_poll(),
        )?;
        let bot = Bot::new("torrent2magnet", Arc::new(transport), TorrentToMagnet);
        let cancel = cancel.clone();
        bots.spawn(async move { bot.run(cancel).await });
    }

    if let Some(token) = config.magnet_bot_token() {
        let engine = Arc::new(CacheEngine::new(config.cache_mirrors.clone())?);
        let pool =
            FetchPool::new(engine, config.fetch_workers, config.fetch_limits());

        let transport = TelegramTransport::new(
            &config.telegram_api,
            token,
            config.long_poll(),
        )?;
        let bot = Bot::new(
            "magnet2torrent",
            Arc::new(transport),
            MagnetToTorrent::new(pool),
        );
        let cancel = cancel.clone();
        bots.spawn(async move { bot.run(cancel).await });
    }

    let ctrl_c = cancel.clone();
    spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl-C, stopping the bots");
                ctrl_c.cancel();
            }
            Err(e) => warn!("cannot listen for Ctrl-C: {e}"),
        }
    });

    while let Some(res) = bots.join_next().await {
        if let Err(e) = res {
            warn!("bot task stopped: {e}");
        }
    }

    Ok(())
}
