mod app;
mod graph;
mod layout;
mod provider;
mod store;
mod util;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use crate::graph::ConnectionPolicy;
use crate::store::{DirectoryStore, LocalStore};

#[cfg(debug_assertions)]
const DEFAULT_LOG_FILTER: &str = "balloon_map=info";
#[cfg(not(debug_assertions))]
const DEFAULT_LOG_FILTER: &str = "balloon_map=warn";

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Directory holding sessions, balloons and the API configuration.
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Keep everything in memory; nothing is written to the data directory.
    #[arg(long, conflicts_with = "data_dir")]
    ephemeral: bool,
    /// Answer from the built-in suggestions instead of calling the API.
    #[arg(long)]
    offline: bool,
    /// Which existing balloons a new balloon gets linked to.
    #[arg(long, value_enum, default_value_t = ConnectionPolicy::Full)]
    connections: ConnectionPolicy,
    #[arg(long, default_value_t = 1280.0)]
    width: f32,
    #[arg(long, default_value_t = 820.0)]
    height: f32,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(DEFAULT_LOG_FILTER))
        .init();

    let args = Args::parse();
    let store = if args.ephemeral {
        log::info!("running without persistence");
        LocalStore::in_memory()
    } else {
        let data_dir = match args.data_dir {
            Some(dir) => dir,
            None => DirectoryStore::default_location()?,
        };
        let backend = DirectoryStore::new(data_dir);
        log::info!("keeping data in {}", backend.root().display());
        LocalStore::new(backend)
    };

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([args.width, args.height])
            .with_min_inner_size([480.0, 360.0]),
        ..Default::default()
    };
    let launch = app::Launch {
        offline: args.offline,
        policy: args.connections,
    };

    eframe::run_native(
        "balloon-map",
        options,
        Box::new(move |cc| Ok(Box::new(app::BalloonMapApp::new(cc, store, launch)))),
    )
    .map_err(|error| anyhow::anyhow!("{error}"))
    .context("the window closed with an error")
}
