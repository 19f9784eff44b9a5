use std::path::PathBuf;

use clap::Parser;
use env_logger::Env;
use log::info;

mod backend;
mod config;
mod env;
mod login;
mod session;
mod sync;
mod ui;
mod util;

use crate::config::LauncherConfig;

#[derive(Parser, Debug)]
#[command(
    name = "Rune Launcher",
    author,
    version,
    about = "Multi-account launcher with an external login helper"
)]
struct Cli {
    /// Print launcher version and exit without starting the UI.
    #[arg(long)]
    version_only: bool,

    /// Auth helper program; overrides the config file.
    #[arg(long, value_name = "PATH")]
    auth_helper: Option<PathBuf>,

    /// Merge accounts with a matching email instead of adding a duplicate.
    #[arg(long)]
    merge_duplicate_accounts: bool,
}

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if cli.version_only {
        println!("Rune Launcher {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = LauncherConfig::load()
        .with_overrides(cli.auth_helper, cli.merge_duplicate_accounts);
    info!(
        "starting with auth helper {:?}, duplicate policy {:?}",
        config.auth_helper, config.duplicate_policy
    );

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_icon(app_icon())
            .with_inner_size(eframe::egui::vec2(720.0, 760.0)),
        ..Default::default()
    };
    eframe::run_native(
        "Rune Launcher",
        options,
        Box::new(move |cc| Ok(Box::new(ui::LauncherApp::new(cc, config)))),
    )
}

fn app_icon() -> eframe::egui::IconData {
    // Simple 2x2 icon: dark background with an emerald accent.
    let rgba: Vec<u8> = vec![
        20, 24, 32, 255, 16, 185, 129, 255, //
        20, 24, 32, 255, 5, 150, 105, 255,
    ];
    eframe::egui::IconData {
        rgba,
        width: 2,
        height: 2,
    }
}
