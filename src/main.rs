mod app;
mod color;
mod config;
mod data;
mod state;
mod summary;
mod ui;

use std::time::Duration;

use app::CarlotApp;
use config::DashboardConfig;
use eframe::egui;
use state::AppState;
use summary::{CachedLookup, OfflineLookup, SummaryLookup, WikipediaLookup};

fn summary_lookup(config: &DashboardConfig) -> Box<dyn SummaryLookup> {
    if !config.summary.enabled {
        return Box::new(OfflineLookup);
    }
    match WikipediaLookup::new(Duration::from_secs(config.summary.timeout_secs)) {
        Ok(lookup) => Box::new(CachedLookup::new(lookup)),
        Err(e) => {
            log::warn!("Summary lookup disabled: {e}");
            Box::new(OfflineLookup)
        }
    }
}

fn main() -> eframe::Result {
    env_logger::init();

    let config = DashboardConfig::discover().unwrap_or_else(|e| {
        log::error!("Ignoring config: {e:#}");
        DashboardConfig::default()
    });

    let mut state = AppState::new(config.clone(), summary_lookup(&config));
    if let Some(path) = &config.data_path {
        state.load_path(path);
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Carlot – Used Car Listings",
        options,
        Box::new(|_cc| Ok(Box::new(CarlotApp::new(state)))),
    )
}
