mod api;
mod app;
mod application;
mod domain;
mod ui;
mod utils;

use iced::window;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> iced::Result {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    iced::application(app::ScrapeApp::default, app::update, app::view)
        .title("Sitemap Phone Scraper")
        .window(window::Settings {
            size: iced::Size::new(720.0, 560.0),
            ..Default::default()
        })
        .run()
}
