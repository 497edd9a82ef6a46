mod api;
mod app;
mod application;
mod domain;
mod ui;
mod utils;

use iced::window;

fn main() -> iced::Result {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "download_dialog=info".into()),
        )
        // stdout is reserved for host messages when embedded
        .with_writer(std::io::stderr)
        .init();

    iced::application(app::DownloadApp::boot, app::update, app::view)
        .title("Download")
        .window(window::Settings {
            size: iced::Size::new(560.0, 480.0),
            ..Default::default()
        })
        .run()
}
