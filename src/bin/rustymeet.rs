//! The RustyMeet desktop client.
//! Loads the client configuration, starts the file logger and runs the
//! `eframe` application.

use std::{env, sync::Arc};

use rustymeet::{
    app::meeting_app::MeetingApp,
    config::{ClientSettings, Config},
    log::{log_sink::LogSink, logger::Logger},
    sink_info,
};

const LOG_QUEUE_CAP: usize = 4_096;
const UI_LOG_QUEUE_CAP: usize = 512;
const UI_LOG_SAMPLE_EVERY: u32 = 1;

fn main() -> eframe::Result<()> {
    let args: Vec<String> = env::args().collect();

    let config_result = if args.len() > 1 {
        let path = &args[1];
        println!("Loading configuration from {path}");
        Config::load(path)
    } else {
        Config::load("client_rustymeet.conf").or_else(|_| Config::load("client_default.conf"))
    };

    let config = config_result.unwrap_or_else(|e| {
        eprintln!("Error loading config: {e}. Using empty config.");
        Config::empty()
    });
    let settings = ClientSettings::from_config(&config);

    let logger = Logger::start_client(LOG_QUEUE_CAP, UI_LOG_QUEUE_CAP, UI_LOG_SAMPLE_EVERY, &config);
    let log: Arc<dyn LogSink> = Arc::new(logger.handle());
    sink_info!(log, "rustymeet starting, logging to {}", logger.file_path().display());

    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "RustyMeet",
        native_options,
        Box::new(move |cc| {
            let app = MeetingApp::new(cc, &settings, log, Some(logger));
            Ok(Box::new(app))
        }),
    )
}
