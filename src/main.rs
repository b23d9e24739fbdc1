mod backends;
mod config;
mod config_persistence;
mod cover_art;
mod event_driver;
mod image_pipeline;
mod osd_manager;
mod platform;
mod protocol;

use std::thread;

use log::info;
use tokio::sync::broadcast;

use backends::{native::DesktopNotifier, pretty_popup::TerminalPopup, tray::LogTrayIcon};
use config_persistence::{default_config_path, load_config_file, persist_config_file};
use cover_art::CoverArtLoader;
use image_pipeline::{placeholder_cover_image, DEFAULT_NOTIFICATION_IMAGE_MAX_EDGE_PX};
use osd_manager::{OsdBackends, OsdManager, APP_NAME};
use platform::PlatformCapabilities;
use protocol::Message;

fn panic_payload_to_string(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return (*s).to_string();
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return s.clone();
    }
    "non-string panic payload".to_string()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut clog = colog::default_builder();
    clog.filter(None, log::LevelFilter::Debug);
    clog.init();

    std::panic::set_hook(Box::new(|panic_info| {
        let current_thread = std::thread::current();
        let thread_name = current_thread.name().unwrap_or("unnamed");
        log::error!("panic in thread '{}': {}", thread_name, panic_info);
    }));

    let config_file = default_config_path();
    if !config_file.exists() {
        info!(
            "Config file not found. Creating default config. path={}",
            config_file.display()
        );
        persist_config_file(&load_config_file(&config_file), &config_file);
    }

    let capabilities = PlatformCapabilities::detect();
    info!("Platform notification capabilities: {:?}", capabilities);

    // Bus for communication between components
    let (bus_sender, _) = broadcast::channel::<Message>(256);

    let osd_bus_receiver = bus_sender.subscribe();
    let loader_bus_sender = bus_sender.clone();
    let osd_config_file = config_file.clone();
    let osd_thread = thread::Builder::new()
        .name("osd-manager".to_string())
        .spawn(move || {
            let run_result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                let cover_art_loader =
                    CoverArtLoader::start(loader_bus_sender, DEFAULT_NOTIFICATION_IMAGE_MAX_EDGE_PX);
                cover_art_loader.set_default_output_image(Some(placeholder_cover_image(
                    DEFAULT_NOTIFICATION_IMAGE_MAX_EDGE_PX,
                )));
                let mut osd_manager = OsdManager::new(
                    APP_NAME,
                    capabilities,
                    Box::new(config_persistence::ConfigFileSettings::new(osd_config_file)),
                    Box::new(cover_art_loader),
                    OsdBackends {
                        native: Box::new(DesktopNotifier::new(APP_NAME)),
                        tray: Box::new(LogTrayIcon::new()),
                        pretty_popup: Box::new(TerminalPopup::new(std::io::stdout())),
                    },
                );
                osd_manager.run(osd_bus_receiver);
            }));
            if let Err(payload) = run_result {
                log::error!(
                    "OsdManager thread terminated due to panic: {}",
                    panic_payload_to_string(payload.as_ref())
                );
            }
        })?;

    event_driver::run_event_driver(std::io::stdin().lock(), &bus_sender);
    info!("Input closed, waiting for pending notifications");
    if bus_sender.send(Message::Shutdown).is_ok() && osd_thread.join().is_err() {
        log::error!("OsdManager thread could not be joined");
    }
    Ok(())
}
