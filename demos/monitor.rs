use std::sync::Arc;

use tillstream::{filter, stream::StreamEvent, Config, Monitor};

#[tokio::main]
async fn main() {
    pretty_env_logger::init();

    let license_key = std::env::var("TILL_LICENSE_KEY")
        .map_err(|_| {
            println!("No TILL_LICENSE_KEY env var or invalid");
            std::process::exit(1);
        })
        .unwrap();

    let machine_id = std::env::var("TILL_MACHINE_ID")
        .map_err(|_| {
            println!("No TILL_MACHINE_ID env var or invalid");
            std::process::exit(1);
        })
        .unwrap();

    let base_url = std::env::var("TILL_API_BASE")
        .unwrap_or_else(|_| "http://127.0.0.1:7777".to_string());

    let config = Config::new(&license_key, &machine_id, &base_url).unwrap();

    let mut monitor = Monitor::new(config).unwrap();

    monitor.register(filter::all(), |event: Arc<StreamEvent>| async move {
        log::info!("Received {} event: {:?}", event.kind, event);
    });

    monitor.run().await;
}
