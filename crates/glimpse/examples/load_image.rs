//! Load one image through the full engine and print every transition.
//!
//! ```text
//! cargo run -p glimpse --example load_image [URL]
//! ```

use std::{env::args, error::Error, time::Duration};

use glimpse::prelude::*;
use tracing::{info, metadata::LevelFilter};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::default()
                .add_directive("glimpse=debug".parse()?)
                .add_directive(LevelFilter::INFO.into()),
        )
        .with_line_number(false)
        .with_file(false)
        .init();

    let url = args()
        .nth(1)
        .unwrap_or_else(|| "https://www.gstatic.com/webp/gallery/1.jpg".to_string());

    let bus = EventBus::new(64);
    let mut events_rx = bus.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events_rx.recv().await {
            info!(?event, "event");
        }
    });

    let net = HttpClient::new(NetOptions::default())?.with_timeout(Duration::from_secs(15));
    let loader = Loader::new(net);
    let session = loader.mount(
        ResourceDescriptor::new(url),
        LoadConfig::new()
            .with_priority(true)
            .with_progress(true)
            .with_events(bus)
            .on_load(|s| info!(uri = ?s.active_uri, elapsed = ?s.load_duration, "on_load"))
            .on_error(|s| info!(error = ?s.last_error, remaining = s.attempts_remaining, "on_error")),
    )?;

    let mut snapshot = session.settled().await;
    while snapshot.state == LoadState::Errored && session.retry() {
        let attempt = snapshot.attempt_count + 1;
        snapshot = session
            .wait_for(|s| s.attempt_count == attempt && s.state.is_settled())
            .await;
    }

    info!(state = %snapshot.state, attempts = snapshot.attempt_count, "done");
    if let Some(sources) = &snapshot.sources {
        info!(srcset = %sources.src_set_primary, "primary srcset");
        if let Some(alt) = &sources.src_set_alternate {
            info!(srcset = %alt, "alternate srcset");
        }
    }
    Ok(())
}
