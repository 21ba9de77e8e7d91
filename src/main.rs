use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::{info, warn};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use std::fs::File;
use tokio::sync::mpsc;

use toolmap::LocationSource;
use toolmap::api::http::HttpGateway;
use toolmap::api::types::UserRecord;
use toolmap::core::config;
use toolmap::core::controller::{MapScreen, ScreenEvent};
use toolmap::core::state::Region;
use toolmap::location::{FixedLocation, IpLocation, LocationProvider};

#[derive(Parser)]
#[command(name = "toolmap", about = "Map screen core for the tool-lending app")]
struct Args {
    /// Where the device location fix comes from
    #[arg(short, long, value_enum)]
    location: Option<LocationSource>,

    /// Postcode to look up once the screen is up
    #[arg(short, long)]
    postcode: Option<String>,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Initialize file logger - writes to toolmap.log in current directory
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();

    if let Ok(log_file) = File::create("toolmap.log") {
        let _ = WriteLogger::init(LevelFilter::Debug, log_config, log_file);
    }

    let file_config = config::load_config().unwrap_or_else(|e| {
        warn!("Config unusable ({}), falling back to defaults", e);
        Default::default()
    });
    let resolved = config::resolve(
        &file_config,
        args.location.as_ref().map(|s| s.as_str()),
    );

    info!(
        "Toolmap starting up with location source: {}",
        resolved.location_source
    );

    let location: Arc<dyn LocationProvider> = match resolved.location_source.as_str() {
        "ip" => Arc::new(IpLocation::new(
            Some(resolved.ip_lookup_base_url.clone()),
            resolved.location_consent,
        )),
        _ => Arc::new(FixedLocation::new(resolved.home, resolved.location_consent)),
    };

    let gateway = Arc::new(HttpGateway::new(
        resolved.api_base_url.clone(),
        Some(resolved.geocode_base_url.clone()),
        resolved.geocode_api_key.clone().unwrap_or_default(),
    ));

    let current_user = UserRecord {
        profile_id: 0,
        display_name: resolved.display_name.clone(),
        bio: String::new(),
        coordinate: resolved.home,
        picture_url: None,
    };
    let region = Region::centered_on(
        current_user.coordinate,
        resolved.latitude_delta,
        resolved.longitude_delta,
    );

    let (tx, mut rx) = mpsc::channel::<ScreenEvent>(32);
    let mut screen = MapScreen::new(gateway, location, current_user, region, tx);

    screen.mount();
    if let Some(postcode) = args.postcode.as_deref() {
        screen.submit_address(postcode);
    }

    // Drain events until the session settles; bail out if a task wedges.
    while !screen.is_idle() {
        match tokio::time::timeout(Duration::from_secs(30), rx.recv()).await {
            Ok(Some(event)) => screen.handle_event(event),
            Ok(None) => break,
            Err(_) => {
                warn!("Timed out waiting for screen events");
                break;
            }
        }
    }

    let state = &screen.state;
    println!(
        "region: ({:.4}, {:.4}) spanning {:.2} x {:.2}",
        state.region.center.latitude,
        state.region.center.longitude,
        state.region.latitude_delta,
        state.region.longitude_delta,
    );
    if let Some(address) = &state.resolved_address {
        println!("resolved address: {address}");
    }
    if let Some(notice) = &state.notice {
        println!("notice: {notice}");
    }
    println!("{} lender marker(s):", state.markers.len());
    for marker in &state.markers {
        println!(
            "  {} at ({:.4}, {:.4}) - {} listing(s)",
            marker.owner.display_name,
            marker.coordinate.latitude,
            marker.coordinate.longitude,
            marker.listings.len(),
        );
        for listing in &marker.listings {
            match &listing.category {
                Some(category) => {
                    println!("    #{} {} ({})", listing.listing_id, listing.title, category)
                }
                None => println!("    #{} {}", listing.listing_id, listing.title),
            }
        }
    }

    screen.unmount();
    Ok(())
}
