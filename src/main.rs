use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use trailscope::builder::AxisOrder;
use trailscope::geometry::rings_to_geojson;
use trailscope::nominatim::Geocoder;
use trailscope::{LatLng, RingSpec, TrailApp, TrailscopeConfig, logging, search_rings};

#[derive(Parser, Debug)]
#[command(
    name = "trailscope",
    version,
    about = "Find mountain-bike and hiking trails around a place using OpenStreetMap data"
)]
struct Cli {
    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Look up a place and print its coordinates
    Geocode { query: String },
    /// Print the search rings around a point as GeoJSON
    Rings {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Base radius in meters
        #[arg(long)]
        radius: Option<u32>,
        #[arg(long)]
        buffers: Option<u32>,
    },
    /// List trails around a place or a point
    Trails {
        /// Free-text place to search around
        #[arg(long, conflicts_with_all = ["lat", "lon"])]
        place: Option<String>,
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,
        /// Search radius in meters
        #[arg(long)]
        radius: Option<u32>,
        /// Only mountain-bike graded trails
        #[arg(long)]
        no_sac: bool,
        /// Emit coordinates as [lat, lng] instead of [lng, lat]
        #[arg(long)]
        lat_lng: bool,
        /// Write the trail GeoJSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Interactive session reading commands from stdin
    Explore,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = TrailscopeConfig::load_from_path(cli.config.clone())?;
    logging::init(&config.logging, cli.verbose);

    match cli.command {
        Command::Geocode { query } => {
            let client = trailscope::NominatimClient::new(&config.nominatim)?;
            match client.lookup(&query).await {
                Ok(place) => {
                    println!("{}", place.display_name);
                    println!("  {}", place.location.format_coordinates());
                }
                Err(e) => {
                    println!("{}", e.user_message());
                    return Err(e.into());
                }
            }
        }
        Command::Rings {
            lat,
            lon,
            radius,
            buffers,
        } => {
            let center = LatLng::new(lat, lon);
            anyhow::ensure!(center.is_valid(), "Coordinates out of range: {lat}, {lon}");
            if let Some(radius) = radius {
                config.search.radius_meters = radius;
            }
            if let Some(buffers) = buffers {
                config.search.buffer_count = buffers;
            }
            config.validate()?;

            let spec = RingSpec {
                center,
                radius_meters: f64::from(config.search.radius_meters),
                buffer_count: config.search.buffer_count,
                segments: config.search.ring_segments,
            };
            let collection = rings_to_geojson(&search_rings(&spec));
            println!("{}", serde_json::to_string_pretty(&collection)?);
        }
        Command::Trails {
            place,
            lat,
            lon,
            radius,
            no_sac,
            lat_lng,
            output,
        } => {
            if let Some(radius) = radius {
                config.search.radius_meters = radius;
            }
            if no_sac {
                config.trails.include_sac = false;
            }
            if lat_lng {
                config.trails.axis_order = AxisOrder::LatLng;
            }
            config.validate()?;

            let mut app = TrailApp::from_config(config)?;
            match (place, lat, lon) {
                (Some(place), _, _) => {
                    if let Err(e) = app.search_place(&place).await {
                        print!("{}", app.panel());
                        return Err(e.into());
                    }
                }
                (None, Some(lat), Some(lon)) => app.move_to(LatLng::new(lat, lon), None)?,
                _ => {}
            }

            let result = app.search_trails().await;
            print!("{}", app.panel());
            result?;
            if let Some(set) = app.trails().filter(|set| !set.features.is_empty()) {
                println!("{:.1} km of trails", set.total_length_km());
            }

            if let Some(path) = output {
                let json = serde_json::to_string_pretty(&app.trail_collection())?;
                std::fs::write(&path, json)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("Wrote {} trails to {}", app.features().len(), path.display());
            }
        }
        Command::Explore => explore(config).await?,
    }

    Ok(())
}

const EXPLORE_HELP: &str = "\
commands:
  search <place>        center the map on a place
  move <lat> <lon> [z]  center the map on a point
  trails                load trails around the map center
  select <n>            zoom to trail number n of the list
  click <id>            toggle the highlight of a trail by OSM id
  rings                 show or hide the search rings
  terrain               toggle 3D terrain
  style                 switch satellite / outdoor base map
  show                  print camera and trail list
  geojson               print the trail layer as GeoJSON
  quit";

async fn explore(config: TrailscopeConfig) -> Result<()> {
    let mut app = TrailApp::from_config(config)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{EXPLORE_HELP}");
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        // Errors are already reflected in the panel; the session goes on
        match command {
            "" => continue,
            "quit" | "exit" => break,
            "help" => println!("{EXPLORE_HELP}"),
            "search" => {
                let _ = app.search_place(rest).await;
                print!("{}", app.panel());
            }
            "move" => {
                let numbers: Vec<f64> = rest
                    .split_whitespace()
                    .filter_map(|n| n.parse().ok())
                    .collect();
                match numbers.as_slice() {
                    [lat, lon] => report(app.move_to(LatLng::new(*lat, *lon), None)),
                    [lat, lon, zoom] => report(app.move_to(LatLng::new(*lat, *lon), Some(*zoom))),
                    _ => println!("usage: move <lat> <lon> [zoom]"),
                }
            }
            "trails" => {
                let _ = app.search_trails().await;
                print!("{}", app.panel());
            }
            "select" => match rest.parse::<usize>() {
                Ok(n) if n > 0 => match app.select_trail(n - 1) {
                    Ok(trail) => println!("{trail}"),
                    Err(e) => println!("{}", e.user_message()),
                },
                _ => println!("usage: select <n>"),
            },
            "click" => match rest.parse::<i64>() {
                Ok(id) => match app.click_trail(id) {
                    Ok(on) => println!("trail {id} {}", if on { "highlighted" } else { "cleared" }),
                    Err(e) => println!("{}", e.user_message()),
                },
                Err(_) => println!("usage: click <id>"),
            },
            "rings" => println!("rings {}", if app.toggle_rings() { "shown" } else { "hidden" }),
            "terrain" => println!("terrain {}", if app.toggle_terrain() { "on" } else { "off" }),
            "style" => {
                let style = app.toggle_style();
                println!("style {style:?}: {} ({})", style.tile_url(), style.attribution());
            }
            "show" => {
                use trailscope::MapView;
                let camera = app.map().camera();
                let style = app.map().style();
                println!(
                    "center {} zoom {:.1} pitch {:.0}",
                    camera.center.format_coordinates(),
                    camera.zoom,
                    camera.pitch
                );
                println!("tiles {} ({})", style.tile_url(), style.attribution());
                if let Some(popup) = app.map().popup() {
                    println!("popup: {} ({})", popup.title, popup.body);
                }
                print!("{}", app.panel());
                if let Some(set) = app.trails() {
                    println!("{:.1} km total", set.total_length_km());
                }
            }
            "geojson" => println!("{}", serde_json::to_string_pretty(&app.trail_collection())?),
            other => println!("unknown command '{other}', try 'help'"),
        }
    }

    Ok(())
}

fn report(result: trailscope::Result<()>) {
    if let Err(e) = result {
        println!("{}", e.user_message());
    }
}
