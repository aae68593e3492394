//! navtrack cli - Route and live tracking towards a destination

use std::fs::{self, File};
use std::io::BufWriter;
use std::sync::Arc;

use argopt::{cmd_group, subcmd};
use csv::Reader;
use log::{info, warn};
use tokio::runtime::Runtime;

use navtrack::services::{
    DirectionsService, NoDirections, NoGeocoder, Nominatim, OpenRouteService, ReverseGeocoder,
};
use navtrack::sources::{CsvSource, ManualSource};
use navtrack::{
    format_distance, Coordinate, GpxGenerator, NavError, NavigationConfig, NavigationController,
    NavigationSignal, RouteProvider,
};

/// CLI of navtrack - Follow your position towards a destination
#[cmd_group(commands = [route, replay])]
fn main() -> Result<(), String> {}

/// Request the route between two coordinates
#[subcmd]
fn route(
    /// Start coordinate, `lat,lng`
    from: String,
    /// Destination coordinate, `lat,lng`
    to: String,
    /// GPX path file destination
    #[opt(long)]
    gpx: Option<String>,
    /// Directions service api key, overrides the config file
    #[opt(long)]
    api_key: Option<String>,
    /// Navigation configuration. Default: .navtrack.yaml, ~/.navtrack.yaml
    #[opt(long)]
    config: Option<String>,
) -> Result<(), String> {
    init_logs();

    let from = from.parse::<Coordinate>().map_err(|e| e.to_string())?;
    let to = to.parse::<Coordinate>().map_err(|e| e.to_string())?;

    let mut conf = load_configs(config);
    if api_key.is_some() {
        conf.directions.api_key = api_key;
    }

    let mut provider = RouteProvider::new(directions(&conf)?);
    provider
        .near_threshold(conf.routing.near_threshold)
        .timeout(conf.routing.timeout());

    let route = runtime()?.block_on(provider.get_route(from, to));

    println!(
        "{} vertices, {} ({:?})",
        route.vertices.len(),
        format_distance(route.distance),
        route.source
    );

    if let Some(path) = gpx {
        let mut generator = GpxGenerator::empty();
        generator.route(&route, format!("{} to {}", from, to));
        write_gpx(&path, generator)?;
    }

    Ok(())
}

/// Replay the fixes of a CSV file while navigating to a destination
#[subcmd]
fn replay(
    /// CSV file with the recorded fixes
    csv_path: String,
    /// Destination coordinate, `lat,lng`
    destination: String,
    /// GPX path file destination
    #[opt(long)]
    gpx: Option<String>,
    /// Directions service api key, overrides the config file
    #[opt(long)]
    api_key: Option<String>,
    /// Navigation and CSV fields configuration. Default: .navtrack.yaml, ~/.navtrack.yaml
    #[opt(long)]
    config: Option<String>,
) -> Result<(), String> {
    init_logs();

    let destination = destination
        .parse::<Coordinate>()
        .map_err(|e| e.to_string())?;

    let mut conf = load_configs(config);
    if api_key.is_some() {
        conf.directions.api_key = api_key;
    }

    let csv = File::open(csv_path)
        .map_err(|e| format!("Failed on open the CSV file: {}", e))?;
    let fixes = CsvSource::new(Reader::from_reader(csv), Some(conf.fields.clone()))
        .fetch()
        .map_err(|e| e.to_string())?;
    info!("{} fixes loaded", fixes.len());

    let directions = directions(&conf)?;
    let geocoder = geocoder(&conf)?;
    let source = Arc::new(ManualSource::new());

    runtime()?.block_on(async {
        let (mut controller, mut signals) =
            NavigationController::from_config(&conf, source.clone(), directions, geocoder);

        controller.start().map_err(|e| e.to_string())?;
        controller
            .set_destination(destination)
            .map_err(|e| e.to_string())?;

        for fix in fixes {
            source.push(fix);
        }
        source.finish();

        let mut accepted = vec![];
        while controller.process_next().await {
            while let Ok(signal) = signals.try_recv() {
                match signal {
                    NavigationSignal::Recenter(_) => {
                        if let Some(p) = &controller.state().current_position {
                            accepted.push(p.clone());
                        }
                    }
                    NavigationSignal::RouteUpdated => {
                        let view = controller.view();
                        info!(
                            "{} - {}",
                            view.status_text,
                            view.distance_text.unwrap_or_default()
                        );
                    }
                    NavigationSignal::Error(Some(kind)) => warn!("Navigation error: {:?}", kind),
                    NavigationSignal::Error(None) => {}
                }
            }
        }

        let view = controller.view();
        let json = serde_json::to_string_pretty(&view).map_err(|e| e.to_string())?;
        println!("{}", json);

        if let Some(path) = gpx {
            let mut generator = GpxGenerator::empty();
            if let (Some(route), Some(dest)) = (&controller.state().route, &controller.state().destination) {
                generator.route(route, dest.display_name());
            }
            generator.track(&accepted, "replay".to_string());
            write_gpx(&path, generator)?;
        }

        controller.stop();

        Ok::<(), String>(())
    })
}

fn init_logs() {
    let env = env_logger::Env::default().default_filter_or("info");
    let _ = env_logger::Builder::from_env(env).try_init();
}

fn runtime() -> Result<Runtime, String> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed on start the runtime: {}", e))
}

/// OpenRouteService when a key is configured, straight lines otherwise
fn directions(conf: &NavigationConfig) -> Result<Arc<dyn DirectionsService>, String> {
    if conf.directions.api_key.is_none() {
        warn!("No directions api_key configured, routes will be straight lines");
        return Ok(Arc::new(NoDirections));
    }

    let service = OpenRouteService::new(&conf.directions).map_err(|e: NavError| e.to_string())?;

    Ok(Arc::new(service))
}

fn geocoder(conf: &NavigationConfig) -> Result<Arc<dyn ReverseGeocoder>, String> {
    if !conf.geocoder.enabled {
        return Ok(Arc::new(NoGeocoder));
    }

    let service = Nominatim::new(&conf.geocoder).map_err(|e| e.to_string())?;

    Ok(Arc::new(service))
}

fn write_gpx(path: &str, generator: GpxGenerator) -> Result<(), String> {
    let destination = File::create(path)
        .map_err(|e| format!("Failed on create the destination file: {}", e))?;

    let doc = generator.generate()?;

    let mut writer = BufWriter::new(destination);
    gpx::write(&doc, &mut writer).map_err(|e| e.to_string())?;

    Ok(())
}

/// Load the current config
fn load_configs(provided: Option<String>) -> NavigationConfig {
    let mut options = vec![];

    if let Some(sprovided) = provided {
        options.push(sprovided);
    }

    options.push(".navtrack.yaml".to_string());

    if let Some(home) = dirs::home_dir() {
        if let Some(shome) = home.to_str() {
            options.push(format!("{}/.navtrack.yaml", shome));
        }
    }

    let mut yaml: Option<String> = None;
    for fi in options {
        if let Ok(s) = fs::read_to_string(fi) {
            yaml = Some(s);
            break;
        }
    }

    if let Some(s) = yaml {
        match NavigationConfig::from_yaml(&s) {
            Ok(conf) => return conf,
            Err(e) => warn!("Ignoring config file: {}", e),
        }
    }

    NavigationConfig::default()
}

#[test]
fn parse_configs() -> Result<(), String> {
    use navtrack::sources::FieldsBuilder;

    let yaml = "\nfields:\nrouting:";

    let conf = NavigationConfig::from_yaml(yaml).map_err(|e| e.to_string())?;
    assert_eq!(FieldsBuilder::default(), conf.fields);
    assert_eq!(50.0, conf.routing.near_threshold);

    let yaml = "\nfields:\n  coordinates: coords\n  flip_coordinates: true\nrouting:\n  near_threshold: 20";

    let conf = NavigationConfig::from_yaml(yaml).map_err(|e| e.to_string())?;
    assert_eq!(
        FieldsBuilder {
            coordinates: "coords".to_string(),
            time: "time".to_string(),
            accuracy: "accuracy".to_string(),
            flip_coordinates: true,
        },
        conf.fields
    );
    assert_eq!(20.0, conf.routing.near_threshold);

    Ok(())
}
