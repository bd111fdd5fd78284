//! OSRM route-service enrichment against a real container.
//!
//! Needs Docker and a prepared MLD dataset: set `OSRM_DATA_DIR` to the
//! directory holding `<OSRM_DATASET>.osrm*` (default `region-latest`) and
//! `OSRM_PROBE_POINTS` to `lat,lng;lat,lng;...` inside that region.
//! Run with `cargo test -- --ignored`.

use std::env;
use std::time::{Duration, Instant};

use testcontainers::core::{IntoContainerPort, Mount};
use testcontainers::ReuseDirective;
use testcontainers::runners::SyncRunner;
use testcontainers::{Container, GenericImage, ImageExt, TestcontainersError};

use dispatch_planner::enrich::try_enrich;
use dispatch_planner::model::Coordinate;
use dispatch_planner::osrm::{OsrmClient, OsrmConfig};
use dispatch_planner::traits::LegProvider;

fn osrm_container() -> Result<(Container<GenericImage>, String), TestcontainersError> {
    let data_dir = env::var("OSRM_DATA_DIR").unwrap_or_else(|_| "osrm-data".to_string());
    let dataset = env::var("OSRM_DATASET").unwrap_or_else(|_| "region-latest".to_string());
    let data_dir = std::fs::canonicalize(&data_dir)
        .map_err(|err| TestcontainersError::other(format!("OSRM data dir {data_dir}: {err}")))?;

    let image = GenericImage::new("osrm/osrm-backend", "latest")
        .with_exposed_port(5000.tcp())
        .with_mount(Mount::bind_mount(data_dir.to_string_lossy().to_string(), "/data"))
        .with_cmd(vec![
            "osrm-routed".to_string(),
            "--algorithm".to_string(),
            "mld".to_string(),
            format!("/data/{dataset}.osrm"),
        ])
        .with_container_name(format!("dispatch-planner-osrm-{dataset}"))
        .with_startup_timeout(Duration::from_secs(30))
        .with_reuse(ReuseDirective::Always);

    let container = image.start()?;
    let port = container.get_host_port_ipv4(5000.tcp())?;
    Ok((container, format!("http://127.0.0.1:{port}")))
}

fn probe_points() -> Vec<Coordinate> {
    let raw = env::var("OSRM_PROBE_POINTS").expect("OSRM_PROBE_POINTS must list lat,lng pairs");
    raw.split(';')
        .map(|pair| {
            let (lat, lng) = pair.split_once(',').expect("lat,lng");
            (lat.trim().parse().expect("latitude"), lng.trim().parse().expect("longitude"))
        })
        .collect()
}

#[test]
#[ignore = "needs docker and a prepared OSRM dataset"]
fn osrm_measures_every_hop_in_order() {
    let (container, base_url) = osrm_container().expect("start OSRM container");
    let client = OsrmClient::new(OsrmConfig {
        base_url,
        ..OsrmConfig::default()
    })
    .expect("build OSRM client");

    let mut stops = probe_points();
    assert!(stops.len() >= 2, "need at least two probe points");
    stops.push(stops[0]);

    // The container may still be loading the dataset.
    let start = Instant::now();
    let whole = loop {
        match client.measure(&stops) {
            Ok(legs) => break legs,
            Err(err) if start.elapsed() < Duration::from_secs(15) => {
                eprintln!("OSRM not ready: {err}");
                std::thread::sleep(Duration::from_millis(500));
            }
            Err(err) => panic!("OSRM never answered: {err}"),
        }
    };
    assert_eq!(whole.len(), stops.len() - 1);
    assert!(whole.iter().all(|leg| leg.distance_meters >= 0.0));

    let chunked = try_enrich(&stops, 2, &client).expect("chunked enrichment");
    assert_eq!(chunked.calls, stops.len() - 1);
    assert_eq!(chunked.legs.len(), whole.len());
    // Per-hop requests may approach a waypoint from another side.
    for (a, b) in whole.iter().zip(&chunked.legs) {
        assert!((a.distance_meters - b.distance_meters).abs() <= 50.0 + 0.05 * a.distance_meters);
    }

    drop(container);
}
