//! mapstyle - render script generator.
//!
//! Reads a YAML map document listing GeoJSON layers and prints the Leaflet
//! callback that draws them.
//!
//! Run: `mapstyle map.yaml > map.js`

#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, LevelFilter};

use mapstyle::config::{MapConfig, MapDocument};
use mapstyle::generate;

/// mapstyle: classify and style GeoJSON layers for a Leaflet map
#[derive(Parser, Debug)]
#[command(name = "mapstyle")]
#[command(author = "PAIML Team")]
#[command(version)]
#[command(about = "Generate a Leaflet render script for styled GeoJSON layers", long_about = None)]
struct Cli {
    /// Map document (YAML) listing the layers
    document: PathBuf,

    /// Map config file path; overrides the document's `map` section
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Container element id
    #[arg(long)]
    id: Option<String>,

    /// Print the script and its metadata as JSON
    #[arg(long)]
    json: bool,

    /// Write to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(level(cli.verbose))
        .parse_default_env()
        .format_timestamp(None)
        .init();

    run(&cli)
}

fn level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn run(cli: &Cli) -> Result<()> {
    let document = MapDocument::load(&cli.document)
        .with_context(|| format!("reading map document {}", cli.document.display()))?;

    let mut config = map_config(cli, &document)?;
    if let Some(id) = &cli.id {
        config.id.clone_from(id);
    }

    let base_dir = cli.document.parent().unwrap_or_else(|| Path::new("."));
    let layers = document.load_layers(base_dir)?;
    info!("loaded {} layers from {}", layers.len(), cli.document.display());

    let script = generate(&layers, &config)?;

    let text = if cli.json {
        serde_json::to_string_pretty(&script)?
    } else {
        format!(
            "// container: #{} ({} x {})\n{}",
            script.container_id, script.width, script.height, script.script
        )
    };

    match &cli.output {
        Some(path) => std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?,
        None => print!("{text}"),
    }
    Ok(())
}

/// `--config`, then the document's `map` section, then the user config file.
fn map_config(cli: &Cli, document: &MapDocument) -> Result<MapConfig> {
    if let Some(path) = &cli.config {
        return MapConfig::load(path).with_context(|| format!("reading map config {}", path.display()));
    }
    if let Some(map) = &document.map {
        return Ok(map.clone());
    }
    Ok(MapConfig::load_or_default(
        dirs::config_dir().map(|p| p.join("mapstyle/map.yaml")).unwrap_or_default(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["mapstyle", "doc.yaml", "--id", "m1", "-vv", "--json"]).unwrap();
        assert_eq!(cli.document, PathBuf::from("doc.yaml"));
        assert_eq!(cli.id.as_deref(), Some("m1"));
        assert_eq!(level(cli.verbose), LevelFilter::Debug);
        assert!(cli.json);
    }

    #[test]
    fn test_run_writes_script() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.geojson"),
            r#"{"type":"FeatureCollection","features":[{"type":"Feature","geometry":{"type":"Point","coordinates":[1,2]},"properties":{"k":"x"}}]}"#,
        )
        .unwrap();
        let doc = dir.path().join("doc.yaml");
        std::fs::write(&doc, "map:\n  zoom: 4\nlayers:\n  - path: a.geojson\n    color: { attribute: k }\n").unwrap();
        let out = dir.path().join("map.js");

        let args: Vec<OsString> = vec![
            "mapstyle".into(),
            doc.clone().into_os_string(),
            "--output".into(),
            out.clone().into_os_string(),
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        run(&cli).unwrap();

        let script = std::fs::read_to_string(out).unwrap();
        assert!(script.starts_with("// container: #map"));
        assert!(script.contains(".setView([0, 0], 4);"));
        assert!(script.contains("layer_0_categories"));
    }
}
