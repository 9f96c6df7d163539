//! Procedural bean character generator.
//!
//! Builds a low-poly bean-shaped character with a ragdoll armature,
//! auto-weights it and exports it as a GLB in T-pose.
//!
//! Usage:
//!   bean-rig                        # writes apps/client/public/models/bean_character.glb
//!   bean-rig --output bean.glb      # custom location
//!   bean-rig --subdivisions 0       # skip subdivision

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

mod armature;
mod asset_pipeline;
mod bean;
mod config;
mod generator;
mod geometry;
mod math;
mod scene_graph;
mod skinning;

#[derive(Parser)]
#[command(name = "bean-rig")]
#[command(about = "Generate the rigged bean character as a GLB")]
struct Cli {
    /// Output file. Relative paths resolve against the project root.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Catmull-Clark subdivision levels applied before export (0-4)
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=4))]
    subdivisions: Option<u32>,
}

fn main() -> Result<()> {
    pretty_env_logger::formatted_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_env("RUST_LOG")
        .init();

    let cli = Cli::parse();

    let mut config = config::BeanConfig::default();
    if let Some(output) = cli.output {
        config.export.output_path = output;
    }
    if let Some(levels) = cli.subdivisions {
        config.tessellation.subdivision_levels = levels;
    }

    log::info!("{}", "=".repeat(60));
    log::info!("Bean Character Generator");
    log::info!("{}", "=".repeat(60));

    let working_dir = std::env::current_dir().context("Failed to read working directory")?;
    let output = config.export.resolve_output_path(&working_dir);
    log::info!("Output path: {}", output.display());

    generator::run(&config, &output)?;

    log::info!("Done! Bean character exported successfully.");

    Ok(())
}
