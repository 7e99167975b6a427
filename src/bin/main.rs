//! World Mesher CLI
//!
//! Mesh a JSON voxel world and report what was produced.

use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use world_mesher::{mesh_world, CubeModelResolver, MemoryWorld, MesherConfig};

#[derive(Parser)]
#[command(name = "world-mesher")]
#[command(author, version, about = "Generate multi-resolution meshes from voxel worlds", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mesh a world and print the export statistics
    Export {
        /// World JSON file (palette, blocks, entities)
        #[arg(short, long)]
        world: PathBuf,

        /// Mesher configuration JSON; defaults apply when absent
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Resolver JSON with custom models and average colors
        #[arg(short, long)]
        resolver: Option<PathBuf>,

        /// Number of mesh workers
        #[arg(short, long)]
        threads: Option<usize>,

        /// Merge coplanar quads
        #[arg(long)]
        greedy: bool,

        /// Emit one mesh per group
        #[arg(long)]
        partitioned: bool,

        /// Group edge length in columns
        #[arg(long)]
        partition_size: Option<u32>,

        /// Skip blocks enclosed from the sky
        #[arg(long)]
        cave_culling: bool,

        /// Enable level of detail around a center column, e.g. "0,0"
        #[arg(long, value_parser = parse_center)]
        lod_center: Option<[i32; 2]>,

        /// Biome for level-of-detail tinting (e.g., "plains", "swamp")
        #[arg(long)]
        biome: Option<String>,
    },

    /// Show information about a world file
    Info {
        /// World JSON file
        #[arg(short, long)]
        world: PathBuf,
    },
}

fn parse_center(s: &str) -> Result<[i32; 2], String> {
    let (x, z) = s
        .split_once(',')
        .ok_or_else(|| format!("Invalid center: '{}'. Use x,z", s))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<i32>()
            .map_err(|e| format!("Invalid center coordinate '{}': {}", v, e))
    };
    Ok([parse(x)?, parse(z)?])
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            world,
            config,
            resolver,
            threads,
            greedy,
            partitioned,
            partition_size,
            cave_culling,
            lod_center,
            biome,
        } => {
            let mut config = match config {
                Some(path) => MesherConfig::from_path(path)?,
                None => MesherConfig::default(),
            };
            if threads.is_some() {
                config.threads = threads;
            }
            config.greedy_mesh |= greedy;
            config.partitioned |= partitioned;
            config.cave_culling |= cave_culling;
            if let Some(size) = partition_size {
                config.partition_size = size;
            }
            if let Some(center) = lod_center {
                config.lod.enabled = true;
                config.lod.center = center;
            }
            if biome.is_some() {
                config.biome = biome;
            }
            config.validate()?;

            export(&world, config, resolver.as_ref())?;
        }
        Commands::Info { world } => {
            show_world_info(&world)?;
        }
    }

    Ok(())
}

fn export(
    world_path: &PathBuf,
    config: MesherConfig,
    resolver_path: Option<&PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Loading world from {:?}...", world_path);
    let world = MemoryWorld::from_path(world_path)?;
    println!("  Loaded {} blocks", world.block_count());

    let resolver = match resolver_path {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => CubeModelResolver::new(),
    };

    let output = mesh_world(&world, &resolver, config)?;
    println!(
        "  Generated {} units, {} faces, {} vertices, {} materials",
        output.units.len(),
        output.face_count(),
        output.vertex_count(),
        output.materials.len()
    );
    println!("{}", serde_json::to_string_pretty(&output.stats)?);

    Ok(())
}

fn show_world_info(world_path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    println!("Loading world from {:?}...", world_path);
    let world = MemoryWorld::from_path(world_path)?;

    println!("\nWorld Info:");
    println!("  Palette entries: {}", world.palette().len());
    println!("  Blocks: {}", world.block_count());
    match world.bounds() {
        Some(bounds) => {
            println!("  Bounds: {:?} to {:?}", bounds.min, bounds.max);
            println!(
                "  Columns: {} x {}, sections {:?}",
                bounds.column_range_x().count(),
                bounds.column_range_z().count(),
                bounds.section_range()
            );
        }
        None => println!("  Bounds: empty"),
    }

    Ok(())
}
