//! bvh-export - humanoid rig motion exporter
//!
//! Bakes an animation clip of a rig described in TOML into a BVH file
//! (HIERARCHY + per-frame MOTION rows).

use anyhow::Result;
use bvh_core::SkeletonSource;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use bvh_export::{ExportOptions, bake, load_rig, selection};

#[derive(Parser)]
#[command(name = "bvh-export")]
#[command(about = "Humanoid rig to BVH motion exporter")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bake a clip to a BVH file
    Export {
        /// Path to the rig TOML file
        rig: PathBuf,

        /// Output .bvh file (default: <clip>.bvh next to the rig file)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Clip to bake (default: first animator state's motion)
        #[arg(short, long)]
        clip: Option<String>,

        /// Export root node (default: the target's Armature child)
        #[arg(short, long)]
        root: Option<String>,

        /// Export the root's global displacement
        #[arg(long)]
        root_motion: bool,

        /// Keep the source's left-handed axes instead of mirroring X
        #[arg(long)]
        left_handed: bool,
    },

    /// List animator states and their clips
    List {
        /// Path to the rig TOML file
        rig: PathBuf,
    },

    /// Build and print the exported hierarchy without baking
    Check {
        /// Path to the rig TOML file
        rig: PathBuf,

        /// Export root node (default: the target's Armature child)
        #[arg(short, long)]
        root: Option<String>,

        /// Treat the root as carrying root motion
        #[arg(long)]
        root_motion: bool,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            rig,
            output,
            clip,
            root,
            root_motion,
            left_handed,
        } => {
            tracing::info!("Exporting {:?}", rig);
            let options = ExportOptions {
                clip,
                root,
                root_motion,
                left_handed,
            };
            bake::bake_file(&rig, output.as_deref(), &options)?;
            tracing::info!("Done!");
        }

        Commands::List { rig: path } => {
            let rig = load_rig(&path)?;
            tracing::info!(
                "{:?}: {} humanoid bones mapped{}",
                path,
                rig.humanoid.len(),
                if rig.humanoid.is_humanoid() { "" } else { " (not humanoid)" }
            );
            for motion in selection::list_motions(&rig)? {
                tracing::info!(
                    "  {} -> {}: {:.3}s at {} fps ({} frames)",
                    motion.state,
                    motion.clip,
                    motion.length,
                    motion.frame_rate,
                    motion.frame_count
                );
            }
        }

        Commands::Check {
            rig: path,
            root,
            root_motion,
        } => {
            tracing::info!("Checking {:?}", path);
            let rig = load_rig(&path)?;
            let skeleton = bake::check(&rig, root.as_deref(), root_motion)?;
            tracing::info!(
                "Hierarchy is valid: {} joints, {} end sites, {} channels",
                skeleton.joint_count(),
                skeleton.end_site_count(),
                skeleton.channel_count()
            );
        }
    }

    Ok(())
}
