//! sheetwalk command line front end.
//!
//! Inspects the sheet layout registry and runs a small headless simulation
//! through the same world and schedule a host would embed:
//!
//! ```sh
//! sheetwalk layouts
//! sheetwalk slice --layout eight --frames 4 --width 128 --height 256
//! sheetwalk anchor --layout dlru --frames 4 --width 128 --height 192
//! sheetwalk walk --layout dlru --frames 4 --steps 20 --seed 7 --blockers 6
//! ```
//!
//! Set `RUST_LOG=debug` to follow every transition of the walk.

use std::path::PathBuf;
use std::process::ExitCode;

use bevy_ecs::prelude::*;
use clap::{Parser, Subcommand};
use fastrand::Rng;
use log::{error, info};

use sheetwalk::components::animation::{AnimationState, SpriteFrame, SpriteSheet};
use sheetwalk::components::direction::Direction;
use sheetwalk::components::mapposition::MapPosition;
use sheetwalk::components::occupant::{Disposition, Occupant};
use sheetwalk::components::rotation::Rotation;
use sheetwalk::components::tween::MoveAnimation;
use sheetwalk::components::zindex::ZIndex;
use sheetwalk::events::movement::MoveRequested;
use sheetwalk::pathing::{ConstrainOptions, Waypoint, constrain_path, find_movement_path};
use sheetwalk::resources::animationconfig::AnimationConfig;
use sheetwalk::resources::atlas::AtlasKey;
use sheetwalk::resources::gridgeometry::GridGeometry;
use sheetwalk::resources::occupancy::OccupancyMap;
use sheetwalk::resources::sheetlayout::{LayoutId, Partition};
use sheetwalk::resources::texturestore::{
    TextureHandle, TextureLoader, setup_texture_loader, shutdown_texture_loader,
};
use sheetwalk::runtime::{build_schedule, build_world, tick};

/// Sprite-sheet slicing and token animation playback.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Load animation settings from this INI file.
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Write the effective settings to this INI file and exit.
    #[arg(long, value_name = "PATH", global = true)]
    write_config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// List the registered sheet layouts.
    Layouts,
    /// Slice a sheet and print its atlas as JSON.
    Slice {
        #[arg(long, default_value = "dlru")]
        layout: String,
        #[arg(long, default_value_t = 4)]
        frames: u32,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        /// Image name written to the atlas metadata.
        #[arg(long, default_value = "sheet.png")]
        source: String,
    },
    /// Print the suggested texture anchor for a sheet.
    Anchor {
        #[arg(long, default_value = "dlru")]
        layout: String,
        #[arg(long, default_value_t = 4)]
        frames: u32,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        #[arg(long, default_value_t = 1.0)]
        scale: f32,
    },
    /// Random-walk a token around a small board with blocking occupants.
    Walk {
        #[arg(long, default_value = "dlru")]
        layout: String,
        #[arg(long, default_value_t = 4)]
        frames: u32,
        #[arg(long, default_value_t = 10)]
        steps: u32,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, default_value_t = 4)]
        blockers: u32,
        /// Board side in grid cells.
        #[arg(long, default_value_t = 10)]
        board: i32,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AnimationConfig::with_path(path),
        None => AnimationConfig::new(),
    };
    if cli.config.is_some() {
        if let Err(e) = config.load_from_file() {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    }

    if let Some(path) = cli.write_config {
        config.config_path = path;
        return match config.save_to_file() {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("{}", e);
                ExitCode::FAILURE
            }
        };
    }

    match cli.command.unwrap_or(Command::Layouts) {
        Command::Layouts => list_layouts(),
        Command::Slice {
            layout,
            frames,
            width,
            height,
            source,
        } => {
            let key = AtlasKey::new(&source, &layout, frames);
            let atlas = key.layout.layout().slice(&key, width, height);
            match atlas.to_json() {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    error!("{}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
        Command::Anchor {
            layout,
            frames,
            width,
            height,
            scale,
        } => {
            let anchor = LayoutId::resolve(&layout)
                .layout()
                .anchor(frames, width, height, scale);
            match serde_json::to_string(&anchor) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    error!("Failed to serialize anchor: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
        Command::Walk {
            layout,
            frames,
            steps,
            seed,
            blockers,
            board,
        } => {
            let seed = seed.unwrap_or_else(|| fastrand::u64(..));
            random_walk(config, &layout, frames, steps, seed, blockers, board.max(2));
        }
    }
    ExitCode::SUCCESS
}

fn list_layouts() {
    for id in LayoutId::ALL {
        let layout = id.layout();
        let rows = match layout.partition {
            Partition::Rows { rows, .. } | Partition::Blocks { rows, .. } => rows,
        };
        let forced = layout
            .forced_frames
            .map_or_else(|| "-".to_string(), |n| n.to_string());
        println!(
            "{:<14} rows={:<3} frames={:<3} authoring={:<11} idle={:<5} {}",
            layout.name,
            rows,
            forced,
            format!("{:?}", layout.authoring).to_lowercase(),
            layout.includes_idle,
            layout.label
        );
    }
}

/// Loader that "decodes" every source to a blank sheet of a fixed size.
struct BlankSheets {
    width: u32,
    height: u32,
}

impl TextureLoader for BlankSheets {
    fn load_texture(&mut self, source: &str) -> Option<TextureHandle> {
        Some(TextureHandle::new(source, self.width, self.height))
    }
}

fn random_walk(
    config: AnimationConfig,
    layout: &str,
    frames: u32,
    steps: u32,
    seed: u64,
    blockers: u32,
    board: i32,
) {
    const DT: f32 = 1.0 / 30.0;
    const MAX_TICKS_PER_STEP: u32 = 30 * 60;

    info!("Random walk: seed {}, {} steps on a {}x{} board", seed, steps, board, board);
    let mut rng = Rng::with_seed(seed);
    let grid = GridGeometry::default();
    let mut world = build_world(config, grid);
    let mut schedule = build_schedule();
    let sheet = SpriteSheet::new("walker.png", layout, frames);
    let (rows, cols) = sheet.layout.layout().grid(sheet.key().frame_count);
    setup_texture_loader(
        &mut world,
        BlankSheets {
            width: cols * 32,
            height: rows * 48,
        },
    );

    let walker = world
        .spawn((
            MapPosition::new(0.0, 0.0),
            AnimationState::new(Direction::Down),
            sheet,
            Rotation::default(),
            ZIndex::default(),
            Occupant::new(Disposition::Friendly),
        ))
        .id();
    for _ in 0..blockers {
        let (x, y) = grid.cell_origin(rng.i32(1..board), rng.i32(1..board));
        world.spawn((MapPosition::new(x, y), Occupant::new(Disposition::Hostile)));
    }
    tick(&mut world, &mut schedule, 0.0);

    let mut last_frame: Option<SpriteFrame> = None;
    for step in 0..steps {
        let Some(from) = world.get::<MapPosition>(walker).copied() else {
            break;
        };
        let (col, row) = grid.cell_of(from.x, from.y);
        let target_col = (col + rng.i32(-3..=3)).clamp(0, board - 1);
        let target_row = (row + rng.i32(-3..=3)).clamp(0, board - 1);
        let (tx, ty) = grid.cell_origin(target_col, target_row);
        let requested = [Waypoint::new(from.x, from.y), Waypoint::new(tx, ty)];

        let (path, constrained) = {
            let map = world.resource::<OccupancyMap>();
            let config = world.resource::<AnimationConfig>();
            let host = map.view(walker, Some(Occupant::new(Disposition::Friendly)), grid, config);
            let filtered = find_movement_path(&host, &requested);
            constrain_path(&host, &filtered, &ConstrainOptions::default())
        };
        info!(
            "Step {}: ({}, {}) -> ({}, {}){}",
            step,
            col,
            row,
            target_col,
            target_row,
            if constrained { " [constrained]" } else { "" }
        );
        for waypoint in path.iter().skip(1) {
            world.trigger(MoveRequested::to(walker, waypoint.x, waypoint.y));
        }
        world.flush();

        for _ in 0..MAX_TICKS_PER_STEP {
            tick(&mut world, &mut schedule, DT);
            let frame = world.get::<SpriteFrame>(walker).cloned();
            if frame != last_frame {
                if let Some(frame) = &frame {
                    log::debug!("  {} -> {}", frame.animation, frame.frame_id);
                }
                last_frame = frame;
            }
            if world.get::<MoveAnimation>(walker).is_none() {
                break;
            }
        }
    }

    if let Some(pos) = world.get::<MapPosition>(walker) {
        let (col, row) = grid.cell_of(pos.x, pos.y);
        info!("Walker rests at cell ({}, {})", col, row);
    }
    shutdown_texture_loader(&mut world);
}
