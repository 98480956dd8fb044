//! Sheet layout registry and slicer.
//!
//! A [`SheetLayout`] describes how the rows and columns of a sprite sheet map
//! onto facings and animation families. The registry is a fixed table; the
//! slicer walks the table entry for a layout and produces an [`Atlas`].
//!
//! Slicing pipeline:
//! 1. Cut the image into a `rows x cols` grid (integer division, so sheets
//!    that do not divide evenly lose the remainder pixels on the right and
//!    bottom edges).
//! 2. Assign each authored frame to `<family><direction>` from the layout's
//!    table.
//! 3. Alias the facings the layout has no art for onto an adjacent authored
//!    facing, per family.
//! 4. Apply the layout's post-slice remap to every sequence.

use std::fmt;
use std::sync::Arc;

use arrayvec::ArrayVec;
use log::warn;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::components::direction::Direction;
use crate::resources::atlas::{Atlas, AtlasKey, Family, FrameId, FrameRect, animation_key};

/// Identifier of a registered layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayoutId {
    #[default]
    #[serde(rename = "dlru")]
    Dlru,
    #[serde(rename = "durlReduced")]
    DurlReduced,
    #[serde(rename = "eight")]
    Eight,
    #[serde(rename = "diagonal")]
    Diagonal,
    #[serde(rename = "nihey")]
    Nihey,
    #[serde(rename = "universalLPC")]
    UniversalLpc,
    #[serde(rename = "sleepingRobot")]
    SleepingRobot,
}

impl LayoutId {
    pub const ALL: [LayoutId; 7] = [
        LayoutId::Dlru,
        LayoutId::DurlReduced,
        LayoutId::Eight,
        LayoutId::Diagonal,
        LayoutId::Nihey,
        LayoutId::UniversalLpc,
        LayoutId::SleepingRobot,
    ];

    pub fn name(self) -> &'static str {
        self.layout().name
    }

    /// Look up a layout by its registered name.
    pub fn from_name(name: &str) -> Option<LayoutId> {
        LayoutId::ALL.into_iter().find(|id| id.name() == name)
    }

    /// Like [`LayoutId::from_name`], but unknown names fall back to the
    /// default layout with a warning.
    pub fn resolve(name: &str) -> LayoutId {
        LayoutId::from_name(name).unwrap_or_else(|| {
            warn!(
                "Unknown spritesheet layout '{}', falling back to '{}'",
                name,
                LayoutId::default().name()
            );
            LayoutId::default()
        })
    }

    pub fn layout(self) -> &'static SheetLayout {
        &LAYOUTS[self as usize]
    }
}

impl fmt::Display for LayoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which facings a layout has art for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authoring {
    /// down/left/right/up; diagonals borrow from the orthogonals.
    Orthogonal,
    /// The four diagonals; orthogonals borrow from the diagonals.
    Diagonal,
    /// All eight facings.
    Full,
}

impl Authoring {
    /// Facings that reuse the sequence authored for `direction`.
    pub fn aliases(self, direction: Direction) -> ArrayVec<Direction, 2> {
        let mut out = ArrayVec::new();
        match (self, direction) {
            (Authoring::Orthogonal, Direction::Down) => {
                out.push(Direction::DownLeft);
                out.push(Direction::DownRight);
            }
            (Authoring::Orthogonal, Direction::Left) => out.push(Direction::UpLeft),
            (Authoring::Orthogonal, Direction::Right) => out.push(Direction::UpRight),
            (Authoring::Diagonal, Direction::DownRight) => out.push(Direction::Down),
            (Authoring::Diagonal, Direction::UpRight) => out.push(Direction::Right),
            (Authoring::Diagonal, Direction::UpLeft) => out.push(Direction::Up),
            (Authoring::Diagonal, Direction::DownLeft) => out.push(Direction::Left),
            _ => {}
        }
        out
    }
}

/// Consecutive run of frames belonging to one family, split evenly across
/// the layout's direction order.
#[derive(Debug, Clone, Copy)]
pub struct FrameBlock {
    pub family: Family,
    pub frames_per_direction: usize,
}

/// How a sheet's grid cells map onto sequences.
#[derive(Debug, Clone, Copy)]
pub enum Partition {
    /// One facing per row, one frame per column. `cols: None` uses the
    /// requested frame count.
    Rows {
        rows: u32,
        cols: Option<u32>,
        /// First grid row holding the walk cycle.
        first_row: u32,
        /// Columns actually read per row; `None` reads all of them.
        used_cols: Option<u32>,
        order: &'static [Direction],
    },
    /// Frames read row-major and split into family blocks by index range.
    Blocks {
        rows: u32,
        cols: u32,
        order: &'static [Direction],
        blocks: &'static [FrameBlock],
    },
}

/// Declarative description of a sheet format.
#[derive(Debug, Clone, Copy)]
pub struct SheetLayout {
    pub id: LayoutId,
    pub name: &'static str,
    pub label: &'static str,
    pub partition: Partition,
    /// Frame count the layout always uses, regardless of the request.
    pub forced_frames: Option<u32>,
    pub authoring: Authoring,
    /// Post-slice reorder applied to every sequence.
    pub remap: Option<&'static [usize]>,
    /// Height/width correction used by [`SheetLayout::anchor`]; `None` uses
    /// `4 / frames`.
    pub default_ratio: Option<f32>,
    /// Art is centered on the cell instead of standing on its bottom edge.
    pub centered_anchor: bool,
    pub includes_idle: bool,
}

static DLRU: [Direction; 4] = [
    Direction::Down,
    Direction::Left,
    Direction::Right,
    Direction::Up,
];
static DURL: [Direction; 4] = [
    Direction::Down,
    Direction::Up,
    Direction::Right,
    Direction::Left,
];
static ULDR: [Direction; 4] = [
    Direction::Up,
    Direction::Left,
    Direction::Down,
    Direction::Right,
];
static DULR: [Direction; 4] = [
    Direction::Down,
    Direction::Up,
    Direction::Left,
    Direction::Right,
];
static EIGHT: [Direction; 8] = [
    Direction::Down,
    Direction::DownRight,
    Direction::Right,
    Direction::UpRight,
    Direction::Up,
    Direction::UpLeft,
    Direction::Left,
    Direction::DownLeft,
];
static DIAGONALS: [Direction; 4] = [
    Direction::DownRight,
    Direction::UpRight,
    Direction::UpLeft,
    Direction::DownLeft,
];
static ROBOT_BLOCKS: [FrameBlock; 3] = [
    FrameBlock {
        family: Family::Idle,
        frames_per_direction: 4,
    },
    FrameBlock {
        family: Family::Walk,
        frames_per_direction: 6,
    },
    FrameBlock {
        family: Family::Run,
        frames_per_direction: 6,
    },
];

const fn four_rows(order: &'static [Direction]) -> Partition {
    Partition::Rows {
        rows: 4,
        cols: None,
        first_row: 0,
        used_cols: None,
        order,
    }
}

/// The registry, indexed by `LayoutId as usize`.
static LAYOUTS: [SheetLayout; 7] = [
    SheetLayout {
        id: LayoutId::Dlru,
        name: "dlru",
        label: "Down-Left-Right-Up",
        partition: four_rows(&DLRU),
        forced_frames: None,
        authoring: Authoring::Orthogonal,
        remap: None,
        default_ratio: None,
        centered_anchor: false,
        includes_idle: false,
    },
    SheetLayout {
        id: LayoutId::DurlReduced,
        name: "durlReduced",
        label: "Down-Up-Right-Left (reduced)",
        partition: four_rows(&DURL),
        forced_frames: Some(3),
        authoring: Authoring::Orthogonal,
        remap: Some(&[0, 1, 0, 2]),
        default_ratio: None,
        centered_anchor: false,
        includes_idle: false,
    },
    SheetLayout {
        id: LayoutId::Eight,
        name: "eight",
        label: "Eight directions",
        partition: Partition::Rows {
            rows: 8,
            cols: None,
            first_row: 0,
            used_cols: None,
            order: &EIGHT,
        },
        forced_frames: None,
        authoring: Authoring::Full,
        remap: None,
        default_ratio: None,
        centered_anchor: true,
        includes_idle: false,
    },
    SheetLayout {
        id: LayoutId::Diagonal,
        name: "diagonal",
        label: "Four diagonals",
        partition: four_rows(&DIAGONALS),
        forced_frames: None,
        authoring: Authoring::Diagonal,
        remap: None,
        default_ratio: None,
        centered_anchor: false,
        includes_idle: false,
    },
    SheetLayout {
        id: LayoutId::Nihey,
        name: "nihey",
        label: "Nihey",
        partition: four_rows(&DURL),
        forced_frames: Some(3),
        authoring: Authoring::Orthogonal,
        remap: Some(&[1, 0, 1, 2]),
        default_ratio: None,
        centered_anchor: false,
        includes_idle: false,
    },
    SheetLayout {
        id: LayoutId::UniversalLpc,
        name: "universalLPC",
        label: "Universal LPC",
        partition: Partition::Rows {
            rows: 54,
            cols: Some(13),
            first_row: 8,
            used_cols: Some(9),
            order: &ULDR,
        },
        forced_frames: Some(13),
        authoring: Authoring::Orthogonal,
        remap: None,
        default_ratio: Some(54.0 / 13.0),
        centered_anchor: false,
        includes_idle: false,
    },
    SheetLayout {
        id: LayoutId::SleepingRobot,
        name: "sleepingRobot",
        label: "Sleeping Robot (idle + walk + run)",
        partition: Partition::Blocks {
            rows: 8,
            cols: 8,
            order: &DULR,
            blocks: &ROBOT_BLOCKS,
        },
        forced_frames: Some(6),
        authoring: Authoring::Orthogonal,
        remap: None,
        default_ratio: Some(1.0),
        centered_anchor: false,
        includes_idle: true,
    },
];

/// How the host should fit the texture to the entity's footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fit {
    Contain,
    Width,
}

/// Texture anchor suggestion for host positioning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub x: f32,
    pub y: f32,
    pub fit: Fit,
}

impl Anchor {
    pub const CENTERED: Anchor = Anchor {
        x: 0.5,
        y: 0.5,
        fit: Fit::Contain,
    };
}

impl SheetLayout {
    /// Apply the layout's forced frame count, keeping at least one column.
    pub fn normalize_frames(&self, frame_count: u32) -> u32 {
        self.forced_frames.unwrap_or(frame_count).max(1)
    }

    /// Grid dimensions `(rows, cols)` for a normalized frame count.
    pub fn grid(&self, frame_count: u32) -> (u32, u32) {
        match self.partition {
            Partition::Rows { rows, cols, .. } => (rows, cols.unwrap_or(frame_count).max(1)),
            Partition::Blocks { rows, cols, .. } => (rows, cols),
        }
    }

    /// Anchor suggestion for a sheet of `width x height` pixels drawn at
    /// `scale`. The art stands on the bottom of the cell unless the layout
    /// is centered.
    pub fn anchor(&self, frame_count: u32, width: u32, height: u32, scale: f32) -> Anchor {
        if width == 0 || height == 0 || scale <= 0.0 {
            return Anchor::CENTERED;
        }
        let frames = self.normalize_frames(frame_count) as f32;
        let default_ratio = self.default_ratio.unwrap_or(4.0 / frames);
        let ratio = (height as f32 / width as f32) * default_ratio;
        let y = if self.centered_anchor {
            0.5
        } else {
            1.02 + (0.5 / (-ratio * scale))
        };
        Anchor {
            x: 0.5,
            y: (100.0 * y).ceil() / 100.0,
            fit: Fit::Width,
        }
    }

    /// Slice a `width x height` image into an atlas for `key`.
    ///
    /// `key.layout` is expected to be this layout; its frame count has
    /// already been normalized by [`AtlasKey`].
    pub fn slice(&self, key: &AtlasKey, width: u32, height: u32) -> Atlas {
        let (rows, cols) = self.grid(key.frame_count);
        let frame_w = width / cols;
        let frame_h = height / rows;
        let mut builder = SliceBuilder::new(key);

        match self.partition {
            Partition::Rows {
                first_row,
                used_cols,
                order,
                ..
            } => {
                let used = used_cols.unwrap_or(cols).min(cols);
                for (r, direction) in order.iter().enumerate() {
                    for c in 0..used {
                        let rect = FrameRect::new(
                            frame_w * c,
                            frame_h * (first_row + r as u32),
                            frame_w,
                            frame_h,
                        );
                        builder.push(Family::Walk, *direction, rect);
                    }
                }
            }
            Partition::Blocks { order, blocks, .. } => {
                let total = (rows * cols) as usize;
                let mut f = 0usize;
                for block in blocks {
                    for direction in order {
                        for _ in 0..block.frames_per_direction {
                            if f >= total {
                                break;
                            }
                            let c = (f as u32) % cols;
                            let r = (f as u32) / cols;
                            let rect = FrameRect::new(frame_w * c, frame_h * r, frame_w, frame_h);
                            builder.push(block.family, *direction, rect);
                            f += 1;
                        }
                    }
                }
            }
        }

        builder.alias(self.authoring);
        if let Some(remap) = self.remap {
            builder.remap(remap);
        }
        builder.finish(width, height)
    }
}

/// Slice an image with a layout looked up by name.
///
/// Unknown layout names fall back to the default layout. The generated
/// frame identifiers are namespaced with an empty image source; use
/// [`SheetLayout::slice`] with a full [`AtlasKey`] when the source matters.
pub fn slice(layout: &str, frame_count: u32, width: u32, height: u32) -> Atlas {
    let key = AtlasKey::new("", layout, frame_count);
    key.layout.layout().slice(&key, width, height)
}

/// Accumulates frames and sequences while slicing.
struct SliceBuilder<'a> {
    key: &'a AtlasKey,
    prefix: String,
    frames: FxHashMap<FrameId, FrameRect>,
    animations: FxHashMap<String, Vec<FrameId>>,
}

impl<'a> SliceBuilder<'a> {
    fn new(key: &'a AtlasKey) -> Self {
        let mut animations = FxHashMap::default();
        for d in Direction::ALL {
            animations.insert(d.name().to_string(), Vec::new());
        }
        Self {
            key,
            prefix: key.to_string(),
            frames: FxHashMap::default(),
            animations,
        }
    }

    fn push(&mut self, family: Family, direction: Direction, rect: FrameRect) {
        let anim = animation_key(family, direction);
        let seq = self.animations.entry(anim).or_default();
        let id: FrameId = Arc::from(format!(
            "{}-{}{}{}",
            self.prefix,
            family.prefix(),
            direction.name(),
            seq.len()
        ));
        seq.push(id.clone());
        self.frames.insert(id, rect);
    }

    /// Copy authored sequences onto the facings the layout has no art for.
    fn alias(&mut self, authoring: Authoring) {
        for family in Family::ALL {
            for direction in Direction::ALL {
                let source = animation_key(family, direction);
                let Some(seq) = self.animations.get(&source).filter(|s| !s.is_empty()).cloned()
                else {
                    continue;
                };
                for target in authoring.aliases(direction) {
                    let target = animation_key(family, target);
                    let slot = self.animations.entry(target).or_default();
                    if slot.is_empty() {
                        *slot = seq.clone();
                    }
                }
            }
        }
    }

    /// Reorder/duplicate every sequence through `remap`. Indices past the end
    /// of a sequence are skipped.
    fn remap(&mut self, remap: &[usize]) {
        for seq in self.animations.values_mut() {
            let remapped: Vec<FrameId> =
                remap.iter().filter_map(|&i| seq.get(i).cloned()).collect();
            if !remapped.is_empty() {
                *seq = remapped;
            }
        }
    }

    fn finish(self, width: u32, height: u32) -> Atlas {
        Atlas::new(self.key.clone(), self.frames, self.animations, width, height)
    }
}
