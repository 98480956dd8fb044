//! Sliced sprite-sheet atlases.
//!
//! An [`Atlas`] is the result of cutting one source image with one
//! [`SheetLayout`](crate::resources::sheetlayout::SheetLayout): a table of
//! pixel rectangles keyed by generated frame identifiers, plus the ordered
//! frame lists for every animation key (`"down"`, `"idleleft"`,
//! `"runupright"`, ...).
//!
//! The serialized shape follows the TexturePacker "hash" JSON format so an
//! atlas can be handed to any renderer that understands it.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::components::direction::Direction;
use crate::resources::sheetlayout::LayoutId;

/// Identifier of one sliced frame, namespaced by its [`AtlasKey`].
pub type FrameId = Arc<str>;

/// Axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }

    /// True when the two rectangles share any pixel.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

/// Geometry of one frame inside the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameRect {
    /// Region of the source image holding the frame.
    pub frame: Rect,
    /// Untrimmed size of the frame.
    pub source_size: Size,
    /// Placement of the trimmed frame inside `source_size`.
    pub sprite_source_size: Rect,
}

impl FrameRect {
    /// Untrimmed frame at `(x, y)` with the given size.
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self {
            frame: Rect::new(x, y, w, h),
            source_size: Size { w, h },
            sprite_source_size: Rect::new(0, 0, w, h),
        }
    }
}

/// Animation family a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Idle,
    Walk,
    Run,
}

impl Family {
    pub const ALL: [Family; 3] = [Family::Idle, Family::Walk, Family::Run];

    /// Key prefix; walking keys are the bare direction name.
    pub fn prefix(self) -> &'static str {
        match self {
            Family::Idle => "idle",
            Family::Walk => "",
            Family::Run => "run",
        }
    }
}

/// Animation key for a family and facing, e.g. `"idledown"` or `"left"`.
pub fn animation_key(family: Family, direction: Direction) -> String {
    format!("{}{}", family.prefix(), direction.name())
}

/// Cache key of an atlas: source image, resolved layout and normalized
/// frame count.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AtlasKey {
    pub source: Arc<str>,
    pub layout: LayoutId,
    pub frame_count: u32,
}

impl AtlasKey {
    /// Build a key, resolving the layout name (unknown names fall back to the
    /// default layout) and forcing the layout's fixed frame count if it has one.
    pub fn new(source: &str, layout: &str, frame_count: u32) -> Self {
        Self::for_layout(source, LayoutId::resolve(layout), frame_count)
    }

    pub fn for_layout(source: &str, layout: LayoutId, frame_count: u32) -> Self {
        Self {
            source: Arc::from(source),
            layout,
            frame_count: layout.layout().normalize_frames(frame_count),
        }
    }
}

impl fmt::Display for AtlasKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}:{}", self.layout, self.frame_count, self.source)
    }
}

/// Source image description carried in the serialized atlas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtlasMeta {
    pub image: Arc<str>,
    pub format: String,
    pub size: Size,
    pub scale: f32,
}

/// Frame rectangles and per-key frame sequences for one sheet instantiation.
///
/// Invariant: every compass direction has a non-empty walking sequence.
#[derive(Debug, Clone, Serialize)]
pub struct Atlas {
    #[serde(skip)]
    key: AtlasKey,
    frames: FxHashMap<FrameId, FrameRect>,
    animations: FxHashMap<String, Vec<FrameId>>,
    meta: AtlasMeta,
}

impl Atlas {
    pub(crate) fn new(
        key: AtlasKey,
        frames: FxHashMap<FrameId, FrameRect>,
        animations: FxHashMap<String, Vec<FrameId>>,
        width: u32,
        height: u32,
    ) -> Self {
        let meta = AtlasMeta {
            image: key.source.clone(),
            format: "RGBA8888".to_string(),
            size: Size {
                w: width,
                h: height,
            },
            scale: 1.0,
        };
        Self {
            key,
            frames,
            animations,
            meta,
        }
    }

    /// Atlas that shows the whole image for every facing.
    ///
    /// Used when the real sheet failed to load and a placeholder image is
    /// displayed instead.
    pub fn static_image(key: AtlasKey, width: u32, height: u32) -> Self {
        let id: FrameId = Arc::from(format!("{}-static", key));
        let mut frames = FxHashMap::default();
        frames.insert(id.clone(), FrameRect::new(0, 0, width, height));
        let animations = Direction::ALL
            .into_iter()
            .map(|d| (d.name().to_string(), vec![id.clone()]))
            .collect();
        Self::new(key, frames, animations, width, height)
    }

    pub fn key(&self) -> &AtlasKey {
        &self.key
    }

    pub fn meta(&self) -> &AtlasMeta {
        &self.meta
    }

    /// All animation sequences keyed by animation key.
    pub fn sequences(&self) -> &FxHashMap<String, Vec<FrameId>> {
        &self.animations
    }

    pub fn sequence(&self, key: &str) -> Option<&[FrameId]> {
        self.animations.get(key).map(Vec::as_slice)
    }

    pub fn has_sequence(&self, key: &str) -> bool {
        self.animations.contains_key(key)
    }

    pub fn frames(&self) -> &FxHashMap<FrameId, FrameRect> {
        &self.frames
    }

    pub fn frame(&self, id: &str) -> Option<&FrameRect> {
        self.frames.get(id)
    }

    pub fn frame_ids(&self) -> impl Iterator<Item = &FrameId> {
        self.frames.keys()
    }

    /// Render the atlas as TexturePacker-style JSON.
    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self).map_err(|e| format!("Failed to serialize atlas: {}", e))
    }
}
