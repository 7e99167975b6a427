//! Block tinting and color conversion for level-of-detail materials.
//!
//! Grass, foliage and water textures are stored grey and tinted by biome at
//! render time. Level-of-detail boxes have no texture, so their flat colors
//! are built from the averaged texture color with the same tint applied.

use crate::types::Direction;

/// Color used when the resolver has no average color for a block.
pub const FALLBACK_COLOR: [f32; 3] = [0.5, 0.5, 0.5];

/// Tint colors for different block categories, in sRGB.
#[derive(Debug, Clone, PartialEq)]
pub struct TintColors {
    /// Grass tint (for grass blocks, grass, tall grass, etc.)
    pub grass: [f32; 3],
    /// Foliage tint (for leaves, vines, etc.)
    pub foliage: [f32; 3],
    pub water: [f32; 3],
}

impl Default for TintColors {
    fn default() -> Self {
        Self {
            // Plains biome approximate
            grass: [0.56, 0.74, 0.35],
            foliage: [0.47, 0.66, 0.23],
            water: [0.247, 0.463, 0.894],
        }
    }
}

impl TintColors {
    /// Create tint colors for a specific biome.
    pub fn for_biome(biome: &str) -> Self {
        let mut colors = Self::default();
        let biome = biome.strip_prefix("minecraft:").unwrap_or(biome);

        match biome {
            "swamp" | "mangrove_swamp" => {
                colors.grass = [0.41, 0.55, 0.27];
                colors.foliage = [0.41, 0.55, 0.27];
                colors.water = [0.38, 0.48, 0.27];
            }
            "badlands" | "wooded_badlands" | "eroded_badlands" => {
                colors.grass = [0.56, 0.50, 0.30];
                colors.foliage = [0.62, 0.56, 0.35];
            }
            "jungle" | "bamboo_jungle" | "sparse_jungle" => {
                colors.grass = [0.35, 0.75, 0.15];
                colors.foliage = [0.30, 0.72, 0.20];
            }
            "dark_forest" => {
                colors.grass = [0.31, 0.55, 0.20];
                colors.foliage = [0.31, 0.55, 0.20];
            }
            "snowy_plains" | "snowy_taiga" | "snowy_beach" | "snowy_slopes" => {
                colors.grass = [0.50, 0.70, 0.50];
                colors.foliage = [0.39, 0.61, 0.39];
            }
            "desert" => {
                colors.grass = [0.75, 0.72, 0.45];
                colors.foliage = [0.68, 0.68, 0.40];
            }
            "ocean" | "deep_ocean" | "cold_ocean" | "deep_cold_ocean" => {
                colors.water = [0.24, 0.36, 0.75];
            }
            "warm_ocean" | "lukewarm_ocean" | "deep_lukewarm_ocean" => {
                colors.water = [0.26, 0.53, 0.80];
            }
            "frozen_ocean" | "deep_frozen_ocean" => {
                colors.water = [0.24, 0.30, 0.60];
            }
            _ => {}
        }

        colors
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TintCategory {
    Grass,
    Foliage,
    Water,
    None,
}

/// Provides tint colors for blocks based on their type.
#[derive(Debug, Clone, Default)]
pub struct TintProvider {
    colors: TintColors,
}

impl TintProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_biome(biome: &str) -> Self {
        Self {
            colors: TintColors::for_biome(biome),
        }
    }

    /// Provider for an optional biome name; plains colors when absent.
    pub fn from_biome(biome: Option<&str>) -> Self {
        biome.map(Self::for_biome).unwrap_or_default()
    }

    /// Tint applied to one face of a block, or white.
    ///
    /// Grass blocks are only tinted on top; their sides show dirt.
    pub fn tint(&self, block_id: &str, face: Direction) -> [f32; 3] {
        match categorize_block(block_id) {
            TintCategory::Grass if block_id == "grass_block" && face != Direction::Up => {
                [1.0, 1.0, 1.0]
            }
            TintCategory::Grass => self.colors.grass,
            TintCategory::Foliage => self.colors.foliage,
            TintCategory::Water => self.colors.water,
            TintCategory::None => [1.0, 1.0, 1.0],
        }
    }

    /// Linear RGBA color of a level-of-detail face.
    ///
    /// `average` is the block's averaged sRGB texture color, if known.
    pub fn lod_color(&self, block_id: &str, face: Direction, average: Option<[f32; 3]>) -> [f32; 4] {
        let base = average.unwrap_or(FALLBACK_COLOR);
        let tint = self.tint(block_id, face);
        [
            srgb_to_linear(base[0] * tint[0]),
            srgb_to_linear(base[1] * tint[1]),
            srgb_to_linear(base[2] * tint[2]),
            1.0,
        ]
    }
}

fn categorize_block(block_id: &str) -> TintCategory {
    if matches!(
        block_id,
        "grass_block" | "grass" | "short_grass" | "tall_grass" | "fern" | "large_fern" | "potted_fern"
    ) {
        return TintCategory::Grass;
    }
    if (block_id.ends_with("_leaves") && !block_id.starts_with("azalea")) || block_id == "vine" {
        return TintCategory::Foliage;
    }
    if matches!(block_id, "water" | "bubble_column") {
        return TintCategory::Water;
    }
    TintCategory::None
}

/// Convert one sRGB channel to linear light.
pub fn srgb_to_linear(channel: f32) -> f32 {
    let c = channel.clamp(0.0, 1.0);
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}
