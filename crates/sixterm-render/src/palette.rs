#![forbid(unsafe_code)]

//! Named color registry with stable indices.
//!
//! Index 0 is conventionally the background and is registered first. Indices
//! are handed out densely in registration order and never change for the
//! lifetime of the palette, so a [`PixelCanvas`](crate::canvas::PixelCanvas)
//! drawn against one palette stays valid as more colors are added.

use std::fmt;

use ahash::AHashMap;

use crate::wire::{self, push_decimal};

/// Largest number of colors a sixel palette can address here.
pub const MAX_PALETTE_SIZE: usize = 256;

/// A 24-bit color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channels on the sixel 0..=100 scale.
    #[must_use]
    pub const fn to_percent(self) -> (u8, u8, u8) {
        scale_to_percent(self.r, self.g, self.b)
    }

    /// Squared Euclidean distance in RGB space.
    #[must_use]
    pub const fn distance_sq(self, other: Self) -> u32 {
        let dr = self.r.abs_diff(other.r) as u32;
        let dg = self.g.abs_diff(other.g) as u32;
        let db = self.b.abs_diff(other.b) as u32;
        dr * dr + dg * dg + db * db
    }
}

impl From<(u8, u8, u8)> for Rgb {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self::new(r, g, b)
    }
}

/// Map 0..=255 channels to 0..=100 with truncating division.
///
/// Truncation (not rounding) is what keeps output byte-identical:
/// `128 -> 50`, `255 -> 100`.
#[must_use]
pub const fn scale_to_percent(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    (percent(r), percent(g), percent(b))
}

const fn percent(c: u8) -> u8 {
    (c as u16 * 100 / 255) as u8
}

/// Errors from palette registration and lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaletteError {
    /// Registering one more color would exceed the addressable range.
    #[error("palette is full ({capacity} colors)")]
    Overflow { capacity: usize },
    /// No color with this name is registered.
    #[error("unknown color name: {0:?}")]
    UnknownColor(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    name: String,
    rgb: Rgb,
}

/// Ordered mapping `name -> (index, rgb)`.
#[derive(Debug, Clone)]
pub struct ColorPalette {
    entries: Vec<Entry>,
    by_name: AHashMap<String, u8>,
    capacity: usize,
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for ColorPalette {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries && self.capacity == other.capacity
    }
}

impl Eq for ColorPalette {}

impl ColorPalette {
    /// An empty palette addressing up to [`MAX_PALETTE_SIZE`] colors.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity_limit(MAX_PALETTE_SIZE)
    }

    /// An empty palette that refuses more than `limit` colors.
    ///
    /// `limit` is clamped to [`MAX_PALETTE_SIZE`].
    #[must_use]
    pub fn with_capacity_limit(limit: usize) -> Self {
        let capacity = limit.min(MAX_PALETTE_SIZE);
        Self {
            entries: Vec::with_capacity(capacity.min(64)),
            by_name: AHashMap::with_capacity(capacity.min(64)),
            capacity,
        }
    }

    /// Build a palette by registering `entries` in order.
    pub fn from_entries<I, N>(entries: I) -> Result<Self, PaletteError>
    where
        I: IntoIterator<Item = (N, Rgb)>,
        N: Into<String>,
    {
        let mut palette = Self::new();
        for (name, rgb) in entries {
            palette.register(name, rgb.r, rgb.g, rgb.b)?;
        }
        Ok(palette)
    }

    /// Register `name`, returning its index.
    ///
    /// Re-registering a known name returns the existing index and leaves the
    /// stored color unchanged.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        r: u8,
        g: u8,
        b: u8,
    ) -> Result<u8, PaletteError> {
        let name = name.into();
        if let Some(&index) = self.by_name.get(&name) {
            return Ok(index);
        }
        if self.entries.len() >= self.capacity {
            return Err(PaletteError::Overflow {
                capacity: self.capacity,
            });
        }
        let index = u8::try_from(self.entries.len()).map_err(|_| PaletteError::Overflow {
            capacity: self.capacity,
        })?;
        self.by_name.insert(name.clone(), index);
        self.entries.push(Entry {
            name,
            rgb: Rgb::new(r, g, b),
        });
        Ok(index)
    }

    /// Index of the registered color closest to `(r, g, b)`.
    ///
    /// Ties go to the earliest-registered color. An empty palette yields 0.
    #[must_use]
    pub fn nearest(&self, r: u8, g: u8, b: u8) -> u8 {
        let target = Rgb::new(r, g, b);
        let mut best = 0u8;
        let mut best_dist = u32::MAX;
        for (index, entry) in self.entries.iter().enumerate() {
            let dist = entry.rgb.distance_sq(target);
            if dist < best_dist {
                best_dist = dist;
                best = index as u8;
                if dist == 0 {
                    break;
                }
            }
        }
        best
    }

    /// Index registered under `name`.
    pub fn index_of_name(&self, name: &str) -> Result<u8, PaletteError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| PaletteError::UnknownColor(name.to_owned()))
    }

    /// Color stored at `index`.
    #[must_use]
    pub fn rgb(&self, index: u8) -> Option<Rgb> {
        self.entries.get(usize::from(index)).map(|e| e.rgb)
    }

    /// Name registered at `index`.
    #[must_use]
    pub fn name(&self, index: u8) -> Option<&str> {
        self.entries.get(usize::from(index)).map(|e| e.name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether `index` refers to a registered color.
    #[must_use]
    pub fn contains_index(&self, index: u8) -> bool {
        usize::from(index) < self.entries.len()
    }

    /// `(index, name, rgb)` in index order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (u8, &str, Rgb)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i as u8, e.name.as_str(), e.rgb))
    }

    /// The palette preamble `#i;2;r;g;b...` for every color, in index order.
    #[must_use]
    pub fn emit_preamble(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.entries.len() * 16);
        self.write_preamble(&mut out);
        out
    }

    /// Append the palette preamble to `out`.
    pub fn write_preamble(&self, out: &mut Vec<u8>) {
        for (index, _, rgb) in self.iter() {
            let (r, g, b) = rgb.to_percent();
            out.push(wire::COLOR);
            push_decimal(out, u32::from(index));
            out.push(b';');
            push_decimal(out, u32::from(wire::RGB_SPACE));
            for channel in [r, g, b] {
                out.push(b';');
                push_decimal(out, u32::from(channel));
            }
        }
    }
}

impl fmt::Display for ColorPalette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ColorPalette({} colors)", self.entries.len())
    }
}
