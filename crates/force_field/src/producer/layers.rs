//! Layer filtering for force producers
//!
//! A producer carries a mask of the layers it acts on. Queries may name a
//! single layer id (0..=31); producers whose mask lacks that bit are skipped
//! before any geometry is evaluated.

use bitflags::bitflags;

/// Highest valid layer id
pub const MAX_LAYER: u8 = 31;

bitflags! {
    /// Set of layers a producer acts on
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LayerMask: u32 {
        /// Layer 0, the layer receivers use unless told otherwise
        const DEFAULT = 1 << 0;

        // Every bit is a valid layer
        const _ = !0;
    }
}

impl LayerMask {
    /// Every layer
    pub const ALL: Self = Self::from_bits_retain(u32::MAX);

    /// No layer
    pub const NONE: Self = Self::empty();

    /// Mask holding a single layer; empty when `layer` is above [`MAX_LAYER`]
    pub const fn from_layer(layer: u8) -> Self {
        if layer > MAX_LAYER {
            Self::empty()
        } else {
            Self::from_bits_retain(1 << layer)
        }
    }

    /// Mask holding every listed layer
    pub fn from_layers<I: IntoIterator<Item = u8>>(layers: I) -> Self {
        layers
            .into_iter()
            .fold(Self::empty(), |mask, layer| mask | Self::from_layer(layer))
    }

    /// Whether the mask includes `layer`
    pub const fn contains_layer(self, layer: u8) -> bool {
        layer <= MAX_LAYER && self.bits() & (1 << layer) != 0
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::ALL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_layer() {
        let mask = LayerMask::from_layer(4);
        assert!(mask.contains_layer(4));
        assert!(!mask.contains_layer(3));
        assert_eq!(LayerMask::from_layer(0), LayerMask::DEFAULT);
    }

    #[test]
    fn test_out_of_range_layers() {
        assert!(LayerMask::from_layer(32).is_empty());
        assert!(!LayerMask::ALL.contains_layer(32));
        assert!(LayerMask::ALL.contains_layer(31));
    }

    #[test]
    fn test_from_layers() {
        let mask = LayerMask::from_layers([1, 5, 40]);
        assert_eq!(mask.bits(), (1 << 1) | (1 << 5));
        assert!(!LayerMask::NONE.contains_layer(0));
        assert_eq!(LayerMask::default(), LayerMask::ALL);
    }
}
