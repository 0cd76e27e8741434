use std::{collections::BTreeSet, num::NonZeroU32};

use crate::errors::{CoreError, CoreResult};

/// Width tiers generated when the caller does not supply any.
pub const DEFAULT_DENSITY_TIERS: [u32; 4] = [400, 800, 1200, 1600];

/// Ordered, de-duplicated set of positive density tiers.
///
/// Iteration is always ascending, so every srcset derived from it is too.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DensityTiers(BTreeSet<NonZeroU32>);

impl DensityTiers {
    /// Build a tier set, rejecting zero.
    pub fn new<I>(tiers: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = u32>,
    {
        let mut set = BTreeSet::new();
        for tier in tiers {
            let tier = NonZeroU32::new(tier).ok_or(CoreError::InvalidDensityTier(tier))?;
            set.insert(tier);
        }
        Ok(Self(set))
    }

    /// No tiers at all: the resource is not responsive.
    #[must_use]
    pub fn none() -> Self {
        Self(BTreeSet::new())
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().map(|t| t.get())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for DensityTiers {
    fn default() -> Self {
        Self(
            DEFAULT_DENSITY_TIERS
                .iter()
                .filter_map(|t| NonZeroU32::new(*t))
                .collect(),
        )
    }
}

/// Caller-supplied description of a base resource and its size variants.
///
/// Immutable once built. Swapping the descriptor of a mounted image means
/// starting a fresh load session for the new value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourceDescriptor {
    base_uri: String,
    declared_width: Option<u32>,
    declared_height: Option<u32>,
    density_tiers: DensityTiers,
    preview_uri: Option<String>,
}

impl ResourceDescriptor {
    /// Descriptor with the default density tiers and no declared size.
    pub fn new<S: Into<String>>(base_uri: S) -> Self {
        Self {
            base_uri: base_uri.into(),
            declared_width: None,
            declared_height: None,
            density_tiers: DensityTiers::default(),
            preview_uri: None,
        }
    }

    #[must_use]
    pub fn with_declared_size(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.declared_width = width;
        self.declared_height = height;
        self
    }

    #[must_use]
    pub fn with_density_tiers(mut self, tiers: DensityTiers) -> Self {
        self.density_tiers = tiers;
        self
    }

    /// Low-quality source shown while the full-quality one loads.
    #[must_use]
    pub fn with_preview<S: Into<String>>(mut self, uri: S) -> Self {
        self.preview_uri = Some(uri.into());
        self
    }

    /// Reject descriptors that can never load.
    pub fn validate(&self) -> CoreResult<()> {
        if self.base_uri.trim().is_empty() {
            return Err(CoreError::EmptyBaseUri);
        }
        if self.preview_uri.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err(CoreError::EmptyPreviewUri);
        }
        Ok(())
    }

    #[must_use]
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    #[must_use]
    pub fn preview_uri(&self) -> Option<&str> {
        self.preview_uri.as_deref()
    }

    #[must_use]
    pub fn declared_width(&self) -> Option<u32> {
        self.declared_width
    }

    #[must_use]
    pub fn declared_height(&self) -> Option<u32> {
        self.declared_height
    }

    #[must_use]
    pub fn density_tiers(&self) -> &DensityTiers {
        &self.density_tiers
    }

    /// Width / height when both are declared and non-zero.
    #[must_use]
    pub fn aspect_ratio(&self) -> Option<f64> {
        match (self.declared_width, self.declared_height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some(f64::from(w) / f64::from(h)),
            _ => None,
        }
    }
}
