// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer loads samples through SampleSource
// and never sees where they come from.
//
// Implementations:
//   - JsonlLoader      → JSON-lines files on disk
//   - SyntheticSource  → seeded random images with a known target

use anyhow::Result;

use crate::domain::sample::ImageSample;

// ─── SampleSource ─────────────────────────────────────────────────────────────
/// Any component that can produce image samples.
pub trait SampleSource {
    /// Load every available sample from this source.
    fn load_all(&self) -> Result<Vec<ImageSample>>;
}
