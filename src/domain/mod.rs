// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits that define the core
// concepts of the system: image samples, image/patch shapes
// and the errors raised when they don't fit together.
//
// Rules for this layer:
//   - NO burn types
//   - NO file I/O
//   - Only plain data, validation and traits

/// (height, width) pairs and the patch grid derived from them
pub mod shape;

/// One multi-channel image with its regression targets
pub mod sample;

/// Typed validation errors
pub mod error;

/// Core abstractions other layers implement
pub mod traits;
