//! Overlay providers composed from other buffers.
//!
//! | Provider | Role |
//! |----------|------|
//! | [`ZeroBuffer`] | Terminal all-zero provider; ends differencing chains |
//! | [`ConcatBuffer`] | Several providers laid end to end |
//! | [`SubBuffer`] | A fixed window of a larger provider |
//! | [`SnapshotBuffer`] | Copy-on-write view that never mutates its base |

pub mod concat;
pub mod snapshot;
pub mod subrange;
pub mod zero;

pub use concat::ConcatBuffer;
pub use snapshot::SnapshotBuffer;
pub use subrange::SubBuffer;
pub use zero::ZeroBuffer;
