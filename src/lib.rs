pub mod error;
pub mod extent;
pub mod config;
pub mod buffer;
pub mod ownership;
pub mod stream;
pub mod overlay;
pub mod chain;
pub mod provider;

pub use error::{Result, StreamError};
pub use extent::Extent;
pub use config::{CapacityMode, StreamConfig};
pub use buffer::{Buffer, MediumBuffer, SparseMemoryBuffer};
pub use ownership::{share, InnerBuffer, Ownership, SharedBuffer};
pub use stream::{layered_read, BufferStream};
pub use overlay::{ConcatBuffer, SnapshotBuffer, SubBuffer, ZeroBuffer};
pub use chain::{ChainResolver, DiffLayer, LayerOpener, LinkState, ParentLocatorRecord, SidecarOpener};
pub use provider::{open_provider, ProviderKind, ProviderSpec};
