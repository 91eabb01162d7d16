//! Layer opener that keeps each layer's metadata in a JSON sidecar.
//!
//! An image `disk.img` is a raw data file; `disk.img.layer.json` holds its
//! [`LayerDescriptor`]: identity token, declared length, optional allocation
//! map and optional parent locator.  Layers are opened read-only; writes
//! belong in a snapshot or format-specific layer stacked on top.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::buffer::MediumBuffer;
use crate::chain::{LayerOpener, OpenedLayer};
use crate::chain::locator::ParentLocatorRecord;
use crate::error::Result;
use crate::extent::Extent;
use crate::ownership::InnerBuffer;

pub const SIDECAR_SUFFIX: &str = ".layer.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerDescriptor {
    pub identity:  Uuid,
    pub capacity:  u64,
    /// Byte ranges of the data file that hold content.  `None` means the
    /// whole capacity is backed.
    #[serde(default)]
    pub allocated: Option<Vec<Extent>>,
    #[serde(default)]
    pub parent:    Option<ParentLocatorRecord>,
}

impl LayerDescriptor {
    /// A fully backed layer with no parent.
    pub fn base(capacity: u64) -> Self {
        Self {
            identity:  Uuid::new_v4(),
            capacity,
            allocated: None,
            parent:    None,
        }
    }

    /// A differencing layer over `parent` (stored at `parent_path`) that will
    /// live at `child_path` and holds `allocated` ranges itself.
    pub fn child_of(
        parent:      &LayerDescriptor,
        parent_path: &Path,
        child_path:  &Path,
        allocated:   Vec<Extent>,
    ) -> Self {
        Self {
            identity:  Uuid::new_v4(),
            capacity:  parent.capacity,
            allocated: Some(allocated),
            parent:    Some(ParentLocatorRecord::for_parent(parent_path, child_path, parent.identity)),
        }
    }

    pub fn sidecar_path(image: &Path) -> PathBuf {
        let mut name = OsString::from(image.as_os_str());
        name.push(SIDECAR_SUFFIX);
        PathBuf::from(name)
    }

    pub fn load(image: &Path) -> Result<Self> {
        let bytes = fs::read(Self::sidecar_path(image))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn save(&self, image: &Path) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        fs::write(Self::sidecar_path(image), bytes)?;
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SidecarOpener;

impl SidecarOpener {
    pub fn new() -> Self {
        Self
    }
}

impl LayerOpener for SidecarOpener {
    fn open(&mut self, path: &Path) -> Result<OpenedLayer> {
        let desc = LayerDescriptor::load(path)?;
        let file: File = OpenOptions::new().read(true).open(path)?;
        let mut medium = MediumBuffer::with_length(file, desc.capacity)?.read_only();
        if let Some(allocated) = &desc.allocated {
            medium = medium.with_allocation(allocated);
        }
        Ok(OpenedLayer {
            path:     path.to_path_buf(),
            identity: desc.identity,
            locator:  desc.parent,
            content:  InnerBuffer::owned(medium),
        })
    }
}
