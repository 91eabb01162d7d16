//! Differencing chains: locating, validating and stacking parent layers.
//!
//! # Resolution
//! Starting from a leaf image, each layer that carries a
//! [`ParentLocatorRecord`] is linked to its parent:
//!
//! ```text
//! Unresolved ──exists, identity ok──▶ Located ──no cycle──▶ Linked
//!      │                                  │
//!      └── no candidate / mismatch ───────┴── cycle ──▶ Failed
//! ```
//!
//! Candidates are tried in order (relative to the child's directory, then
//! the absolute path recorded at creation).  The first one that exists is
//! taken; if its identity differs from the child's `parent_linkage` token the
//! whole resolution fails rather than linking an unrelated file.  A parent
//! already present earlier in the chain (same canonical path or same
//! identity) is a cycle.
//!
//! Construction is all-or-nothing: on any failure every layer opened so far
//! is closed before the error is returned.
//!
//! # Composition
//! Once every link is resolved, layers are stacked base-first.  The base
//! layer sits on a [`ZeroBuffer`] terminator; each layer owns the one below
//! it, so closing the returned top layer closes the whole chain exactly once.

pub mod layer;
pub mod locator;
pub mod sidecar;

pub use layer::DiffLayer;
pub use locator::ParentLocatorRecord;
pub use sidecar::{LayerDescriptor, SidecarOpener};

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use uuid::Uuid;

use crate::buffer::Buffer;
use crate::error::{Result, StreamError};
use crate::overlay::ZeroBuffer;
use crate::ownership::InnerBuffer;

// ── Opener seam ──────────────────────────────────────────────────────────────

/// A layer as produced by a format reader.
#[derive(Debug)]
pub struct OpenedLayer {
    pub path:     PathBuf,
    /// Identity token this layer carries; children refer to it.
    pub identity: Uuid,
    /// Where to find this layer's parent, if it is a differencing layer.
    pub locator:  Option<ParentLocatorRecord>,
    pub content:  InnerBuffer,
}

/// Opens images for chain resolution.  Format readers implement this.
pub trait LayerOpener {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn open(&mut self, path: &Path) -> Result<OpenedLayer>;
}

// ── Link state ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    Unresolved,
    Located(PathBuf),
    Linked(PathBuf),
    Failed(String),
}

// ── Resolver ─────────────────────────────────────────────────────────────────

pub struct ChainResolver<O: LayerOpener> {
    opener: O,
    state:  LinkState,
    paths:  Vec<PathBuf>,
}

impl<O: LayerOpener> ChainResolver<O> {
    pub fn new(opener: O) -> Self {
        Self { opener, state: LinkState::Unresolved, paths: Vec::new() }
    }

    /// State of the most recent link attempt.
    pub fn state(&self) -> &LinkState {
        &self.state
    }

    /// Paths of the last successfully resolved chain, leaf first.
    pub fn chain_paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn into_opener(self) -> O {
        self.opener
    }

    /// Resolve the chain rooted at `leaf` and stack it into one layer.
    pub fn open(&mut self, leaf: impl AsRef<Path>) -> Result<DiffLayer> {
        self.paths.clear();
        self.state = LinkState::Unresolved;

        let mut opened: Vec<OpenedLayer> = Vec::new();
        match self.resolve(leaf.as_ref(), &mut opened) {
            Ok(()) => {
                self.paths = opened.iter().map(|l| l.path.clone()).collect();
                Ok(compose(opened))
            }
            Err(e) => {
                self.state = LinkState::Failed(e.to_string());
                close_all(opened);
                Err(e)
            }
        }
    }

    fn resolve(&mut self, leaf: &Path, opened: &mut Vec<OpenedLayer>) -> Result<()> {
        let mut seen_paths: HashSet<PathBuf> = HashSet::new();
        let mut seen_ids:   HashSet<Uuid>    = HashSet::new();

        let first = self.opener.open(leaf)?;
        seen_paths.insert(canonical(&first.path));
        seen_ids.insert(first.identity);
        opened.push(first);

        loop {
            let Some(child) = opened.last() else { break };
            let Some(locator) = child.locator.clone() else { break };
            let child_path = child.path.clone();

            self.state = LinkState::Unresolved;
            let parent = self.link(&child_path, &locator, &seen_paths, &seen_ids)?;
            seen_paths.insert(canonical(&parent.path));
            seen_ids.insert(parent.identity);
            opened.push(parent);
        }
        Ok(())
    }

    /// Walk one link from `child` to its parent.
    fn link(
        &mut self,
        child:      &Path,
        locator:    &ParentLocatorRecord,
        seen_paths: &HashSet<PathBuf>,
        seen_ids:   &HashSet<Uuid>,
    ) -> Result<OpenedLayer> {
        let expected = locator.parent_identity().ok_or_else(|| {
            StreamError::chain(child, "locator carries no valid parent linkage identity")
        })?;

        let candidates = locator.candidates(child);
        let located = candidates
            .iter()
            .find(|p| self.opener.exists(p))
            .cloned()
            .ok_or_else(|| {
                let tried: Vec<String> = candidates.iter().map(|p| p.display().to_string()).collect();
                StreamError::chain(child, format!("no parent found (tried: {})", tried.join(", ")))
            })?;
        if seen_paths.contains(&canonical(&located)) {
            return Err(StreamError::CycleDetected { path: located });
        }

        let parent = self.opener.open(&located)?;
        if parent.identity != expected {
            let err = StreamError::chain(child, format!(
                "{} has identity {}, expected {expected}",
                located.display(),
                parent.identity,
            ));
            close_rejected(parent);
            return Err(err);
        }
        self.state = LinkState::Located(located.clone());

        if seen_ids.contains(&parent.identity) {
            close_rejected(parent);
            return Err(StreamError::CycleDetected { path: located });
        }

        debug!("linked {} -> {}", child.display(), located.display());
        self.state = LinkState::Linked(located);
        Ok(parent)
    }
}

/// Stack opened layers (leaf first) into one top layer, base on a zero fill.
fn compose(opened: Vec<OpenedLayer>) -> DiffLayer {
    let mut top: Option<DiffLayer> = None;

    for layer in opened.into_iter().rev() {
        let parent = match top.take() {
            Some(prev) => InnerBuffer::owned(prev),
            None       => InnerBuffer::owned(ZeroBuffer::new(layer.content.capacity())),
        };
        top = Some(DiffLayer::new(layer.content, Some(parent)).with_origin(layer.identity, layer.path));
    }

    // `resolve` always opens the leaf before succeeding.
    top.unwrap_or_else(|| DiffLayer::new(InnerBuffer::owned(ZeroBuffer::new(0)), None))
}

fn close_all(opened: Vec<OpenedLayer>) {
    for layer in opened.into_iter().rev() {
        close_rejected(layer);
    }
}

fn close_rejected(mut layer: OpenedLayer) {
    if let Err(e) = layer.content.release() {
        warn!("closing {} after failed resolution: {e}", layer.path.display());
    }
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
