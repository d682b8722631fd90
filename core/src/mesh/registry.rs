//! Memoized vertex layouts.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::layout::{LayoutError, Vertex, VertexLayout};

/// Cache of derived [`VertexLayout`]s keyed by vertex type.
///
/// A registry is an ordinary value: create one alongside whatever owns the
/// mesh builders and drop it with that owner. Layouts are shared via `Arc`,
/// so every builder for the same vertex type sees the same layout instance.
#[derive(Debug, Default)]
pub struct LayoutRegistry {
    layouts: RwLock<HashMap<TypeId, Arc<VertexLayout>>>,
}

impl LayoutRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the layout of `V`, deriving it on first use.
    ///
    /// Derivation failures are returned and not cached.
    pub fn layout_of<V: Vertex>(&self) -> Result<Arc<VertexLayout>, LayoutError> {
        let key = TypeId::of::<V>();
        if let Some(layout) = self.layouts.read().get(&key) {
            return Ok(Arc::clone(layout));
        }

        let layout = Arc::new(VertexLayout::generate::<V>()?);
        let mut layouts = self.layouts.write();
        // Another caller may have raced us between the two locks; keep the first.
        Ok(Arc::clone(layouts.entry(key).or_insert(layout)))
    }

    /// Number of cached layouts.
    pub fn len(&self) -> usize {
        self.layouts.read().len()
    }

    /// Whether no layout has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.layouts.read().is_empty()
    }

    /// Drop every cached layout. Builders keep their own `Arc`s.
    pub fn clear(&self) {
        self.layouts.write().clear();
    }
}

static_assertions::assert_impl_all!(LayoutRegistry: Send, Sync);
