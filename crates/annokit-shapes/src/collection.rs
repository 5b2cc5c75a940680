//! Ordered, id-unique shape collections.
//!
//! One [`ShapeCollection`] holds all shapes of a single kind for the open
//! file. Lookups and mutations that address a missing id are tolerant:
//! they return `None` and leave the collection untouched. Inserting an id
//! that is already present is rejected.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use annokit_core::ShapeError;

use crate::model::{BoxKind, BoxShape, PathKind, PathShape, Point, PointBatch, Shape};

/// Shapes of one kind in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShapeCollection<S> {
    shapes: Vec<S>,
}

impl<S> Default for ShapeCollection<S> {
    fn default() -> Self {
        Self { shapes: Vec::new() }
    }
}

impl<S: Shape> ShapeCollection<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole collection.
    ///
    /// Later entries that repeat an earlier id are dropped. Returns the
    /// number of dropped entries.
    pub fn set(&mut self, shapes: Vec<S>) -> usize {
        let incoming = shapes.len();
        let mut seen = HashSet::with_capacity(incoming);
        self.shapes = shapes
            .into_iter()
            .filter(|s| seen.insert(s.id().to_string()))
            .collect();

        let dropped = incoming - self.shapes.len();
        if dropped > 0 {
            tracing::warn!(kind = %S::KIND, dropped, "dropped shapes with repeated ids");
        }
        dropped
    }

    /// Replace the whole collection, failing on the first repeated id.
    ///
    /// The collection is left unchanged on failure.
    pub fn try_set(&mut self, shapes: Vec<S>) -> Result<(), ShapeError> {
        let mut seen = HashSet::with_capacity(shapes.len());
        if let Some(dup) = shapes.iter().find(|s| !seen.insert(s.id())) {
            return Err(ShapeError::DuplicateId {
                kind: S::KIND,
                id: dup.id().to_string(),
            });
        }
        self.shapes = shapes;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&S> {
        self.shapes.iter().find(|s| s.id() == id)
    }

    /// Like [`get`](Self::get), with an explicit not-found error.
    pub fn require(&self, id: &str) -> Result<&S, ShapeError> {
        self.get(id).ok_or_else(|| self.not_found(id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.shapes.iter().position(|s| s.id() == id)
    }

    /// Append a shape. Rejects an id that is already present.
    pub fn add(&mut self, shape: S) -> Result<&S, ShapeError> {
        self.insert_at(self.shapes.len(), shape)
    }

    /// Insert a shape at `index` (clamped to the end). Rejects a present id.
    pub fn insert_at(&mut self, index: usize, shape: S) -> Result<&S, ShapeError> {
        if self.contains(shape.id()) {
            return Err(ShapeError::DuplicateId {
                kind: S::KIND,
                id: shape.id().to_string(),
            });
        }
        let index = index.min(self.shapes.len());
        tracing::debug!(kind = %S::KIND, id = shape.id(), index, "shape added");
        self.shapes.insert(index, shape);
        Ok(&self.shapes[index])
    }

    /// Merge `patch` into the matching shape and return the merged shape.
    pub fn update(&mut self, id: &str, patch: &S::Patch) -> Option<&S> {
        let shape = self.get_mut(id)?;
        shape.apply_patch(patch);
        tracing::debug!(kind = %S::KIND, id, ?patch, "shape updated");
        Some(&*shape)
    }

    /// Like [`update`](Self::update), with an explicit not-found error.
    pub fn try_update(&mut self, id: &str, patch: &S::Patch) -> Result<&S, ShapeError> {
        let err = self.not_found(id);
        self.update(id, patch).ok_or(err)
    }

    /// Swap in a whole record with the same id, returning the previous one.
    pub fn replace(&mut self, shape: S) -> Option<S> {
        let slot = self.get_mut(shape.id())?;
        Some(std::mem::replace(slot, shape))
    }

    /// Remove the matching shape. Missing ids are a no-op.
    pub fn delete(&mut self, id: &str) -> Option<S> {
        let index = self.position(id)?;
        tracing::debug!(kind = %S::KIND, id, "shape deleted");
        Some(self.shapes.remove(index))
    }

    pub fn clear(&mut self) {
        self.shapes.clear();
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, S> {
        self.shapes.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.shapes.iter().map(|s| s.id())
    }

    pub fn as_slice(&self) -> &[S] {
        &self.shapes
    }

    pub fn into_vec(self) -> Vec<S> {
        self.shapes
    }

    /// Shapes visible on `frame`: those pinned to it and image-wide ones.
    pub fn in_frame(&self, frame: u32) -> impl Iterator<Item = &S> {
        self.shapes
            .iter()
            .filter(move |s| s.at_frame().is_none_or(|f| f == frame))
    }

    pub fn with_class<'a>(&'a self, class_id: &'a str) -> impl Iterator<Item = &'a S> + 'a {
        self.shapes
            .iter()
            .filter(move |s| s.attributes().class_id.as_deref() == Some(class_id))
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut S> {
        self.shapes.iter_mut().find(|s| s.id() == id)
    }

    fn not_found(&self, id: &str) -> ShapeError {
        ShapeError::NotFound {
            kind: S::KIND,
            id: id.to_string(),
        }
    }
}

impl<'a, S> IntoIterator for &'a ShapeCollection<S> {
    type Item = &'a S;
    type IntoIter = std::slice::Iter<'a, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.shapes.iter()
    }
}

impl<K: BoxKind> ShapeCollection<BoxShape<K>> {
    /// Keep the anchor of the matching shape and move its opposite corner to
    /// `(x2, y2)`. Extents may become negative.
    pub fn resize(&mut self, id: &str, x2: f64, y2: f64) -> Option<&BoxShape<K>> {
        let shape = self.get_mut(id)?;
        shape.resize_to(x2, y2);
        tracing::debug!(
            kind = %K::KIND,
            id,
            width = shape.width,
            height = shape.height,
            "shape resized"
        );
        Some(&*shape)
    }
}

impl<K: PathKind> ShapeCollection<PathShape<K>> {
    /// Append one or more points, in order, to the matching shape.
    pub fn add_points(
        &mut self,
        id: &str,
        points: impl Into<PointBatch>,
    ) -> Option<&PathShape<K>> {
        let shape = self.get_mut(id)?;
        shape.push_points(points);
        tracing::debug!(kind = %K::KIND, id, count = shape.points.len(), "points appended");
        Some(&*shape)
    }

    /// Remove a point from the matching shape.
    ///
    /// Returns `None` only when the shape is missing; an unknown point id
    /// returns the shape unchanged.
    pub fn delete_point(&mut self, id: &str, point_id: &str) -> Option<&PathShape<K>> {
        let shape = self.get_mut(id)?;
        if !shape.remove_point(point_id) {
            tracing::debug!(kind = %K::KIND, id, point_id, "point not present");
        }
        Some(&*shape)
    }

    /// Strict form of [`delete_point`](Self::delete_point): a missing shape
    /// or point is an error.
    pub fn try_delete_point(
        &mut self,
        id: &str,
        point_id: &str,
    ) -> Result<&PathShape<K>, ShapeError> {
        let shape = self.get_mut(id).ok_or_else(|| ShapeError::NotFound {
            kind: K::KIND,
            id: id.to_string(),
        })?;
        if !shape.remove_point(point_id) {
            return Err(ShapeError::PointNotFound {
                kind: K::KIND,
                id: id.to_string(),
                point_id: point_id.to_string(),
            });
        }
        Ok(&*shape)
    }

    /// Move one vertex of the matching shape. Unknown ids are a no-op.
    pub fn move_point(
        &mut self,
        id: &str,
        point_id: &str,
        x: f64,
        y: f64,
    ) -> Option<&PathShape<K>> {
        let shape = self.get_mut(id)?;
        shape.move_point(point_id, x, y);
        Some(&*shape)
    }

    pub fn replace_points(&mut self, id: &str, points: Vec<Point>) -> Option<&PathShape<K>> {
        let shape = self.get_mut(id)?;
        shape.points = points;
        Some(&*shape)
    }
}
