//! Renderer collaborator seam
//!
//! The scene layer does not draw anything. It tells the renderer when the
//! set of scene roots changed so the renderer can resize its per-object
//! buffers.

/// Receives scene-change notifications
pub trait RenderNotifier {
    /// The root list changed; `root_count` roots are now live
    fn update_object_memory(&mut self, root_count: usize);
}

/// Notifier that ignores everything (headless runs)
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl RenderNotifier for NullRenderer {
    fn update_object_memory(&mut self, _root_count: usize) {}
}

/// Notifier that records what it was told.
///
/// Used by the headless runner to report object-memory churn.
#[derive(Debug, Default, Clone)]
pub struct ObjectMemoryTracker {
    /// Number of notifications received
    pub updates: usize,
    /// Root count from the latest notification
    pub last_root_count: usize,
    /// Largest root count seen
    pub peak_root_count: usize,
}

impl RenderNotifier for ObjectMemoryTracker {
    fn update_object_memory(&mut self, root_count: usize) {
        self.updates += 1;
        self.last_root_count = root_count;
        self.peak_root_count = self.peak_root_count.max(root_count);
    }
}

impl<T: RenderNotifier + ?Sized> RenderNotifier for std::sync::Arc<std::sync::Mutex<T>> {
    fn update_object_memory(&mut self, root_count: usize) {
        if let Ok(mut inner) = self.lock() {
            inner.update_object_memory(root_count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_records_peak() {
        let mut tracker = ObjectMemoryTracker::default();
        tracker.update_object_memory(3);
        tracker.update_object_memory(1);
        assert_eq!(tracker.updates, 2);
        assert_eq!(tracker.last_root_count, 1);
        assert_eq!(tracker.peak_root_count, 3);
    }
}
