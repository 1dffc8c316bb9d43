//! Transform tree buffer

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;
use nalgebra::Isometry3;
use std::{
    collections::HashMap,
    sync::{Arc, Condvar, Mutex, MutexGuard},
    time::{Duration, Instant},
};

use super::{to_isometry, TfError, TransformProvider};
use comms_if::eqpt::tf::TransformStamped;
use util::shutdown::Shutdown;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Thread safe store of the latest transform between each frame and its parent.
///
/// Cloning the buffer gives another handle onto the same tree. Lookups waiting on a buffer built
/// with [`TfBuffer::with_shutdown`] return early once the shutdown is triggered.
#[derive(Clone, Default)]
pub struct TfBuffer {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    tree: Mutex<Tree>,

    /// Notified every time the tree is updated, and when the shutdown is triggered.
    updated: Condvar,

    shutdown: Shutdown,
}

/// Edges of the tree, indexed by child frame.
#[derive(Default)]
struct Tree {
    edges: HashMap<String, Edge>,
}

struct Edge {
    parent: String,

    /// Pose of the child in the parent frame.
    transform: Isometry3<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TfBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer whose waiting lookups are interrupted when `shutdown` is triggered.
    pub fn with_shutdown(shutdown: &Shutdown) -> Self {
        let inner = Arc::new(Inner {
            tree: Mutex::default(),
            updated: Condvar::new(),
            shutdown: shutdown.clone(),
        });

        // Weak so the shutdown doesn't keep the buffer alive
        let weak = Arc::downgrade(&inner);
        shutdown.on_trigger(move || {
            if let Some(inner) = weak.upgrade() {
                // Taking the lock first means no waiter is between its check and its wait
                let _tree = inner.lock();
                inner.updated.notify_all();
            }
        });

        Self { inner }
    }

    /// Insert or replace the transform between a frame and its parent.
    ///
    /// Waiting lookups are woken up so they can retry.
    pub fn set_transform(&self, tf: &TransformStamped) -> Result<(), TfError> {
        let transform = to_isometry(tf)?;

        {
            let mut tree = self.inner.lock();

            if tree.is_ancestor(&tf.child_frame, &tf.parent_frame) {
                return Err(TfError::Loop {
                    parent: tf.parent_frame.clone(),
                    child: tf.child_frame.clone(),
                });
            }

            trace!(
                "Transform {} -> {} updated",
                tf.parent_frame,
                tf.child_frame
            );

            tree.edges.insert(
                tf.child_frame.clone(),
                Edge {
                    parent: tf.parent_frame.clone(),
                    transform,
                },
            );
        }

        self.inner.updated.notify_all();

        Ok(())
    }

    /// Get the transform between two frames without waiting.
    #[cfg(test)]
    fn try_lookup(&self, parent_frame: &str, child_frame: &str) -> Option<Isometry3<f64>> {
        self.inner.lock().resolve(parent_frame, child_frame)
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Tree> {
        // The tree is always left consistent, edges are inserted whole
        match self.tree.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl TransformProvider for TfBuffer {
    fn lookup(
        &self,
        parent_frame: &str,
        child_frame: &str,
        timeout: Duration,
    ) -> Result<Isometry3<f64>, TfError> {
        // No deadline if the timeout is too long to be represented
        let deadline = Instant::now().checked_add(timeout);
        let mut tree = self.inner.lock();

        loop {
            if let Some(t) = tree.resolve(parent_frame, child_frame) {
                return Ok(t);
            }

            if self.inner.shutdown.is_triggered() {
                return Err(TfError::Interrupted {
                    parent: parent_frame.to_string(),
                    child: child_frame.to_string(),
                });
            }

            tree = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(TfError::Timeout {
                            parent: parent_frame.to_string(),
                            child: child_frame.to_string(),
                            timeout_s: timeout.as_secs_f64(),
                        });
                    }

                    match self.inner.updated.wait_timeout(tree, deadline - now) {
                        Ok((g, _)) => g,
                        Err(poisoned) => poisoned.into_inner().0,
                    }
                }
                None => match self.inner.updated.wait(tree) {
                    Ok(g) => g,
                    Err(poisoned) => poisoned.into_inner(),
                },
            };
        }
    }
}

impl Tree {
    /// Get the pose of `frame` in the root of its tree, along with the root's name.
    fn chain_to_root<'a>(&'a self, frame: &'a str) -> (&'a str, Isometry3<f64>) {
        let mut current = frame;
        let mut transform = Isometry3::identity();

        while let Some(edge) = self.edges.get(current) {
            transform = edge.transform * transform;
            current = edge.parent.as_str();
        }

        (current, transform)
    }

    fn resolve(&self, parent_frame: &str, child_frame: &str) -> Option<Isometry3<f64>> {
        if parent_frame == child_frame {
            return Some(Isometry3::identity());
        }

        // Both frames must be known, a root frame is known through its children
        if !self.is_known(parent_frame) || !self.is_known(child_frame) {
            return None;
        }

        let (parent_root, root_to_parent) = self.chain_to_root(parent_frame);
        let (child_root, root_to_child) = self.chain_to_root(child_frame);

        if parent_root != child_root {
            return None;
        }

        Some(root_to_parent.inverse() * root_to_child)
    }

    fn is_known(&self, frame: &str) -> bool {
        self.edges.contains_key(frame) || self.edges.values().any(|e| e.parent == frame)
    }

    /// True if `ancestor` is `frame` or one of its ancestors.
    fn is_ancestor(&self, ancestor: &str, frame: &str) -> bool {
        let mut current = frame;

        loop {
            if current == ancestor {
                return true;
            }

            match self.edges.get(current) {
                Some(edge) => current = edge.parent.as_str(),
                None => return false,
            }
        }
    }
}
