//! Owned image handles with deterministic release.
//!
//! Every [`ImageHandle`] holds a lease on the [`HandlePool`] it came
//! from. Dropping the handle returns the lease, so the pool's
//! [`live`](HandlePool::live) count is exactly the number of images
//! still held anywhere. A run that finishes, aborts or fails leaves the
//! count where it started, plus whatever the caller kept.
//!
//! Handles are single-threaded (`!Send`), matching the event-driven
//! model the pipeline runs under.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use image::DynamicImage;

use crate::types::Dimensions;

#[derive(Debug, Default)]
struct Counters {
    live: Cell<usize>,
    created: Cell<u64>,
}

/// Issues image handles and tracks how many are alive.
#[derive(Debug, Clone, Default)]
pub struct HandlePool {
    counters: Rc<Counters>,
}

impl HandlePool {
    /// A pool with no live handles.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `image` and return a handle to it.
    #[must_use]
    pub fn wrap(&self, image: DynamicImage) -> ImageHandle {
        ImageHandle {
            image,
            lease: Lease::acquire(&self.counters),
        }
    }

    /// Number of handles from this pool not yet released.
    #[must_use]
    pub fn live(&self) -> usize {
        self.counters.live.get()
    }

    /// Number of handles ever issued by this pool.
    #[must_use]
    pub fn created(&self) -> u64 {
        self.counters.created.get()
    }
}

struct Lease {
    counters: Rc<Counters>,
}

impl Lease {
    fn acquire(counters: &Rc<Counters>) -> Self {
        counters.live.set(counters.live.get() + 1);
        counters.created.set(counters.created.get() + 1);
        Self {
            counters: Rc::clone(counters),
        }
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        let live = self.counters.live.get().saturating_sub(1);
        self.counters.live.set(live);
        log::trace!("released image handle ({live} live)");
    }
}

/// An owned image plus its pool lease.
pub struct ImageHandle {
    image: DynamicImage,
    lease: Lease,
}

impl ImageHandle {
    /// Borrow the pixels.
    #[must_use]
    pub const fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// Width and height of the image.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.image.width(),
            height: self.image.height(),
        }
    }

    /// A new handle to a copy of the pixels, leased from the same pool.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        self.derive(self.image.clone())
    }

    /// A new handle to `image`, leased from the same pool as `self`.
    #[must_use]
    pub fn derive(&self, image: DynamicImage) -> Self {
        Self {
            image,
            lease: Lease::acquire(&self.lease.counters),
        }
    }

    /// Release the handle and keep the pixels.
    #[must_use]
    pub fn into_image(self) -> DynamicImage {
        self.image
    }
}

impl fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageHandle")
            .field("color", &self.image.color())
            .field("dimensions", &self.dimensions())
            .finish_non_exhaustive()
    }
}
