//! Refresh coordination.
//!
//! Decides when the live list may be reloaded or swapped. A removal animation
//! or a drag gesture holds both off: swapping mid-animation would invalidate
//! the positions being animated.

/// Refresh signals reported by the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefreshLatches {
    /// New data must be fetched.
    pub required: bool,
    /// New data has been fetched and can be swapped in.
    pub ready: bool,
}

/// What the controller should do now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefreshPlan {
    pub swap: bool,
    pub fetch: bool,
}

impl RefreshPlan {
    pub const NOTHING: Self = Self {
        swap: false,
        fetch: false,
    };

    pub fn is_empty(&self) -> bool {
        !self.swap && !self.fetch
    }
}

/// Tracks animation and drag state independently.
#[derive(Debug, Clone, Default)]
pub struct RefreshCoordinator {
    animating: bool,
    dragging: bool,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_animating(&self) -> bool {
        self.animating
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// True while refreshes are held off.
    pub fn is_suppressed(&self) -> bool {
        self.animating || self.dragging
    }

    pub fn start_animation(&mut self) {
        self.animating = true;
    }

    pub fn start_drag(&mut self) {
        self.dragging = true;
    }

    pub fn end_animation(&mut self, latches: RefreshLatches) -> RefreshPlan {
        self.animating = false;
        self.resume(latches)
    }

    pub fn end_drag(&mut self, latches: RefreshLatches) -> RefreshPlan {
        self.dragging = false;
        self.resume(latches)
    }

    /// The store changed. Dropped while suppressed; the cursor latch remembers it.
    pub fn on_refresh_required(&self, latches: RefreshLatches) -> RefreshPlan {
        if self.is_suppressed() {
            tracing::debug!(
                animating = self.animating,
                dragging = self.dragging,
                "refresh suppressed"
            );
            return RefreshPlan::NOTHING;
        }
        RefreshPlan {
            swap: false,
            fetch: latches.required,
        }
    }

    /// Fetched data arrived. Swapped only when nothing is moving.
    pub fn on_refresh_ready(&self) -> RefreshPlan {
        RefreshPlan {
            swap: !self.is_suppressed(),
            fetch: false,
        }
    }

    fn resume(&self, latches: RefreshLatches) -> RefreshPlan {
        if self.is_suppressed() {
            return RefreshPlan::NOTHING;
        }
        RefreshPlan {
            swap: latches.ready,
            fetch: latches.required,
        }
    }
}
