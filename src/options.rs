use crate::{Error, Result};

/// Per-call observation options.
///
/// Use the builder pattern to customize, or use [`Default`] for the
/// recognized defaults.
///
/// # Examples
///
/// ```rust
/// use kanshi::ObserveOptions;
///
/// let options = ObserveOptions::default()
///     .with_poll_interval_ms(50)   // Faster deletion detection
///     .with_depth(2);              // Also observe members of child objects
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserveOptions {
    /// Whether to run the deletion poller for the observed target.
    /// Requires a Tokio runtime. Default: true
    pub poll_deletions: bool,

    /// Poller period in milliseconds. Must be positive.
    /// Default: 500
    pub poll_interval_ms: u64,

    /// How deep to recurse into children of the observed value, installing
    /// monitors on members of nested objects. Must be positive.
    /// Default: 1 (the property itself and direct sub-key writes)
    pub depth: u32,
}

impl Default for ObserveOptions {
    fn default() -> Self {
        ObserveOptions {
            poll_deletions: true,
            poll_interval_ms: 500,
            depth: 1,
        }
    }
}

impl ObserveOptions {
    /// Enable or disable the deletion poller.
    ///
    /// Deletion is the one mutation the accessor layer cannot intercept;
    /// with polling off, removed properties keep their registry entries
    /// until explicitly unobserved.
    pub fn with_poll_deletions(mut self, enabled: bool) -> Self {
        self.poll_deletions = enabled;
        self
    }

    /// Set the poller period. Shorter periods detect deletions sooner at the
    /// cost of more wakeups; detection is always bounded by one period.
    pub fn with_poll_interval_ms(mut self, millis: u64) -> Self {
        self.poll_interval_ms = millis;
        self
    }

    /// Set the recursive observation depth. At depth 1 only the property
    /// itself (and sub-key writes one level into its value) notify; each
    /// additional level installs monitors on the members of child objects,
    /// extending callback paths with `"<parent> -> <child> -> "`.
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(Error::InvalidOptions(
                "poll_interval_ms must be a positive number of milliseconds",
            ));
        }
        if self.depth == 0 {
            return Err(Error::InvalidOptions("depth must be at least 1"));
        }
        Ok(())
    }
}
