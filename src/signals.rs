/// Every notification a task button (or the bar itself) can subscribe to.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Signal {
    // window-scoped
    Focus,
    Attention,
    Urgent,
    App,
    SkipTaskbar,
    Unmanaging,
    WindowWorkspace,
    // desktop-scoped
    ActiveWorkspace,
    Overview,
    // self-scoped
    Hover,
    Press,
    // bar-scoped
    WindowCreated,
    PanelScroll,
}

/**
 * Subscription bundle tied to the lifetime of its owner.
 *
 * Event delivery is always gated on `is_connected`, so tearing the set
 * down is all it takes to stop observing the host. `teardown` is
 * idempotent; the owner's destroyed flag keeps it from being reached
 * more than once anyway.
 */
#[derive(Debug, Default)]
pub struct SignalSet {
    connected: Vec<Signal>,
}

impl SignalSet {
    pub fn new() -> SignalSet {
        SignalSet {
            connected: Vec::new(),
        }
    }

    pub fn connect(&mut self, signal: Signal) {
        if !self.connected.contains(&signal) {
            self.connected.push(signal);
        }
    }

    pub fn is_connected(&self, signal: Signal) -> bool {
        self.connected.contains(&signal)
    }

    /// Release every registered subscription.
    pub fn teardown(&mut self) {
        self.connected.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_is_idempotent() {
        let mut signals = SignalSet::new();
        signals.connect(Signal::Focus);
        signals.connect(Signal::Focus);
        assert!(signals.is_connected(Signal::Focus));
        assert_eq!(signals.connected.len(), 1);
    }

    #[test]
    fn teardown_releases_everything() {
        let mut signals = SignalSet::new();
        signals.connect(Signal::Focus);
        signals.connect(Signal::Overview);
        signals.teardown();
        assert!(signals.connected.is_empty());
        assert!(!signals.is_connected(Signal::Focus));
        // safe to run again
        signals.teardown();
    }
}
