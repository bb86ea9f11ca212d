use super::signal::InstanceSignal;
use crate::encounter::EncounterRegistry;

/// Trait for systems that react to instance signals.
/// Implement this for the movement layer, world-object drivers, etc.
pub trait InstanceSignalHandler {
    /// Handle a single signal.
    ///
    /// The registry gives read access to every encounter state so handlers
    /// don't need to mirror it.
    fn handle_signal(&mut self, signal: &InstanceSignal, registry: &EncounterRegistry);

    /// Handle multiple signals (default implementation calls handle_signal for each)
    fn handle_signals(&mut self, signals: &[InstanceSignal], registry: &EncounterRegistry) {
        for signal in signals {
            self.handle_signal(signal, registry);
        }
    }
}
