/// Events emitted by the capability prober.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeEvent {
    /// The one-time decode attempt finished.
    Resolved { supported: bool },
}
