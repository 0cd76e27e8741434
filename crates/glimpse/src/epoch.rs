/// Tags in-flight work so outcomes from a superseded attempt are dropped.
#[derive(Debug, Clone, Default)]
pub(crate) struct EpochValidator {
    epoch: u64,
}

impl EpochValidator {
    pub(crate) fn current(&self) -> u64 {
        self.epoch
    }

    /// Start a new epoch; everything tagged earlier becomes stale.
    pub(crate) fn next_epoch(&mut self) -> u64 {
        self.epoch = self.epoch.wrapping_add(1);
        self.epoch
    }

    pub(crate) fn is_current(&self, epoch: u64) -> bool {
        epoch == self.epoch
    }
}
