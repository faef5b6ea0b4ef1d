//! Without the `logging` feature nothing is printed, but the `log` macros still skip messages
//! above the configured levels.

use crate::log::LogConfiguration;

impl LogConfiguration {
    pub(in crate::log) fn apply(&mut self) {
        log::set_max_level(self.max_level());
    }
}
