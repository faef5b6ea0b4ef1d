use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::Config;

use crate::log::LogConfiguration;

const CONSOLE: &str = "console";

// ISO 8601 timestamp, color coded level, module path
const LOG_PATTERN: &str = "{d(%Y-%m-%dT%H:%M:%SZ)} {h({l})} {t} - {m}{n}";

impl LogConfiguration {
    /// Installs a console logger following this configuration, or reconfigures the one already
    /// installed.
    pub(in crate::log) fn apply(&mut self) {
        let console = ConsoleAppender::builder()
            .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
            .build();
        let loggers = self
            .module_levels()
            .into_iter()
            .map(|(module, level)| Logger::builder().build(module, level));
        let config = Config::builder()
            .appender(Appender::builder().build(CONSOLE, Box::new(console)))
            .loggers(loggers)
            .build(Root::builder().appender(CONSOLE).build(self.global_level));
        let config = match config {
            Ok(config) => config,
            Err(error) => {
                eprintln!("invalid logging configuration: {error}");
                return;
            }
        };

        if let Some(handle) = &self.handle {
            handle.set_config(config);
            return;
        }
        match log4rs::init_config(config) {
            Ok(handle) => self.handle = Some(handle),
            Err(error) => eprintln!("failed to install the global logger: {error}"),
        }
    }
}
