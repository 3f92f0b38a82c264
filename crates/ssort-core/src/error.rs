/// Failures that stop a run before any line is processed
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("invalid filter pattern '{filter}'")]
    InvalidPattern {
        filter: String,
        #[source]
        source: regex::Error,
    },

    #[error("empty executable command")]
    EmptyCommand,

    #[error("error starting command '{command}'")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("flush timeout must be greater than zero")]
    ZeroTimeout,
}
