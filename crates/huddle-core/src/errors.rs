use thiserror::Error;

#[derive(Debug, Error)]
pub enum HuddleError {
    #[error("engine initialization failed: {0}")]
    EngineInit(String),
    #[error("engine command rejected: {0}")]
    EngineCommand(String),
    #[error("session not ready")]
    NotReady,
    #[error("invalid config: {0}")]
    Config(String),
}
