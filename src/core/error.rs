use thiserror::Error;

use crate::atree::BuildError;
use crate::compose::ComposeError;
use crate::graph::GraphError;

#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Tree build error: {0}")]
    Build(#[from] BuildError),

    #[error("Composition error: {0}")]
    Compose(#[from] ComposeError),

    #[error("Unknown class: {0}")]
    UnknownClass(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    ConfigError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, PlannerError>;
