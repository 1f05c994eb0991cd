use std::fmt;

#[derive(Debug)]
pub enum AutoPlaceError {
    InvalidConfiguration(String),
    ContainerNotFound(String),
    Asset(String),
    Io(std::io::Error),
}

impl fmt::Display for AutoPlaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutoPlaceError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            AutoPlaceError::ContainerNotFound(selector) => {
                write!(f, "no container matches selector {:?}", selector)
            }
            AutoPlaceError::Asset(message) => write!(f, "asset error: {}", message),
            AutoPlaceError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for AutoPlaceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AutoPlaceError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AutoPlaceError {
    fn from(value: std::io::Error) -> Self {
        AutoPlaceError::Io(value)
    }
}
