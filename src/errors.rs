use std::{any::Any, io};
use thiserror::Error;

/// Исход одной задачи, если она не вернула значение.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum TaskError {
    #[error("task panicked: {0}")]
    Panic(String),
    #[error("task dropped before producing a result")]
    ChannelClosed,
}

impl TaskError {
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_owned()
        };
        TaskError::Panic(message)
    }

    /// Сообщение паники, если задача упала.
    pub fn panic_message(&self) -> Option<&str> {
        match self {
            TaskError::Panic(message) => Some(message),
            TaskError::ChannelClosed => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("submit on a pool that is shutting down")]
    ShutDown,
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error("failed to spawn worker {index}: {source}")]
    Spawn {
        index: usize,
        #[source]
        source: io::Error,
    },
    #[error("size hint {hint} does not match the {actual} elements traversed")]
    SizeHintMismatch { hint: usize, actual: usize },
    #[error("scatter input has {input} elements but output has {output}")]
    LengthMismatch { input: usize, output: usize },
}

impl PoolError {
    /// Сообщение паники, если ошибка пришла из задачи.
    pub fn panic_message(&self) -> Option<&str> {
        match self {
            PoolError::Task(err) => err.panic_message(),
            _ => None,
        }
    }
}
