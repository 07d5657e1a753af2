use super::errors::TaskError;

pub type SpawnResult<T> = Result<T, TaskError>;
