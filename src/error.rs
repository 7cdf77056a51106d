#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("search worker is already running")]
    WorkerAlreadyStarted,
    #[error("failed to spawn search worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),
    #[error("search worker thread panicked")]
    WorkerPanic,
    #[error("failed to start file system watcher: {0}")]
    FileSystemWatch(#[from] notify::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
