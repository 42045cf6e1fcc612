use thiserror::Error;

/// Broad classification of a [`MatMulError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The requested shape or worker count cannot be partitioned; raised before any work.
    Configuration,
    /// A send/receive pair did not match in length or rank, or a peer went away.
    Protocol,
    /// The execution environment failed (pool construction, worker panic).
    Runtime,
}

#[derive(Error, Debug)]
pub enum MatMulError {
    #[error("Worker count must be at least 1")]
    NoWorkers,

    #[error("Worker count {workers} exceeds dimension {dimension} = {extent}")]
    WorkersExceedDimension {
        workers: usize,
        dimension: &'static str,
        extent: usize,
    },

    #[error("Worker count {workers} is not a perfect square")]
    NotPerfectSquare { workers: usize },

    #[error("Dimension {dimension} = {extent} is not divisible by {factor}")]
    IndivisibleDimension {
        dimension: &'static str,
        extent: usize,
        factor: usize,
    },

    #[error("Incompatible operands: A is {a_rows}x{a_cols}, B is {b_rows}x{b_cols}")]
    IncompatibleOperands {
        a_rows: usize,
        a_cols: usize,
        b_rows: usize,
        b_cols: usize,
    },

    #[error("Invalid dimension: expected {expected}, got {got}")]
    InvalidDimension { expected: usize, got: usize },

    #[error("Shape mismatch: expected {expected_rows}x{expected_cols}, got {rows}x{cols}")]
    ShapeMismatch {
        expected_rows: usize,
        expected_cols: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Empty matrix: {rows}x{cols}")]
    EmptyMatrix { rows: usize, cols: usize },

    #[error("Ragged input: row {row} has {got} columns, expected {expected}")]
    RaggedRows {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("Message from rank {peer} has length {got}, expected {expected}")]
    LengthMismatch {
        peer: usize,
        expected: usize,
        got: usize,
    },

    #[error("Rank {rank} is outside a world of {size} workers")]
    InvalidRank { rank: usize, size: usize },

    #[error("Rank {peer} disconnected")]
    PeerDisconnected { peer: usize },

    #[error("Worker {rank} panicked")]
    WorkerPanicked { rank: usize },

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl MatMulError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoWorkers
            | Self::WorkersExceedDimension { .. }
            | Self::NotPerfectSquare { .. }
            | Self::IndivisibleDimension { .. }
            | Self::IncompatibleOperands { .. }
            | Self::InvalidDimension { .. }
            | Self::ShapeMismatch { .. }
            | Self::EmptyMatrix { .. }
            | Self::RaggedRows { .. } => ErrorKind::Configuration,
            Self::LengthMismatch { .. } | Self::InvalidRank { .. } | Self::PeerDisconnected { .. } => {
                ErrorKind::Protocol
            }
            Self::WorkerPanicked { .. } | Self::ThreadPool(_) => ErrorKind::Runtime,
        }
    }

    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }

    pub fn is_protocol(&self) -> bool {
        self.kind() == ErrorKind::Protocol
    }
}

pub type Result<T> = std::result::Result<T, MatMulError>;
