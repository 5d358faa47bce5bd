//! Error types for allocation and linear memory growth.

/// Errors surfaced by the allocators.
///
/// `OutOfMemory` is the only failure a well-behaved caller should ever see;
/// the allocator remains usable afterwards. The remaining variants report
/// misconfiguration or a corrupted allocator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
    /// Linear memory could not be grown far enough to host the request.
    #[error("out of memory: requested {requested} bytes with {address_space} bytes of address space")]
    OutOfMemory {
        requested: usize,
        address_space: usize,
    },

    /// The region registry is inconsistent or full.
    #[error("allocator invariant violated: {0}")]
    InvariantViolation(String),

    /// Byte access outside the managed heap.
    #[error("access of {len} bytes at {addr:#x} is outside the heap")]
    OutOfBounds { addr: usize, len: usize },

    /// A previous invariant violation disabled the allocator.
    #[error("allocator is poisoned after an invariant violation")]
    Poisoned,

    /// Too many nested scopes in LIFO mode.
    #[error("scope stack overflow: depth {depth} exhausted")]
    ScopeStackOverflow { depth: usize },

    /// The process-wide allocator was installed twice.
    #[error("a process-wide allocator is already installed")]
    AlreadyInstalled,

    /// Invalid allocator configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Failure to extend linear memory. Always recoverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GrowError {
    /// The driver's page ceiling would be exceeded.
    #[error("page limit reached: {current} + {requested} pages exceeds {limit}")]
    LimitReached {
        current: usize,
        requested: usize,
        limit: usize,
    },

    /// The host refused to grow memory.
    #[error("host rejected growth by {requested} pages")]
    Rejected { requested: usize },
}

pub type Result<T> = std::result::Result<T, AllocError>;
