use crate::dispatch::ConsumerId;

/// Boxed error reported by a [`StreamFilter`](crate::dispatch::StreamFilter)
/// implementation.
pub type FilterError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum SiError {
    /// The section framer would have to buffer more than its hard cap of
    /// unread bytes. The internal buffer has been reset; the caller may
    /// restart the upstream filter.
    #[error("section buffer overrun, stream may be corrupted")]
    BufferOverrun,

    #[error("unknown consumer {0:?}")]
    UnknownConsumer(ConsumerId),

    #[error("starting filter for PID {pid:#06x} failed")]
    FilterStart {
        pid: u16,
        #[source]
        source: FilterError,
    },

    #[error("stopping filter for PID {pid:#06x} failed")]
    FilterStop {
        pid: u16,
        #[source]
        source: FilterError,
    },
}
