//! Fan-out of demultiplexed stream data to registered consumers.
//!
//! A [`StreamDispatcher`] owns the PID registry and drives an underlying
//! [`StreamFilter`] edge triggered: the hardware filter for a PID starts
//! when its first consumer activates and stops when its last one
//! deactivates. Consumers register a sink callback and receive every
//! chunk of payload data arriving on their PID while active.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex};

use log::{debug, warn};

use crate::error::{FilterError, SiError};

/// Selects how the payload of a PID is to be treated by the filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamKind {
    /// SI/PSI sections, reassembled from transport packets.
    Sections,
    /// Raw elementary stream payload.
    Payload,
}

/// Driver seam to the platform demultiplexer.
///
/// Implementations are told which PIDs need data; the dispatcher never
/// assumes a start succeeded until the call returns `Ok`.
pub trait StreamFilter: Send {
    fn start(&mut self, pid: u16, kind: StreamKind) -> Result<(), FilterError>;

    fn stop(&mut self, pid: u16) -> Result<(), FilterError>;
}

/// Opaque handle identifying one registered consumer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConsumerId(u64);

/// Sink callback invoked with each data chunk for the consumer's PID.
pub type StreamSink = Box<dyn FnMut(&[u8]) + Send>;

struct Consumer {
    pid: u16,
    kind: StreamKind,
    active: bool,
    sink: Arc<Mutex<StreamSink>>,
}

struct Registry {
    consumers: HashMap<ConsumerId, Consumer>,
    next_id: u64,
}

impl Registry {
    fn active_count(&self, pid: u16) -> usize {
        self.consumers
            .values()
            .filter(|consumer| consumer.pid == pid && consumer.active)
            .count()
    }
}

pub struct StreamDispatcher {
    registry: Mutex<Registry>,
    filter: Mutex<Box<dyn StreamFilter>>,
}

impl StreamDispatcher {
    pub fn new(filter: Box<dyn StreamFilter>) -> Self {
        Self {
            registry: Mutex::new(Registry {
                consumers: HashMap::new(),
                next_id: 0,
            }),
            filter: Mutex::new(filter),
        }
    }

    /// Registers `sink` for `pid`. The consumer starts out inactive and
    /// receives no data until activated.
    pub fn add_consumer(&self, pid: u16, kind: StreamKind, sink: StreamSink) -> ConsumerId {
        let mut registry = self.lock_registry();
        let id = ConsumerId(registry.next_id);
        registry.next_id += 1;
        registry.consumers.insert(
            id,
            Consumer {
                pid,
                kind,
                active: false,
                sink: Arc::new(Mutex::new(sink)),
            },
        );
        id
    }

    /// Activates or deactivates a consumer.
    ///
    /// The transition of the first consumer on a PID to active starts the
    /// underlying filter, the transition of the last one off it stops the
    /// filter. When starting fails the consumer stays inactive and the
    /// error is returned. Setting the state it already has is a no-op.
    pub fn set_consumer_state(&self, id: ConsumerId, active: bool) -> Result<(), SiError> {
        let mut registry = self.lock_registry();
        let consumer = registry
            .consumers
            .get(&id)
            .ok_or(SiError::UnknownConsumer(id))?;

        if consumer.active == active {
            return Ok(());
        }
        let pid = consumer.pid;
        let kind = consumer.kind;
        let peers = registry.active_count(pid);

        if active {
            if peers == 0 {
                self.start_filter(pid, kind)?;
            }
        } else if peers == 1 {
            self.stop_filter(pid)?;
        }

        if let Some(consumer) = registry.consumers.get_mut(&id) {
            consumer.active = active;
        }
        Ok(())
    }

    /// Deactivates and removes a consumer. Removing an unknown id is a
    /// no-op so teardown paths can call this unconditionally.
    pub fn remove_consumer(&self, id: ConsumerId) -> Result<(), SiError> {
        let mut registry = self.lock_registry();
        let Some(consumer) = registry.consumers.get(&id) else {
            return Ok(());
        };

        let was_active = consumer.active;
        let pid = consumer.pid;
        registry.consumers.remove(&id);

        if was_active && registry.active_count(pid) == 0 {
            self.stop_filter(pid)?;
        }
        Ok(())
    }

    /// Number of active consumers registered for `pid`.
    pub fn active_consumer_count(&self, pid: u16) -> usize {
        self.lock_registry().active_count(pid)
    }

    /// Hands `data` to every active consumer on `pid`.
    ///
    /// Sinks are snapshotted under the registry lock and invoked outside
    /// it, so a sink may call back into the dispatcher. A panicking sink
    /// is contained and does not affect its peers.
    pub fn dispatch(&self, pid: u16, data: &[u8]) {
        let sinks: Vec<Arc<Mutex<StreamSink>>> = {
            let registry = self.lock_registry();
            registry
                .consumers
                .values()
                .filter(|consumer| consumer.pid == pid && consumer.active)
                .map(|consumer| Arc::clone(&consumer.sink))
                .collect()
        };

        for sink in sinks {
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                if let Ok(mut sink) = sink.lock() {
                    sink(data);
                }
            }));
            if outcome.is_err() {
                warn!("consumer sink for PID {pid:#06x} panicked, continuing");
            }
        }
    }

    fn start_filter(&self, pid: u16, kind: StreamKind) -> Result<(), SiError> {
        debug!("starting filter for PID {pid:#06x}");
        self.lock_filter()
            .start(pid, kind)
            .map_err(|source| SiError::FilterStart { pid, source })
    }

    fn stop_filter(&self, pid: u16) -> Result<(), SiError> {
        debug!("stopping filter for PID {pid:#06x}");
        self.lock_filter()
            .stop(pid)
            .map_err(|source| SiError::FilterStop { pid, source })
    }

    fn lock_registry(&self) -> std::sync::MutexGuard<'_, Registry> {
        match self.registry.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock_filter(&self) -> std::sync::MutexGuard<'_, Box<dyn StreamFilter>> {
        match self.filter.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Filter that accepts every request, for tests and offline playback.
pub struct NullFilter;

impl StreamFilter for NullFilter {
    fn start(&mut self, _pid: u16, _kind: StreamKind) -> Result<(), FilterError> {
        Ok(())
    }

    fn stop(&mut self, _pid: u16) -> Result<(), FilterError> {
        Ok(())
    }
}
