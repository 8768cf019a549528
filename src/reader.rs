//! Blocking collection of one table kind from a live stream.
//!
//! A [`TableReader`] registers itself as a section consumer on the
//! dispatcher, frames and decodes everything arriving on its PID and
//! assembles matching tables until a complete set exists. Callers block
//! in [`TableReader::wait_for_tables`] with a timeout; a cancellation
//! predicate is polled while waiting so an aborted scan returns quickly.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::warn;

use crate::assembler::TableAssembler;
use crate::dispatch::{ConsumerId, StreamDispatcher, StreamKind};
use crate::error::SiError;
use crate::parser::SectionParser;
use crate::tables::TableVariant;

/// Longest uninterrupted wait before the cancellation predicate is
/// polled again.
const CANCEL_POLL: Duration = Duration::from_millis(100);

struct ReaderState<T: TableVariant> {
    assembler: TableAssembler<T>,
    complete: Option<Vec<T>>,
    cancelled: bool,
}

struct Shared<T: TableVariant> {
    state: Mutex<ReaderState<T>>,
    ready: Condvar,
}

impl<T: TableVariant> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, ReaderState<T>> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Collects all sections of the table kind `T` from one PID.
pub struct TableReader<T: TableVariant> {
    shared: Arc<Shared<T>>,
    dispatcher: Arc<StreamDispatcher>,
    consumer: ConsumerId,
}

impl<T: TableVariant> TableReader<T> {
    /// Registers on the PID where `T` is broadcast and starts the filter.
    pub fn start(dispatcher: &Arc<StreamDispatcher>) -> Result<Self, SiError> {
        Self::start_on(dispatcher, T::well_known_pid())
    }

    /// Registers on an explicit PID, for tables without a fixed one.
    pub fn start_on(dispatcher: &Arc<StreamDispatcher>, pid: u16) -> Result<Self, SiError> {
        let shared = Arc::new(Shared {
            state: Mutex::new(ReaderState {
                assembler: TableAssembler::new(),
                complete: None,
                cancelled: false,
            }),
            ready: Condvar::new(),
        });

        // Each reader frames its PID independently; the parser lives in
        // the sink and feeds decoded tables into the shared assembler.
        let sink_shared = Arc::clone(&shared);
        let mut parser = SectionParser::new().with_section_handler(move |section| {
            let Some(table) = section.table().cloned().and_then(T::from_table) else {
                return;
            };

            let mut state = sink_shared.lock();
            if state.complete.is_some() || state.cancelled {
                return;
            }
            if let Some(tables) = state.assembler.add(table) {
                state.complete = Some(tables);
                drop(state);
                sink_shared.ready.notify_all();
            }
        });

        let consumer = dispatcher.add_consumer(
            pid,
            StreamKind::Sections,
            Box::new(move |data| parser.feed(data)),
        );
        dispatcher.set_consumer_state(consumer, true)?;

        Ok(Self {
            shared,
            dispatcher: Arc::clone(dispatcher),
            consumer,
        })
    }

    /// Blocks until a complete set of tables arrived or `timeout` passed.
    pub fn wait_for_tables(&self, timeout: Duration) -> Option<Vec<T>> {
        self.wait_for_tables_or(timeout, || false)
    }

    /// Like [`wait_for_tables`](Self::wait_for_tables), additionally
    /// giving up as soon as `cancel` reports true. The predicate is
    /// polled at least every 100 milliseconds.
    pub fn wait_for_tables_or(
        &self,
        timeout: Duration,
        cancel: impl Fn() -> bool,
    ) -> Option<Vec<T>> {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.lock();

        loop {
            if let Some(tables) = state.complete.take() {
                return Some(tables);
            }
            if state.cancelled || cancel() {
                return None;
            }

            let remaining = deadline.checked_duration_since(Instant::now())?;
            let (next, _) = match self
                .shared
                .ready
                .wait_timeout(state, remaining.min(CANCEL_POLL))
            {
                Ok(woken) => woken,
                Err(poisoned) => poisoned.into_inner(),
            };
            state = next;
        }
    }

    /// Stops the reader: deactivates its consumer so the PID filter can
    /// shut down, discards fragments still in flight and wakes every
    /// waiter empty handed. Further calls are no-ops.
    pub fn cancel(&self) {
        {
            let mut state = self.shared.lock();
            if state.cancelled {
                return;
            }
            state.cancelled = true;
        }
        self.shared.ready.notify_all();

        if let Err(error) = self.dispatcher.set_consumer_state(self.consumer, false) {
            warn!("deactivating table reader failed: {error}");
        }
    }
}

impl<T: TableVariant> Drop for TableReader<T> {
    fn drop(&mut self) {
        self.cancel();
        if let Err(error) = self.dispatcher.remove_consumer(self.consumer) {
            warn!("detaching table reader failed: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::NullFilter;
    use crate::section::encode_section;
    use crate::tables::Sdt;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn sdt_wire(version: u8, section: u8, last: u8) -> Vec<u8> {
        let body = [
            0x00,
            0x01,
            0xC1 | (version << 1),
            section,
            last,
            0x00,
            0x55,
            0xFF,
        ];
        encode_section(0x42, true, &body)
    }

    fn dispatcher() -> Arc<StreamDispatcher> {
        Arc::new(StreamDispatcher::new(Box::new(NullFilter)))
    }

    #[test]
    fn collects_a_full_set() {
        let dispatcher = dispatcher();
        let reader = TableReader::<Sdt>::start(&dispatcher).unwrap();

        dispatcher.dispatch(0x11, &sdt_wire(1, 1, 1));
        dispatcher.dispatch(0x11, &sdt_wire(1, 0, 1));

        let tables = reader.wait_for_tables(Duration::from_secs(1)).unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].header.section_number, 0);
    }

    #[test]
    fn completion_from_another_thread_wakes_the_waiter() {
        let dispatcher = dispatcher();
        let reader = TableReader::<Sdt>::start(&dispatcher).unwrap();

        let feeder = {
            let dispatcher = Arc::clone(&dispatcher);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(50));
                dispatcher.dispatch(0x11, &sdt_wire(3, 0, 0));
            })
        };

        let tables = reader.wait_for_tables(Duration::from_secs(5)).unwrap();
        assert_eq!(tables.len(), 1);
        feeder.join().unwrap();
    }

    #[test]
    fn timeout_returns_none() {
        let dispatcher = dispatcher();
        let reader = TableReader::<Sdt>::start(&dispatcher).unwrap();
        assert!(reader.wait_for_tables(Duration::from_millis(50)).is_none());
    }

    #[test]
    fn cancel_predicate_is_polled() {
        let dispatcher = dispatcher();
        let reader = TableReader::<Sdt>::start(&dispatcher).unwrap();
        let abort = Arc::new(AtomicBool::new(false));

        let trigger = {
            let abort = Arc::clone(&abort);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(150));
                abort.store(true, Ordering::SeqCst);
            })
        };

        let began = Instant::now();
        let result =
            reader.wait_for_tables_or(Duration::from_secs(30), || abort.load(Ordering::SeqCst));
        assert!(result.is_none());
        assert!(began.elapsed() < Duration::from_secs(5));
        trigger.join().unwrap();
    }

    #[test]
    fn cancel_is_idempotent_and_wakes_waiters() {
        let dispatcher = dispatcher();
        let reader = Arc::new(TableReader::<Sdt>::start(&dispatcher).unwrap());

        let canceler = {
            let reader = Arc::clone(&reader);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(50));
                reader.cancel();
                reader.cancel();
            })
        };

        assert!(reader.wait_for_tables(Duration::from_secs(30)).is_none());
        canceler.join().unwrap();
    }

    #[test]
    fn cancel_detaches_from_the_dispatcher() {
        let dispatcher = dispatcher();
        let reader = TableReader::<Sdt>::start(&dispatcher).unwrap();
        assert_eq!(dispatcher.active_consumer_count(0x11), 1);

        reader.cancel();
        assert_eq!(dispatcher.active_consumer_count(0x11), 0);

        // Sections arriving after cancellation are never assembled.
        dispatcher.dispatch(0x11, &sdt_wire(1, 0, 0));
        assert!(reader.wait_for_tables(Duration::from_millis(50)).is_none());
    }

    #[test]
    fn drop_releases_the_pid_filter() {
        let dispatcher = dispatcher();
        {
            let _reader = TableReader::<Sdt>::start(&dispatcher).unwrap();
            assert_eq!(dispatcher.active_consumer_count(0x11), 1);
        }
        assert_eq!(dispatcher.active_consumer_count(0x11), 0);
    }
}
