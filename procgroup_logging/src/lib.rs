//! Generic buffered event logging infrastructure.
//!
//! This is intentionally independent of any one event type: a `Registry` binds
//! named logging streams to actions over batches of timestamped events, and a
//! `Logger<T>` is the cheaply-`Clone`able handle callers hold to emit events of
//! a single type `T` into one such stream.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// A collection of named, independently typed logging streams.
pub struct Registry {
    /// An instant common to all logging statements.
    time: Instant,
    /// A map from names to typed loggers.
    map: HashMap<String, Box<dyn Any>>,
}

impl Registry {
    /// Creates a new logger registry.
    pub fn new(time: Instant) -> Self {
        Registry { time, map: HashMap::new() }
    }

    /// Binds a log name to an action on log event batches.
    ///
    /// Returns any pre-installed action, rather than overwriting it and
    /// pivoting the logging destination mid-stream. New loggers with this
    /// name use the new destination; existing loggers keep the old one.
    ///
    /// The action should respond to a sequence of events with non-decreasing
    /// timestamps, plus a timestamp lower-bounding the next event that could
    /// be seen. The end of a logging stream is indicated only by dropping the
    /// associated action, via `remove`.
    pub fn insert<T: 'static>(
        &mut self,
        name: String,
        action: Box<dyn Fn(&Duration, &[(Duration, T)])>,
    ) -> Option<Box<dyn Any>> {
        let logger = Logger::<T>::new(self.time, action);
        self.map.insert(name, Box::new(logger))
    }

    /// Removes a bound logger, closing its stream.
    pub fn remove(&mut self, name: &str) -> Option<Box<dyn Any>> {
        self.map.remove(name)
    }

    /// Retrieves a shared logger, if one has been inserted.
    pub fn get<T: 'static>(&self, name: &str) -> Option<Logger<T>> {
        self.map
            .get(name)
            .and_then(|entry| entry.downcast_ref::<Logger<T>>())
            .map(|x| (*x).clone())
    }
}

/// A buffering logger for events of type `T`.
pub struct Logger<T> {
    time: Instant,
    action: Rc<dyn Fn(&Duration, &[(Duration, T)])>,
    buffer: Rc<RefCell<Vec<(Duration, T)>>>,
}

impl<T> Clone for Logger<T> {
    fn clone(&self) -> Self {
        Logger { time: self.time, action: self.action.clone(), buffer: self.buffer.clone() }
    }
}

impl<T> Logger<T> {
    /// Allocates a new shareable logger bound to a write destination.
    pub fn new(time: Instant, action: Box<dyn Fn(&Duration, &[(Duration, T)])>) -> Self {
        Logger {
            time,
            action: Rc::from(action),
            buffer: Rc::new(RefCell::new(Vec::with_capacity(1024))),
        }
    }

    /// Logs an event.
    ///
    /// The event has its timestamp recorded at the moment of logging, but it
    /// may be delayed due to buffering; it is written when the logger is next
    /// flushed, either because the buffer reached capacity or because of a
    /// direct call to `flush`.
    pub fn log(&self, event: T) {
        let mut buffer = self.buffer.borrow_mut();
        buffer.push((self.time.elapsed(), event));
        if buffer.len() == buffer.capacity() {
            (self.action)(&self.time.elapsed(), &buffer[..]);
            buffer.clear();
        }
    }

    /// Flushes logged messages and communicates the new minimal timestamp.
    pub fn flush(&self) {
        let mut buffer = self.buffer.borrow_mut();
        (self.action)(&self.time.elapsed(), &buffer[..]);
        buffer.clear();
    }
}
