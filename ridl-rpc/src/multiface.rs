//! Fan-out over several handlers of one method.

use crate::error::ServiceError;
use crate::processor::Handler;
use ridl_codec::Value;
use std::sync::Arc;

/// Calls each of its handlers in order with the same arguments.
///
/// The result of the last handler is the result of the call. The first
/// failing handler stops the fan-out and its error is returned; handlers
/// after it are not called.
#[derive(Clone, Default)]
pub struct Multiface {
    handlers: Vec<Handler>,
}

impl Multiface {
    pub fn new(handlers: Vec<Handler>) -> Self {
        Self { handlers }
    }

    pub fn push(&mut self, handler: Handler) {
        self.handlers.push(handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn call(&self, args: &[Value]) -> Result<Option<Value>, ServiceError> {
        let Some((last, rest)) = self.handlers.split_last() else {
            return Err(ServiceError::other("no handlers"));
        };
        for handler in rest {
            handler(args)?;
        }
        last(args)
    }

    /// Wraps the fan-out as a single [`Handler`].
    pub fn into_handler(self) -> Handler {
        Arc::new(move |args: &[Value]| self.call(args))
    }
}

impl From<Vec<Handler>> for Multiface {
    fn from(handlers: Vec<Handler>) -> Self {
        Self::new(handlers)
    }
}

impl std::fmt::Debug for Multiface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Multiface")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use ridl_codec::StructValue;

    fn recording(log: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str, value: i32) -> Handler {
        let log = log.clone();
        Arc::new(move |_: &[Value]| {
            log.lock().push(tag);
            Ok(Some(Value::I32(value)))
        })
    }

    #[test]
    fn test_calls_all_returns_last() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let multi = Multiface::new(vec![
            recording(&log, "a", 1),
            recording(&log, "b", 2),
            recording(&log, "c", 3),
        ]);
        assert_eq!(multi.len(), 3);
        assert_eq!(multi.call(&[]).unwrap(), Some(Value::I32(3)));
        assert_eq!(*log.lock(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_failure_stops_fan_out() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let failing: Handler = Arc::new(|_: &[Value]| {
            Err(StructValue::new("TooFar").with(1, 100).into())
        });
        let mut multi = Multiface::from(vec![recording(&log, "a", 1), failing]);
        multi.push(recording(&log, "c", 3));

        let err = multi.into_handler()(&[]).unwrap_err();
        assert!(matches!(err, ServiceError::Declared(ref e) if e.name() == "TooFar"));
        assert_eq!(*log.lock(), vec!["a"]);
    }

    #[test]
    fn test_no_handlers() {
        let multi = Multiface::default();
        assert!(multi.is_empty());
        assert_eq!(multi.call(&[]), Err(ServiceError::other("no handlers")));
    }
}
