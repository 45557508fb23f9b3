//! Owned engine sessions.
//!
//! The engine namespace is global to the engine, so a [`Session`] owns the
//! engine and hands out one [`Marshaller`] at a time. Dropping the session
//! terminates the engine unless that was disabled.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use crate::error::{EngineError, Result};
use crate::marshal::Marshaller;
use crate::protocol::{Engine, StartOptions};

/// A started engine and exclusive access to its namespace.
pub struct Session<E: Engine> {
    engine: Mutex<E>,
    terminate_on_drop: bool,
    terminated: bool,
}

impl<E: Engine> Session<E> {
    /// Start `engine` and wrap it in a session.
    pub fn start(mut engine: E, options: &StartOptions) -> Result<Self> {
        info!(sci_path = %options.sci_path.display(), "starting Scilab");
        if !engine.start(options) {
            return Err(EngineError::StartFailed {
                sci_path: options.sci_path.display().to_string(),
            });
        }
        Ok(Session {
            engine: Mutex::new(engine),
            terminate_on_drop: true,
            terminated: false,
        })
    }

    /// Choose whether dropping the session terminates the engine.
    pub fn with_terminate_on_drop(mut self, terminate_on_drop: bool) -> Self {
        self.terminate_on_drop = terminate_on_drop;
        self
    }

    /// Lock the namespace for a sequence of marshalling calls.
    pub fn lock(&self) -> Marshaller<'_, E> {
        Marshaller::new(self.engine())
    }

    /// Direct access to the underlying engine.
    pub fn engine(&self) -> MutexGuard<'_, E> {
        // A panic mid-call leaves the namespace as undefined as any failed
        // foreign call does; callers already cannot rely on it.
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Terminate the engine now, optionally running a quit script.
    pub fn terminate(mut self, quit_script: Option<&str>) -> Result<()> {
        self.terminated = true;
        let engine = self.engine.get_mut().unwrap_or_else(PoisonError::into_inner);
        info!("terminating Scilab");
        if !engine.terminate(quit_script) {
            return Err(EngineError::TerminateFailed);
        }
        Ok(())
    }
}

impl<E: Engine> Drop for Session<E> {
    fn drop(&mut self) {
        if self.terminated || !self.terminate_on_drop {
            return;
        }
        let engine = self.engine.get_mut().unwrap_or_else(PoisonError::into_inner);
        info!("terminating Scilab");
        if !engine.terminate(None) {
            warn!("Scilab did not terminate cleanly");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::memory::MemoryEngine;
    use crate::protocol::SciErr;

    /// Counts terminations; refuses to start when asked to.
    struct CountingEngine {
        inner: MemoryEngine,
        refuse_start: bool,
        terminations: Arc<AtomicUsize>,
    }

    impl Engine for CountingEngine {
        fn start(&mut self, options: &StartOptions) -> bool {
            !self.refuse_start && self.inner.start(options)
        }
        fn terminate(&mut self, quit_script: Option<&str>) -> bool {
            self.terminations.fetch_add(1, Ordering::SeqCst);
            self.inner.terminate(quit_script)
        }
        fn send_job(&mut self, job: &str) -> i32 {
            self.inner.send_job(job)
        }
        fn create_named_scalar_int32(&mut self, name: &str, value: i32) -> i32 {
            self.inner.create_named_scalar_int32(name, value)
        }
        fn create_named_scalar_double(&mut self, name: &str, value: f64) -> i32 {
            self.inner.create_named_scalar_double(name, value)
        }
        fn create_named_matrix_of_double(
            &mut self,
            name: &str,
            rows: usize,
            cols: usize,
            column_major: &[f64],
        ) -> SciErr {
            self.inner
                .create_named_matrix_of_double(name, rows, cols, column_major)
        }
        fn get_named_var_dimension(
            &mut self,
            name: &str,
        ) -> std::result::Result<(usize, usize), SciErr> {
            self.inner.get_named_var_dimension(name)
        }
        fn get_named_scalar_int32(&mut self, name: &str) -> std::result::Result<i32, i32> {
            self.inner.get_named_scalar_int32(name)
        }
        fn get_named_scalar_double(&mut self, name: &str) -> std::result::Result<f64, i32> {
            self.inner.get_named_scalar_double(name)
        }
        fn read_named_matrix_of_double(
            &mut self,
            name: &str,
            rows: usize,
            cols: usize,
        ) -> std::result::Result<Vec<f64>, SciErr> {
            self.inner.read_named_matrix_of_double(name, rows, cols)
        }
    }

    fn counting(refuse_start: bool) -> (CountingEngine, Arc<AtomicUsize>) {
        let terminations = Arc::new(AtomicUsize::new(0));
        let engine = CountingEngine {
            inner: MemoryEngine::new(),
            refuse_start,
            terminations: Arc::clone(&terminations),
        };
        (engine, terminations)
    }

    #[test]
    fn drop_terminates_engine() {
        let (engine, terminations) = counting(false);
        let session = Session::start(engine, &StartOptions::default()).unwrap();
        drop(session);
        assert_eq!(terminations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn explicit_terminate_runs_once() {
        let (engine, terminations) = counting(false);
        let session = Session::start(engine, &StartOptions::default()).unwrap();
        session.terminate(None).unwrap();
        assert_eq!(terminations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_can_leave_engine_running() {
        let (engine, terminations) = counting(false);
        let session = Session::start(engine, &StartOptions::default())
            .unwrap()
            .with_terminate_on_drop(false);
        drop(session);
        assert_eq!(terminations.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn failed_start_reported() {
        let (engine, _) = counting(true);
        let result = Session::start(engine, &StartOptions::default());
        assert!(matches!(result, Err(EngineError::StartFailed { .. })));
    }

    #[test]
    fn sessions_are_isolated() {
        let first = Session::start(MemoryEngine::new(), &StartOptions::default()).unwrap();
        let second = Session::start(MemoryEngine::new(), &StartOptions::default()).unwrap();
        first.lock().create_double("x", 1.0).unwrap();
        assert!(second.lock().get_double("x").is_err());
    }
}
