//! Unit-of-work over a pool of connections
//!
//! A [`Session`] acquires a connection the first time it is needed, keeps it
//! for the rest of the unit of work and always hands it back to the pool:
//! after a commit, or after a rollback when the session is closed or dropped
//! without committing.

use crate::errors::SessionError;
use crate::pool::Pool;

use std::fmt;

/// A transactional connection held by a [`Session`].
pub trait Connection {
    type Error;

    fn commit(&mut self) -> Result<(), Self::Error>;

    fn rollback(&mut self) -> Result<(), Self::Error>;
}

pub type SessionResult<T, P> =
    Result<T, SessionError<<P as Pool>::Error, <<P as Pool>::Item as Connection>::Error>>;

type OnActive<'p, C> = Box<dyn FnMut(&mut C) + 'p>;

/// Lazily-acquired connection with commit/rollback handling.
///
/// # Examples
///
/// ```
/// use resource_pool::{Connection, LazyPool, Pool, Session};
///
/// struct Conn;
///
/// impl Connection for Conn {
///     type Error = std::io::Error;
///     fn commit(&mut self) -> Result<(), Self::Error> { Ok(()) }
///     fn rollback(&mut self) -> Result<(), Self::Error> { Ok(()) }
/// }
///
/// let mut pool = LazyPool::from_fn(|_| Conn, 2).unwrap();
/// {
///     let mut session = Session::new(&mut pool);
///     session.connection().unwrap();
///     session.commit().unwrap();
/// }
/// assert_eq!(pool.count(), 2);
/// assert_eq!(pool.created(), 1);
/// ```
pub struct Session<'p, P>
where
    P: Pool,
    P::Item: Connection,
{
    pool: &'p mut P,
    connection: Option<P::Item>,
    on_active: Option<OnActive<'p, P::Item>>,
}

impl<'p, P> Session<'p, P>
where
    P: Pool,
    P::Item: Connection,
{
    /// Start a session. Nothing is acquired until a connection is needed.
    pub fn new(pool: &'p mut P) -> Self {
        Self {
            pool,
            connection: None,
            on_active: None,
        }
    }

    /// Run `callback` on every freshly acquired connection.
    pub fn with_on_active<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&mut P::Item) + 'p,
    {
        self.on_active = Some(Box::new(callback));
        self
    }

    /// Whether the session currently holds a connection.
    pub fn is_active(&self) -> bool {
        self.connection.is_some()
    }

    pub fn pool(&self) -> &P {
        &*self.pool
    }

    /// The session's connection, acquired on first use.
    pub fn connection(&mut self) -> SessionResult<&mut P::Item, P> {
        let connection = match self.connection.take() {
            Some(connection) => connection,
            None => {
                let mut connection = self.pool.acquire().map_err(SessionError::Pool)?;
                if let Some(on_active) = self.on_active.as_mut() {
                    on_active(&mut connection);
                }
                connection
            }
        };
        Ok(self.connection.insert(connection))
    }

    /// Commit and hand the connection back. Does nothing when no connection
    /// was used. The connection goes back to the pool even if commit fails.
    pub fn commit(&mut self) -> SessionResult<(), P> {
        let Some(mut connection) = self.connection.take() else {
            return Ok(());
        };

        let result = connection.commit();
        self.pool.get_back(connection);
        result.map_err(SessionError::Connection)
    }

    /// Roll back any uncommitted work and hand the connection back.
    pub fn close(mut self) -> SessionResult<(), P> {
        self.release().map_err(SessionError::Connection)
    }

    fn release(&mut self) -> Result<(), <P::Item as Connection>::Error> {
        let Some(mut connection) = self.connection.take() else {
            return Ok(());
        };

        let result = connection.rollback();
        self.pool.get_back(connection);
        result
    }
}

impl<P> Drop for Session<'_, P>
where
    P: Pool,
    P::Item: Connection,
{
    fn drop(&mut self) {
        if self.release().is_err() {
            tracing::warn!("rollback failed while dropping session; connection returned to pool");
        }
    }
}

impl<P> fmt::Debug for Session<'_, P>
where
    P: Pool,
    P::Item: Connection,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::LazyPool;
    use std::cell::RefCell;
    use std::convert::Infallible;
    use std::rc::Rc;

    type Journal = Rc<RefCell<Vec<String>>>;

    struct MockConnection {
        id: usize,
        journal: Journal,
        fail: bool,
    }

    impl Connection for MockConnection {
        type Error = String;

        fn commit(&mut self) -> Result<(), String> {
            self.journal.borrow_mut().push(format!("commit {}", self.id));
            if self.fail { Err("commit failed".into()) } else { Ok(()) }
        }

        fn rollback(&mut self) -> Result<(), String> {
            self.journal.borrow_mut().push(format!("rollback {}", self.id));
            if self.fail { Err("rollback failed".into()) } else { Ok(()) }
        }
    }

    fn connections(
        journal: &Journal,
        fail: bool,
    ) -> LazyPool<MockConnection, impl FnMut(usize) -> Result<MockConnection, Infallible>> {
        let journal = Rc::clone(journal);
        LazyPool::from_fn(
            move |id| MockConnection {
                id,
                journal: Rc::clone(&journal),
                fail,
            },
            2,
        )
        .unwrap()
    }

    #[test]
    fn test_unused_session_acquires_nothing() {
        let journal = Journal::default();
        let mut pool = connections(&journal, false);
        {
            let mut session = Session::new(&mut pool);
            assert!(!session.is_active());
            session.commit().unwrap();
        }

        assert_eq!(pool.created(), 0);
        assert_eq!(pool.metrics().total_acquired, 0);
        assert!(journal.borrow().is_empty());
    }

    #[test]
    fn test_connection_is_reused_and_on_active_runs_once() {
        let journal = Journal::default();
        let mut pool = connections(&journal, false);
        let activations = RefCell::new(Vec::new());
        {
            let mut session = Session::new(&mut pool).with_on_active(|conn: &mut MockConnection| {
                activations.borrow_mut().push(conn.id);
            });
            assert_eq!(session.connection().unwrap().id, 0);
            assert_eq!(session.connection().unwrap().id, 0);
            assert_eq!(session.pool().metrics().total_acquired, 1);
            session.commit().unwrap();
        }

        assert_eq!(*activations.borrow(), vec![0]);
        assert_eq!(pool.count(), 2);
    }

    #[test]
    fn test_commit_returns_connection_and_next_use_reacquires() {
        let journal = Journal::default();
        let mut pool = connections(&journal, false);
        {
            let mut session = Session::new(&mut pool);
            session.connection().unwrap();
            session.commit().unwrap();
            assert!(!session.is_active());
            assert_eq!(session.pool().count(), 2);

            session.connection().unwrap();
            assert_eq!(session.pool().metrics().total_acquired, 2);
        }

        assert_eq!(*journal.borrow(), vec!["commit 0", "rollback 0"]);
        assert_eq!(pool.count(), 2);
    }

    #[test]
    fn test_commit_error_still_returns_connection() {
        let journal = Journal::default();
        let mut pool = connections(&journal, true);
        let mut session = Session::new(&mut pool);
        session.connection().unwrap();

        let err = session.commit().unwrap_err();
        assert!(matches!(err, SessionError::Connection(ref msg) if msg == "commit failed"));
        assert_eq!(session.pool().count(), 2);
    }

    #[test]
    fn test_drop_rolls_back() {
        let journal = Journal::default();
        let mut pool = connections(&journal, false);
        {
            let mut session = Session::new(&mut pool);
            session.connection().unwrap();
        }

        assert_eq!(*journal.borrow(), vec!["rollback 0"]);
        assert_eq!(pool.count(), 2);
    }

    #[test]
    fn test_close_reports_rollback_error_and_returns_connection() {
        let journal = Journal::default();
        let mut pool = connections(&journal, true);
        let mut session = Session::new(&mut pool);
        session.connection().unwrap();

        assert!(matches!(session.close(), Err(SessionError::Connection(_))));
        assert_eq!(*journal.borrow(), vec!["rollback 0"]);
        assert_eq!(pool.count(), 2);
    }

    #[test]
    fn test_exhausted_pool_is_a_pool_error() {
        let journal = Journal::default();
        let mut pool = connections(&journal, false);
        let _held = (pool.acquire().unwrap(), pool.acquire().unwrap());

        let mut session = Session::new(&mut pool);
        assert!(matches!(session.connection(), Err(SessionError::Pool(err)) if err.is_exhausted()));
    }
}
