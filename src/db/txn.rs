//! Transaction context handed to a unit of work

use sqlx::Postgres;

/// Short-lived context binding a unit of work to one active transaction.
///
/// Wraps a [`sqlx::Transaction`] borrowing the connection for the duration
/// of a single transaction. The context is passed `&mut` into the unit of
/// work and consumed by [`commit`](Self::commit) or
/// [`rollback`](Self::rollback), so it is statically unusable after the
/// transaction ends. If neither is called, the transaction rolls back when
/// the context is dropped.
#[derive(Debug)]
pub struct TxnContext<'c>(sqlx::Transaction<'c, Postgres>);

impl<'c> TxnContext<'c> {
    /// Wraps a `sqlx` transaction with rollback-on-drop semantics.
    pub(crate) fn new(tx: sqlx::Transaction<'c, Postgres>) -> Self {
        Self(tx)
    }

    /// Commits all changes made within this transaction.
    pub async fn commit(self) -> Result<(), sqlx::Error> {
        self.0.commit().await
    }

    /// Rolls back all changes made within this transaction.
    ///
    /// Equivalent to dropping the context but allows explicit error handling.
    pub async fn rollback(self) -> Result<(), sqlx::Error> {
        self.0.rollback().await
    }
}

// Implement sqlx::Executor for &mut TxnContext by delegating to the underlying sqlx::Transaction
impl<'c, 'tx> sqlx::Executor<'c> for &'c mut TxnContext<'tx> {
    type Database = Postgres;

    fn fetch_many<'e, 'q: 'e, E>(
        self,
        query: E,
    ) -> futures::stream::BoxStream<
        'e,
        Result<
            sqlx::Either<
                <Postgres as sqlx::Database>::QueryResult,
                <Postgres as sqlx::Database>::Row,
            >,
            sqlx::Error,
        >,
    >
    where
        'c: 'e,
        E: 'q + sqlx::Execute<'q, Self::Database>,
    {
        (&mut self.0).fetch_many(query)
    }

    fn fetch_optional<'e, 'q: 'e, E>(
        self,
        query: E,
    ) -> futures::future::BoxFuture<
        'e,
        Result<Option<<Postgres as sqlx::Database>::Row>, sqlx::Error>,
    >
    where
        'c: 'e,
        E: 'q + sqlx::Execute<'q, Self::Database>,
    {
        (&mut self.0).fetch_optional(query)
    }

    fn prepare_with<'e, 'q: 'e>(
        self,
        sql: &'q str,
        parameters: &'e [<Postgres as sqlx::Database>::TypeInfo],
    ) -> futures::future::BoxFuture<
        'e,
        Result<<Postgres as sqlx::Database>::Statement<'q>, sqlx::Error>,
    >
    where
        'c: 'e,
    {
        (&mut self.0).prepare_with(sql, parameters)
    }

    fn describe<'e, 'q: 'e>(
        self,
        sql: &'q str,
    ) -> futures::future::BoxFuture<'e, Result<sqlx::Describe<Self::Database>, sqlx::Error>>
    where
        'c: 'e,
    {
        (&mut self.0).describe(sql)
    }
}

impl<'c, 'tx> super::Executor<'c> for &'c mut TxnContext<'tx> {}

impl crate::_priv::Sealed for &mut TxnContext<'_> {}
