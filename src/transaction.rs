//! Transaction scopes
//!
//! A [`TransactionScope`] wraps one physical database transaction behind the
//! lifecycle `Unopened -> Open -> {Committed | RolledBack} -> Disposed`.
//! Nested scopes join the outer transaction: only the outermost scope's
//! commit decision touches the database, and a scope disposed without a
//! commit request rolls back; an abandoned scope never silently commits.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tokio::sync::Mutex;

use crate::error::{Result, StoreError};

/// Lifecycle state of a scope chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeState {
    Unopened,
    Open,
    Disposed,
}

/// How a dispose resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeOutcome {
    /// The physical transaction committed
    Committed,
    /// The physical transaction rolled back
    RolledBack,
    /// An inner scope closed; the decision stays with the outer scope
    Deferred,
}

/// Physical transaction operations a scope drives
#[async_trait]
pub trait TransactionBackend: Send {
    async fn begin(&mut self) -> Result<()>;
    async fn commit(&mut self) -> Result<()>;
    async fn rollback(&mut self) -> Result<()>;
    /// Force the connection back to a known state after a failed rollback
    fn reset(&mut self);
}

/// Backend over a pooled PostgreSQL connection
pub struct PgBackend {
    pool: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, tx: None }
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        let tx = self
            .tx
            .as_mut()
            .ok_or_else(|| StoreError::transaction_state("no open transaction"))?;
        let result = sqlx::query(sql).execute(&mut **tx).await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl TransactionBackend for PgBackend {
    async fn begin(&mut self) -> Result<()> {
        if self.tx.is_some() {
            return Err(StoreError::transaction_state("transaction already begun"));
        }
        self.tx = Some(self.pool.begin().await?);
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| StoreError::transaction_state("no open transaction"))?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| StoreError::transaction_state("no open transaction"))?;
        tx.rollback().await?;
        Ok(())
    }

    fn reset(&mut self) {
        // Dropping an open sqlx transaction queues a rollback on the
        // connection before it returns to the pool.
        self.tx = None;
    }
}

struct ScopeCore<B> {
    backend: B,
    state: ScopeState,
    depth: u32,
}

/// One scope over a shared transaction chain
pub struct TransactionScope<B: TransactionBackend> {
    core: Arc<Mutex<ScopeCore<B>>>,
    outermost: bool,
    commit_requested: bool,
}

impl<B: TransactionBackend> std::fmt::Debug for TransactionScope<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionScope")
            .field("outermost", &self.outermost)
            .field("commit_requested", &self.commit_requested)
            .finish()
    }
}

impl TransactionScope<PgBackend> {
    /// Open an outermost scope over a pooled connection
    pub async fn begin(pool: &PgPool) -> Result<Self> {
        Self::open(PgBackend::new(pool.clone())).await
    }

    /// Run a statement on the scope's transaction
    pub async fn execute(&self, sql: &str) -> Result<u64> {
        let mut core = self.core.lock().await;
        if core.state != ScopeState::Open {
            return Err(StoreError::transaction_state("scope is not open"));
        }
        core.backend.execute(sql).await
    }
}

impl<B: TransactionBackend> TransactionScope<B> {
    /// Create an unopened scope over a backend
    pub fn new(backend: B) -> Self {
        Self {
            core: Arc::new(Mutex::new(ScopeCore {
                backend,
                state: ScopeState::Unopened,
                depth: 0,
            })),
            outermost: true,
            commit_requested: false,
        }
    }

    /// Create and immediately open an outermost scope
    pub async fn open(backend: B) -> Result<Self> {
        let mut scope = Self::new(backend);
        scope.open_scope().await?;
        Ok(scope)
    }

    /// Begin the physical transaction; valid once, on the outermost scope
    pub async fn open_scope(&mut self) -> Result<()> {
        if !self.outermost {
            return Err(StoreError::transaction_state(
                "inner scopes are opened by nested()",
            ));
        }
        let mut core = self.core.lock().await;
        if core.state != ScopeState::Unopened {
            return Err(StoreError::transaction_state("scope was already opened"));
        }
        core.backend.begin().await?;
        core.state = ScopeState::Open;
        core.depth = 1;
        Ok(())
    }

    /// Hand out an inner scope joining this transaction
    pub async fn nested(&self) -> Result<TransactionScope<B>> {
        let mut core = self.core.lock().await;
        if core.state != ScopeState::Open {
            return Err(StoreError::transaction_state(
                "cannot nest: scope is not open",
            ));
        }
        core.depth += 1;
        Ok(TransactionScope {
            core: self.core.clone(),
            outermost: false,
            commit_requested: false,
        })
    }

    /// Mark intent to commit; the physical commit happens on dispose
    pub fn commit(&mut self) {
        self.commit_requested = true;
    }

    /// Current lifecycle state of the scope chain
    pub async fn state(&self) -> ScopeState {
        self.core.lock().await.state
    }

    /// Close the scope.
    ///
    /// Inner scopes only decrement the chain depth. The outermost scope
    /// commits when commit was requested and rolls back otherwise. A failed
    /// rollback is logged and the backend reset instead of masking the
    /// original outcome with a secondary error.
    pub async fn dispose(self) -> Result<ScopeOutcome> {
        let mut core = self.core.lock().await;
        if core.state != ScopeState::Open {
            return Err(StoreError::transaction_state("scope is not open"));
        }

        if !self.outermost {
            core.depth -= 1;
            return Ok(ScopeOutcome::Deferred);
        }

        if core.depth != 1 {
            return Err(StoreError::transaction_state(
                "inner scopes are still open",
            ));
        }
        core.depth = 0;

        if self.commit_requested {
            match core.backend.commit().await {
                Ok(()) => {
                    core.state = ScopeState::Disposed;
                    Ok(ScopeOutcome::Committed)
                }
                Err(e) => {
                    core.backend.reset();
                    core.state = ScopeState::Disposed;
                    Err(e)
                }
            }
        } else {
            if let Err(e) = core.backend.rollback().await {
                tracing::error!(error = %e, "rollback failed; resetting connection");
                core.backend.reset();
            }
            core.state = ScopeState::Disposed;
            Ok(ScopeOutcome::RolledBack)
        }
    }
}
