//! Bounded connection pool with background reconnect

use super::backoff::ReconnectBackoff;
use super::config::PoolConfig;
use super::connector::{Connector, Duplex};
use crate::protocol::{Cmd, Frame};
use crate::{Error, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, MutexGuard, Notify};
use tokio::task::JoinHandle;
use tracing::Instrument;

/// One pooled connection position
///
/// The slot mutex serialises every command on the connection, which is
/// what gives a single-slot pool issue-order delivery.
struct Slot<D> {
    id: usize,
    conn: Mutex<Option<D>>,
    /// Wakes the slot's reconnect loop
    broken: Notify,
    /// Wakes callers waiting for the slot to be refilled
    restored: Notify,
}

struct Shared<C: Connector> {
    addr: String,
    connector: C,
    config: PoolConfig,
    slots: Vec<Slot<C::Conn>>,
    next: AtomicUsize,
    closed: AtomicBool,
}

/// A fixed-size set of live connections to one address
///
/// Callers never address a connection directly. Dropped connections are
/// re-established in the background with bounded exponential backoff.
pub struct Pool<C: Connector> {
    shared: Arc<Shared<C>>,
    tasks: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl<C: Connector> Pool<C> {
    /// Build a pool, opening every connection up front
    ///
    /// Construction is bounded by `config.init_timeout`. Any failure closes
    /// the connections opened so far; no partial pool is returned.
    pub async fn build(addr: &str, connector: C, config: PoolConfig) -> Result<Self> {
        config.validate()?;

        let init_timeout = config.init_timeout;
        let opened = tokio::time::timeout(init_timeout, open_all(&connector, addr, config.size))
            .await
            .map_err(|_| Error::Timeout(init_timeout))
            .and_then(|r| r)
            .map_err(|e| Error::PoolInit {
                addr: addr.to_string(),
                source: Box::new(e),
            })?;

        let slots = opened
            .into_iter()
            .enumerate()
            .map(|(id, conn)| Slot {
                id,
                conn: Mutex::new(Some(conn)),
                broken: Notify::new(),
                restored: Notify::new(),
            })
            .collect();

        let shared = Arc::new(Shared {
            addr: addr.to_string(),
            connector,
            config,
            slots,
            next: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        });

        let mut tasks = Vec::with_capacity(shared.slots.len() + 1);
        for id in 0..shared.slots.len() {
            let span = tracing::debug_span!("reconnect", addr = %shared.addr, slot = id);
            tasks.push(tokio::spawn(reconnect_loop(shared.clone(), id).instrument(span)));
        }
        if let Some(interval) = shared.config.ping_interval {
            let span = tracing::debug_span!("ping", addr = %shared.addr);
            tasks.push(tokio::spawn(ping_loop(shared.clone(), interval).instrument(span)));
        }

        tracing::debug!(addr = %shared.addr, size = shared.slots.len(), "pool ready");

        Ok(Self {
            shared,
            tasks: std::sync::Mutex::new(tasks),
        })
    }

    /// Address every connection points at
    pub fn addr(&self) -> &str {
        &self.shared.addr
    }

    /// Number of slots
    pub fn size(&self) -> usize {
        self.shared.slots.len()
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Number of slots currently holding a usable connection
    pub async fn live_connections(&self) -> usize {
        let mut live = 0;
        for slot in &self.shared.slots {
            if slot.conn.lock().await.as_ref().is_some_and(|c| c.is_usable()) {
                live += 1;
            }
        }
        live
    }

    /// Execute one command, bounded by `deadline`
    ///
    /// The deadline covers waiting for a slot, waiting for a reconnect, and
    /// the round trip itself.
    pub async fn exec(&self, cmd: &Cmd, deadline: Duration) -> Result<Frame> {
        if self.shared.is_closed() {
            return Err(Error::PoolClosed);
        }

        let start = Instant::now();
        let slot = self.shared.pick();
        let result = tokio::time::timeout(deadline, self.shared.exec_on(slot, cmd))
            .await
            .unwrap_or(Err(Error::Timeout(deadline)));

        let outcome = match &result {
            Ok(_) => crate::metrics::labels::OUTCOME_OK,
            Err(Error::Server(_)) => crate::metrics::labels::OUTCOME_SERVER_ERROR,
            Err(_) => crate::metrics::labels::OUTCOME_CONNECTION_ERROR,
        };
        crate::metrics::counters::command_completed(cmd.name(), outcome);
        crate::metrics::histograms::command_duration(cmd.name(), start.elapsed().as_millis() as u64);

        result
    }

    /// Close every connection and stop background activity
    ///
    /// Closing is not idempotent: a second call returns `Error::PoolClosed`.
    pub async fn close(&self) -> Result<()> {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return Err(Error::PoolClosed);
        }

        self.abort_tasks();

        for slot in &self.shared.slots {
            // Waiters register under the slot lock, so notifying under it reaches all of them
            let mut guard = slot.conn.lock().await;
            slot.restored.notify_waiters();
            if let Some(mut conn) = guard.take() {
                if let Err(e) = conn.shutdown().await {
                    tracing::debug!(slot = slot.id, error = %e, "error shutting down connection");
                }
            }
        }

        crate::metrics::counters::pool_closed();
        tracing::debug!(addr = %self.shared.addr, "pool closed");
        Ok(())
    }

    fn abort_tasks(&self) {
        let mut tasks = match self.tasks.lock() {
            Ok(tasks) => tasks,
            Err(poisoned) => poisoned.into_inner(),
        };
        for task in tasks.drain(..) {
            task.abort();
        }
    }
}

impl<C: Connector> Drop for Pool<C> {
    fn drop(&mut self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        self.abort_tasks();
    }
}

impl<C: Connector> std::fmt::Debug for Pool<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("addr", &self.shared.addr)
            .field("size", &self.shared.slots.len())
            .field("closed", &self.shared.is_closed())
            .finish()
    }
}

impl<C: Connector> Shared<C> {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Round-robin slot selection
    fn pick(&self) -> &Slot<C::Conn> {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        &self.slots[n % self.slots.len()]
    }

    async fn exec_on(&self, slot: &Slot<C::Conn>, cmd: &Cmd) -> Result<Frame> {
        loop {
            let mut guard = slot.conn.lock().await;
            if self.is_closed() {
                return Err(Error::PoolClosed);
            }

            if let Some(conn) = guard.as_mut().filter(|c| c.is_usable()) {
                let result = conn.round_trip(cmd).await;
                if let Err(e) = &result {
                    if e.breaks_connection() {
                        self.discard(slot, &mut guard, e);
                    }
                }
                return result;
            }

            if guard.is_some() {
                // A previous call was abandoned mid-flight
                self.discard(slot, &mut guard, &Error::ConnectionClosed);
            }
            let restored = slot.restored.notified();
            drop(guard);
            restored.await;
        }
    }

    /// Drop the slot's connection and hand the slot to its reconnect loop
    fn discard(&self, slot: &Slot<C::Conn>, guard: &mut MutexGuard<'_, Option<C::Conn>>, cause: &Error) {
        if guard.take().is_some() {
            tracing::warn!(addr = %self.addr, slot = slot.id, error = %cause, "connection dropped");
            crate::metrics::counters::connection_dropped();
            slot.broken.notify_one();
        }
    }
}

async fn open_all<C: Connector>(connector: &C, addr: &str, size: usize) -> Result<Vec<C::Conn>> {
    let mut opened = Vec::with_capacity(size);
    for _ in 0..size {
        match connector.connect(addr).await {
            Ok(conn) => opened.push(conn),
            Err(e) => {
                for mut conn in opened {
                    let _ = conn.shutdown().await;
                }
                return Err(e);
            }
        }
    }
    Ok(opened)
}

/// Re-establish a slot's connection whenever it is discarded
async fn reconnect_loop<C: Connector>(shared: Arc<Shared<C>>, id: usize) {
    let slot = &shared.slots[id];
    let mut backoff = ReconnectBackoff::new(
        shared.config.min_reconnect_interval,
        shared.config.max_reconnect_interval,
    );

    loop {
        slot.broken.notified().await;
        backoff.reset();

        loop {
            if shared.is_closed() {
                return;
            }

            let delay = backoff.next_delay();
            crate::metrics::counters::reconnect_attempted();
            crate::metrics::histograms::reconnect_delay(delay.as_millis() as u64);
            tokio::time::sleep(delay).await;
            if shared.is_closed() {
                return;
            }

            match shared.connector.connect(&shared.addr).await {
                Ok(mut conn) => {
                    let mut guard = slot.conn.lock().await;
                    if shared.is_closed() || guard.is_some() {
                        drop(guard);
                        let _ = conn.shutdown().await;
                        if shared.is_closed() {
                            return;
                        }
                    } else {
                        *guard = Some(conn);
                        drop(guard);
                    }
                    tracing::info!(attempts = backoff.attempts(), "connection re-established");
                    slot.restored.notify_waiters();
                    break;
                }
                Err(e) => {
                    tracing::warn!(
                        attempt = backoff.attempts(),
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "reconnect failed"
                    );
                }
            }
        }
    }
}

/// Periodically ping idle connections and discard dead ones
async fn ping_loop<C: Connector>(shared: Arc<Shared<C>>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await;

    let ping = Cmd::ping();
    loop {
        ticker.tick().await;
        if shared.is_closed() {
            return;
        }

        for slot in &shared.slots {
            // A busy slot has just proven itself alive
            let Ok(mut guard) = slot.conn.try_lock() else {
                continue;
            };
            let failure = match guard.as_mut() {
                Some(conn) if conn.is_usable() => match conn.round_trip(&ping).await {
                    Err(e) if e.breaks_connection() => Some(e),
                    _ => None,
                },
                Some(_) => Some(Error::ConnectionClosed),
                None => None,
            };
            if let Some(e) = failure {
                shared.discard(slot, &mut guard, &e);
            }
        }
    }
}
