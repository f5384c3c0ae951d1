//! Post-connect handshake
//!
//! Runs the administrative commands that must succeed before a client is
//! handed out. Any failure closes the pool.

use crate::connection::{split_host_port, ConnectionOptions};
use crate::error::HandshakeStep;
use crate::pool::CommandPool;
use crate::protocol::constants::admin;
use crate::protocol::Cmd;
use crate::{Error, Result};

/// Configure a freshly built pool
///
/// Steps, in order:
/// 1. `CONFIG SET cluster-announce-ip <host>`, with `host` split from `addr`
/// 2. `CONFIG SET masterauth <password>`, only when ACL is enabled
///
/// A malformed `addr` closes the pool without issuing any command. On any
/// failure the pool is closed and `Error::Handshake` names the failing step.
pub async fn post_connect<P>(pool: &P, addr: &str, opts: &ConnectionOptions) -> Result<()>
where
    P: CommandPool + ?Sized,
{
    let deadline = opts.dial_read_timeout() + opts.dial_write_timeout();

    let host = match split_host_port(addr) {
        Ok((host, _port)) => host,
        Err(e) => return Err(abort(pool, HandshakeStep::SplitAddress, e).await),
    };

    let announce = Cmd::config_set(admin::CLUSTER_ANNOUNCE_IP, host);
    if let Err(e) = pool.exec(&announce, deadline).await {
        return Err(abort(pool, HandshakeStep::AnnounceIp, e).await);
    }
    tracing::debug!(command = %announce, "announced cluster address");

    if opts.acl_enabled() {
        let masterauth = Cmd::config_set(admin::MASTERAUTH, opts.password().to_owned());
        if let Err(e) = pool.exec(&masterauth, deadline).await {
            return Err(abort(pool, HandshakeStep::MasterAuth, e).await);
        }
        tracing::debug!("propagated replication secret");
    }

    Ok(())
}

/// Close the pool after a failed step and build the reported error
async fn abort<P>(pool: &P, step: HandshakeStep, source: Error) -> Error
where
    P: CommandPool + ?Sized,
{
    crate::metrics::counters::handshake_failed(step);
    tracing::warn!(%step, error = %source, "post-connect step failed, closing pool");

    if let Err(e) = pool.close().await {
        tracing::warn!(%step, error = %e, "failed to close pool after handshake failure");
    }

    Error::Handshake {
        step,
        source: Box::new(source),
    }
}
