//! Hook for taking over the host's resolver configuration. The default
//! implementation is a no-op; a platform-specific implementation would
//! rewrite `/etc/resolv.conf` (or the platform equivalent) to point at
//! this server and restore it on shutdown.

/// Collaborator invoked around the server's lifetime to point the host's
/// system resolver at this process and restore it afterward. Kept as a
/// trait rather than inline logic so platform-specific implementations
/// can be swapped in without touching the server loop.
pub trait HostDnsRedirect: Send + Sync {
    /// Points the host's resolver at this server. Returns `false` if the
    /// redirect could not be performed; the server logs a warning and
    /// continues running rather than treating this as fatal.
    fn save_and_redirect_to_local(&self) -> bool;

    /// Restores whatever the host's resolver pointed at before
    /// `save_and_redirect_to_local` ran.
    fn restore_original(&self) -> bool;
}

/// Does nothing in either direction — used when the server is not
/// expected to own the host's default resolver, e.g. when it's bound to
/// a non-standard port for testing.
#[derive(Debug, Default)]
pub struct NoopHostDns;

impl HostDnsRedirect for NoopHostDns {
    fn save_and_redirect_to_local(&self) -> bool {
        true
    }

    fn restore_original(&self) -> bool {
        true
    }
}
