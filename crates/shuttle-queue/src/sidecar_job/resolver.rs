//! Lookups the sidecar job needs from the language-server host.

use shuttle_session::ClientSessionState;

/// Host-provided view of client connections.
///
/// Injected into [`SidecarQueueJob`](super::SidecarQueueJob) so the job never
/// reaches for global server state.
pub trait ConnectionResolver: Send + Sync {
    /// Handle the host uses to represent a client connection.
    type Connection;

    /// Looks up a live connection by identifier.
    fn connection_from_connection_id(&self, connection_id: &str) -> Option<Self::Connection>;

    /// Base sidecar arguments derived from the connection's settings, in
    /// order.
    fn sidecar_args_from_connection(&self, connection: &Self::Connection) -> Vec<String>;

    /// Session state owning the connection's object cache.
    fn session_state_from_connection(
        &self,
        connection: &Self::Connection,
    ) -> Option<ClientSessionState>;
}
