//! Named local endpoint: a named pipe on Windows, a Unix domain socket elsewhere.
//!
//! Both the server and the client resolve the same channel name through
//! [`endpoint_path`], so a mismatched name simply never connects.

use crate::error::ipc::IpcError;

use common::ErrorLocation;

use std::panic::Location;
use std::path::PathBuf;

use futures_util::FutureExt;
use log::debug;
use tokio::io::{AsyncRead, AsyncWrite, Interest, Ready};

/// A connected duplex byte stream.
pub trait IpcStream: AsyncRead + AsyncWrite + Unpin + Send {
    /// Whether the other end has hung up, judged from the reactor's readiness
    /// without reading any bytes. Never blocks.
    fn peer_closed(&self) -> bool;
}

pub type BoxedStream = Box<dyn IpcStream>;

/// Pending readiness means the peer is quiet but still there. Readable
/// readiness alone may just be unread bytes, so only a closed half or an
/// error counts as a hangup.
fn closed_from_readiness<F>(ready: F) -> bool
where
    F: Future<Output = std::io::Result<Ready>>,
{
    match ready.now_or_never() {
        None => false,
        Some(Ok(ready)) => ready.is_read_closed() || ready.is_write_closed(),
        Some(Err(_)) => true,
    }
}

/// Platform address for a channel name.
///
/// - Windows: `\\.\pipe\<name>`
/// - Unix: `<runtime dir>/<name>.sock`, or the name itself when it is already an
///   absolute path
pub fn endpoint_path(name: &str) -> PathBuf {
    #[cfg(windows)]
    {
        PathBuf::from(format!(r"\\.\pipe\{name}"))
    }

    #[cfg(not(windows))]
    {
        let as_path = PathBuf::from(name);
        if as_path.is_absolute() {
            return as_path;
        }
        dirs::runtime_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(format!("{name}.sock"))
    }
}

#[track_caller]
fn validate_name(name: &str) -> Result<(), IpcError> {
    if name.trim().is_empty() {
        return Err(IpcError::Endpoint {
            message: "Channel name must not be empty".to_string(),
            location: ErrorLocation::from(Location::caller()),
        });
    }
    Ok(())
}

/// Listening side of a channel. Serves one client per [`PipeListener::accept`].
pub struct PipeListener {
    name: String,
    inner: imp::Listener,
}

impl PipeListener {
    /// Bind the endpoint for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::Endpoint`] if the name is empty or the endpoint cannot
    /// be created (for instance another server already owns it).
    pub async fn bind(name: &str) -> Result<Self, IpcError> {
        validate_name(name)?;
        let path = endpoint_path(name);
        let inner = imp::Listener::bind(&path).await?;
        debug!("Bound endpoint {}", path.display());
        Ok(Self {
            name: name.to_string(),
            inner,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait for the next client.
    pub async fn accept(&mut self) -> Result<BoxedStream, IpcError> {
        self.inner.accept().await
    }
}

/// Open a client connection to `name`. A missing endpoint fails immediately.
pub async fn connect(name: &str) -> Result<BoxedStream, IpcError> {
    validate_name(name)?;
    imp::connect(&endpoint_path(name)).await
}

#[cfg(unix)]
mod imp {
    use super::{BoxedStream, Interest, IpcStream, closed_from_readiness};
    use crate::error::ipc::IpcError;

    use common::ErrorLocation;

    use std::io::ErrorKind;
    use std::panic::Location;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use log::{debug, warn};
    use tokio::net::{UnixListener, UnixStream};
    use tokio::time::timeout as TokioTimeout;

    const LIVENESS_CHECK_TIMEOUT: Duration = Duration::from_millis(250);

    impl IpcStream for UnixStream {
        fn peer_closed(&self) -> bool {
            closed_from_readiness(self.ready(Interest::READABLE))
        }
    }

    pub(super) struct Listener {
        listener: UnixListener,
        path: PathBuf,
    }

    impl Listener {
        pub(super) async fn bind(path: &Path) -> Result<Self, IpcError> {
            if path.exists() {
                // A live server still answers on the socket; a stale file does not.
                // The live server sees this check as a client that connects and
                // leaves without sending a frame.
                if let Ok(Ok(_live)) =
                    TokioTimeout(LIVENESS_CHECK_TIMEOUT, UnixStream::connect(path)).await
                {
                    return Err(IpcError::Endpoint {
                        message: format!("Endpoint already in use: {}", path.display()),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }
                debug!("Removing stale socket {}", path.display());
                std::fs::remove_file(path).map_err(|e| IpcError::Endpoint {
                    message: format!("Failed to remove stale socket {}: {e}", path.display()),
                    location: ErrorLocation::from(Location::caller()),
                })?;
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let listener = UnixListener::bind(path).map_err(|e| IpcError::Endpoint {
                message: format!("Failed to bind {}: {e}", path.display()),
                location: ErrorLocation::from(Location::caller()),
            })?;

            Ok(Self {
                listener,
                path: path.to_path_buf(),
            })
        }

        pub(super) async fn accept(&mut self) -> Result<BoxedStream, IpcError> {
            let (stream, _addr) = self.listener.accept().await?;
            Ok(Box::new(stream))
        }
    }

    impl Drop for Listener {
        fn drop(&mut self) {
            match std::fs::remove_file(&self.path) {
                Err(e) if e.kind() != ErrorKind::NotFound => {
                    warn!("Failed to remove socket {}: {e}", self.path.display());
                }
                _ => {}
            }
        }
    }

    pub(super) async fn connect(path: &Path) -> Result<BoxedStream, IpcError> {
        let stream = UnixStream::connect(path).await?;
        Ok(Box::new(stream))
    }
}

#[cfg(windows)]
mod imp {
    use super::{BoxedStream, Interest, IpcStream, closed_from_readiness};
    use crate::error::ipc::IpcError;

    use common::ErrorLocation;

    use std::panic::Location;
    use std::path::Path;

    use tokio::net::windows::named_pipe::{
        ClientOptions, NamedPipeClient, NamedPipeServer, ServerOptions,
    };

    impl IpcStream for NamedPipeClient {
        fn peer_closed(&self) -> bool {
            closed_from_readiness(self.ready(Interest::READABLE))
        }
    }

    impl IpcStream for NamedPipeServer {
        fn peer_closed(&self) -> bool {
            closed_from_readiness(self.ready(Interest::READABLE))
        }
    }

    pub(super) struct Listener {
        path: String,
        // The next instance clients can connect to; created eagerly so a client
        // never sees "not found" while the server is listening.
        pending: Option<NamedPipeServer>,
    }

    impl Listener {
        pub(super) async fn bind(path: &Path) -> Result<Self, IpcError> {
            let path = path.to_string_lossy().into_owned();
            let first = ServerOptions::new()
                .first_pipe_instance(true)
                .create(&path)
                .map_err(|e| IpcError::Endpoint {
                    message: format!("Failed to create pipe {path}: {e}"),
                    location: ErrorLocation::from(Location::caller()),
                })?;
            Ok(Self {
                path,
                pending: Some(first),
            })
        }

        pub(super) async fn accept(&mut self) -> Result<BoxedStream, IpcError> {
            let server = match self.pending.take() {
                Some(server) => server,
                None => ServerOptions::new().create(&self.path)?,
            };
            server.connect().await?;
            Ok(Box::new(server))
        }
    }

    pub(super) async fn connect(path: &Path) -> Result<BoxedStream, IpcError> {
        let client = ClientOptions::new().open(path)?;
        Ok(Box::new(client))
    }
}
