//! Docker client module using bollard.

use bollard::Docker;

/// Connects to Docker using the default connection method
/// (Unix socket on Linux/macOS, named pipe on Windows).
///
/// The connection is lazy: this only fails on a malformed `DOCKER_HOST`.
/// An unreachable daemon surfaces on the first request.
pub fn connect() -> Result<Docker, bollard::errors::Error> {
    Docker::connect_with_local_defaults()
}
