/// Classified camera acquisition failure.
///
/// Every variant is terminal for the start attempt that produced it; nothing
/// here is retried automatically. `Display` renders the user-facing message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CaptureError {
    /// The host has no capture capability at all.
    Unavailable,
    /// The user (or host policy) declined camera access.
    PermissionDenied,
    DeviceNotFound,
    /// Another application holds the camera.
    DeviceBusy,
    /// The device cannot satisfy the requested profile.
    Unsupported(String),
    Other(String),
}

impl CaptureError {
    /// Short stable code for logs.
    pub fn code(&self) -> &'static str {
        match self {
            CaptureError::Unavailable => "capture_unavailable",
            CaptureError::PermissionDenied => "permission_denied",
            CaptureError::DeviceNotFound => "device_not_found",
            CaptureError::DeviceBusy => "device_busy",
            CaptureError::Unsupported(_) => "unsupported",
            CaptureError::Other(_) => "capture_failed",
        }
    }

    /// Whether the user can reasonably try again after acting on the message.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CaptureError::PermissionDenied
                | CaptureError::DeviceNotFound
                | CaptureError::DeviceBusy
                | CaptureError::Other(_)
        )
    }

    /// Classify an OS error raised while opening or configuring a device.
    pub fn from_io(err: &std::io::Error) -> Self {
        #[cfg(target_os = "linux")]
        {
            match err.raw_os_error() {
                Some(libc::EACCES) | Some(libc::EPERM) => return CaptureError::PermissionDenied,
                Some(libc::ENOENT) | Some(libc::ENODEV) | Some(libc::ENXIO) => {
                    return CaptureError::DeviceNotFound
                }
                Some(libc::EBUSY) => return CaptureError::DeviceBusy,
                Some(libc::EINVAL) => return CaptureError::Unsupported(err.to_string()),
                _ => {}
            }
        }
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => CaptureError::PermissionDenied,
            std::io::ErrorKind::NotFound => CaptureError::DeviceNotFound,
            _ => CaptureError::Other(err.to_string()),
        }
    }
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::Unavailable => write!(f, "Camera not supported on this device"),
            CaptureError::PermissionDenied => write!(
                f,
                "Camera permission denied. Please allow camera access and try again."
            ),
            CaptureError::DeviceNotFound => write!(f, "No camera found on this device."),
            CaptureError::DeviceBusy => {
                write!(f, "Camera is already in use by another application.")
            }
            CaptureError::Unsupported(reason) => {
                write!(f, "Camera does not support the requested format: {}", reason)
            }
            CaptureError::Other(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for CaptureError {}
