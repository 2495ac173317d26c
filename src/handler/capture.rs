//! Screen capture capability behind `TAKE_SCREENSHOT`.

use std::path::Path;
use std::sync::Arc;

use crate::error::HandlerError;

/// Captures the screen into an image file.
///
/// Called on the blocking thread pool.
pub trait ScreenCapture: Send + Sync + 'static {
    fn capture_to(&self, path: &Path) -> Result<(), HandlerError>;
}

/// Backend for hosts without screen capture support.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoScreenCapture;

impl ScreenCapture for NoScreenCapture {
    fn capture_to(&self, _path: &Path) -> Result<(), HandlerError> {
        Err(HandlerError::Unsupported(
            "Screen capture is not available on this agent".to_string(),
        ))
    }
}

/// Captures the primary display using the `screenshots` crate.
#[cfg(feature = "screenshots")]
#[derive(Debug, Default, Clone, Copy)]
pub struct DisplayCapture;

#[cfg(feature = "screenshots")]
impl ScreenCapture for DisplayCapture {
    fn capture_to(&self, path: &Path) -> Result<(), HandlerError> {
        use screenshots::image::DynamicImage;
        use screenshots::Screen;

        let screens = Screen::all()
            .map_err(|e| HandlerError::Unsupported(format!("Failed to list screens: {}", e)))?;
        let screen = screens
            .first()
            .ok_or_else(|| HandlerError::Unsupported("No screen detected".to_string()))?;
        let image = screen
            .capture()
            .map_err(|e| HandlerError::Unsupported(format!("Screen capture failed: {}", e)))?;

        // JPEG has no alpha channel.
        DynamicImage::ImageRgba8(image)
            .to_rgb8()
            .save(path)
            .map_err(|e| {
                HandlerError::io(
                    format!("Failed to save screenshot to {}", path.display()),
                    std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
                )
            })
    }
}

/// The capture backend compiled into this build.
pub fn default_capture() -> Arc<dyn ScreenCapture> {
    #[cfg(feature = "screenshots")]
    {
        Arc::new(DisplayCapture)
    }

    #[cfg(not(feature = "screenshots"))]
    {
        Arc::new(NoScreenCapture)
    }
}
