//! Icon resolution with an on-disk cache
//!
//! Each executable path maps to `<cache dir>/<blake3 hex of the path>.png`.
//! The key is the path string, not the file contents, and entries are never
//! invalidated. Extraction runs on a helper thread bounded by a timeout;
//! every failure degrades to "no icon".

use crate::error::{InitWindowError, Result};
use crossbeam::channel::{self, RecvTimeoutError};
use image::{ImageOutputFormat, RgbaImage};
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Default bound on a single extraction
pub const DEFAULT_EXTRACTION_TIMEOUT: Duration = Duration::from_secs(5);

/// OS-specific icon extraction
pub trait IconExtractor: Send + Sync {
    /// `Ok(None)` when the executable embeds no icon
    fn extract(&self, path: &Path) -> Result<Option<RgbaImage>>;
}

/// Extractor for platforms without icon support
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIconExtractor;

impl IconExtractor for NoIconExtractor {
    fn extract(&self, _path: &Path) -> Result<Option<RgbaImage>> {
        Ok(None)
    }
}

/// Best extractor available on this platform
pub fn platform_extractor() -> Arc<dyn IconExtractor> {
    #[cfg(windows)]
    {
        Arc::new(windows_shell::ShellIconExtractor)
    }
    #[cfg(not(windows))]
    {
        Arc::new(NoIconExtractor)
    }
}

/// Hex digest used as the cache file stem for `path`
pub fn cache_key(path: &Path) -> String {
    blake3::hash(path.to_string_lossy().as_bytes())
        .to_hex()
        .to_string()
}

pub struct IconResolver {
    cache_dir: PathBuf,
    extractor: Arc<dyn IconExtractor>,
    timeout: Duration,
}

impl IconResolver {
    pub fn new(cache_dir: impl Into<PathBuf>, extractor: Arc<dyn IconExtractor>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            extractor,
            timeout: DEFAULT_EXTRACTION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn cache_path(&self, path: &Path) -> PathBuf {
        self.cache_dir.join(format!("{}.png", cache_key(path)))
    }

    /// Cached PNG for `path`, extracting and caching it on a miss.
    /// Never fails: problems are logged and yield `None`.
    pub fn resolve(&self, path: &Path) -> Option<PathBuf> {
        let target = self.cache_path(path);
        if target.is_file() {
            tracing::debug!("Icon cache hit for {}", path.display());
            return Some(target);
        }

        let image = match self.extract_with_timeout(path) {
            Ok(Some(image)) => image,
            Ok(None) => {
                tracing::debug!("No icon embedded in {}", path.display());
                return None;
            }
            Err(e) => {
                tracing::warn!("Icon extraction failed: {}", e);
                return None;
            }
        };

        match self.persist(&target, &image) {
            Ok(()) => Some(target),
            Err(e) => {
                tracing::warn!("Failed to cache icon for {}: {}", path.display(), e);
                None
            }
        }
    }

    fn extract_with_timeout(&self, path: &Path) -> Result<Option<RgbaImage>> {
        let (tx, rx) = channel::bounded(1);
        let extractor = Arc::clone(&self.extractor);
        let owned = path.to_path_buf();

        // A timed-out extraction keeps its thread until the OS call returns;
        // the result is then dropped with the channel.
        thread::Builder::new()
            .name("icon-extract".to_string())
            .spawn(move || {
                let _ = tx.send(extractor.extract(&owned));
            })
            .map_err(|e| InitWindowError::IconExtraction {
                path: path.to_path_buf(),
                reason: format!("failed to spawn extraction thread: {e}"),
            })?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(InitWindowError::IconExtraction {
                path: path.to_path_buf(),
                reason: format!("timed out after {:?}", self.timeout),
            }),
            Err(RecvTimeoutError::Disconnected) => Err(InitWindowError::IconExtraction {
                path: path.to_path_buf(),
                reason: "extractor thread panicked".to_string(),
            }),
        }
    }

    /// Encode as PNG and move into place atomically; concurrent writers of the
    /// same entry each rename a complete file, last one wins.
    fn persist(&self, target: &Path, image: &RgbaImage) -> Result<()> {
        fs::create_dir_all(&self.cache_dir).map_err(|e| InitWindowError::io(&self.cache_dir, e))?;

        let mut encoded = Cursor::new(Vec::new());
        image.write_to(&mut encoded, ImageOutputFormat::Png)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.cache_dir)
            .map_err(|e| InitWindowError::io(&self.cache_dir, e))?;
        tmp.write_all(encoded.get_ref())
            .map_err(|e| InitWindowError::io(tmp.path(), e))?;
        tmp.persist(target)
            .map_err(|e| InitWindowError::io(target, e.error))?;

        tracing::debug!("Cached icon {}", target.display());
        Ok(())
    }
}

#[cfg(windows)]
mod windows_shell {
    //! Icon extraction through the Windows shell and GDI

    use super::IconExtractor;
    use crate::error::{InitWindowError, Result};
    use image::RgbaImage;
    use std::ffi::c_void;
    use std::os::windows::ffi::OsStrExt;
    use std::path::Path;
    use windows::core::PCWSTR;
    use windows::Win32::Graphics::Gdi::{
        DeleteObject, GetDC, GetDIBits, GetObjectW, ReleaseDC, BITMAP, BITMAPINFO,
        BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS, HGDIOBJ,
    };
    use windows::Win32::UI::Shell::ExtractIconExW;
    use windows::Win32::UI::WindowsAndMessaging::{DestroyIcon, GetIconInfo, HICON, ICONINFO};

    pub struct ShellIconExtractor;

    impl IconExtractor for ShellIconExtractor {
        fn extract(&self, path: &Path) -> Result<Option<RgbaImage>> {
            let wide: Vec<u16> = path.as_os_str().encode_wide().chain(Some(0)).collect();
            let mut icon = HICON::default();

            let count = unsafe { ExtractIconExW(PCWSTR(wide.as_ptr()), 0, Some(&mut icon as *mut HICON), None, 1) };
            if count == 0 || icon.is_invalid() {
                return Ok(None);
            }

            let image = unsafe { icon_to_rgba(icon) };
            unsafe {
                let _ = DestroyIcon(icon);
            }

            image.map_err(|reason| InitWindowError::IconExtraction {
                path: path.to_path_buf(),
                reason,
            })
        }
    }

    unsafe fn icon_to_rgba(icon: HICON) -> std::result::Result<Option<RgbaImage>, String> {
        let mut info = ICONINFO::default();
        GetIconInfo(icon, &mut info).map_err(|e| format!("GetIconInfo failed: {e}"))?;

        let color = info.hbmColor;
        let mask = info.hbmMask;
        let result = (|| {
            if color.is_invalid() {
                // Monochrome icon, nothing worth showing
                return Ok(None);
            }

            let mut bitmap = BITMAP::default();
            let written = GetObjectW(
                HGDIOBJ(color.0),
                std::mem::size_of::<BITMAP>() as i32,
                Some(&mut bitmap as *mut BITMAP as *mut c_void),
            );
            if written == 0 || bitmap.bmWidth <= 0 || bitmap.bmHeight <= 0 {
                return Err("GetObjectW returned no bitmap".to_string());
            }

            let width = bitmap.bmWidth as u32;
            let height = bitmap.bmHeight as u32;

            let mut header = BITMAPINFO::default();
            header.bmiHeader = BITMAPINFOHEADER {
                biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: width as i32,
                // Negative height: top-down rows
                biHeight: -(height as i32),
                biPlanes: 1,
                biBitCount: 32,
                biCompression: BI_RGB.0,
                ..Default::default()
            };

            let mut pixels = vec![0u8; (width * height * 4) as usize];
            let dc = GetDC(None);
            let lines = GetDIBits(
                dc,
                color,
                0,
                height,
                Some(pixels.as_mut_ptr() as *mut c_void),
                &mut header,
                DIB_RGB_COLORS,
            );
            ReleaseDC(None, dc);
            if lines == 0 {
                return Err("GetDIBits failed".to_string());
            }

            // BGRA -> RGBA; icons without an alpha channel report all zeros
            let has_alpha = pixels.chunks_exact(4).any(|px| px[3] != 0);
            for px in pixels.chunks_exact_mut(4) {
                px.swap(0, 2);
                if !has_alpha {
                    px[3] = 0xFF;
                }
            }

            Ok(RgbaImage::from_raw(width, height, pixels))
        })();

        if !color.is_invalid() {
            let _ = DeleteObject(HGDIOBJ(color.0));
        }
        if !mask.is_invalid() {
            let _ = DeleteObject(HGDIOBJ(mask.0));
        }

        result
    }
}
