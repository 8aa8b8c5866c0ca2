use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create cache directory {path}: {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

const CHUNK_SIZE: usize = 1024 * 1024;

/// Locates model files, downloading them into a cache on first use.
///
/// Lookup order: cache directory, optional bundled directory, then download
/// into the cache.
pub struct ModelResolver {
    cache_dir: PathBuf,
    bundled_dir: Option<PathBuf>,
}

impl ModelResolver {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            bundled_dir: None,
        }
    }

    /// Resolver rooted at the platform cache directory.
    pub fn with_default_cache() -> Result<Self, ModelResolveError> {
        Ok(Self::new(default_cache_dir()?))
    }

    pub fn with_bundled_dir(mut self, dir: PathBuf) -> Self {
        self.bundled_dir = Some(dir);
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns a local path to `name`, fetching it from `url` if needed.
    pub fn resolve(
        &self,
        name: &str,
        url: &str,
        progress: Option<ProgressFn>,
    ) -> Result<PathBuf, ModelResolveError> {
        if let Some(path) = self.find_local(name) {
            log::debug!("Using local model {}", path.display());
            return Ok(path);
        }

        fs::create_dir_all(&self.cache_dir).map_err(|e| ModelResolveError::CacheDir {
            path: self.cache_dir.clone(),
            source: e,
        })?;
        let dest = self.cache_dir.join(name);
        log::info!("Downloading {name} from {url}");
        download(url, &dest, progress)?;
        Ok(dest)
    }

    fn find_local(&self, name: &str) -> Option<PathBuf> {
        std::iter::once(self.cache_dir.as_path())
            .chain(self.bundled_dir.as_deref())
            .map(|dir| dir.join(name))
            .find(|path| path.is_file())
    }
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/Rollcall/models/`
/// - Linux: `$XDG_CACHE_HOME/Rollcall/models/` or `~/.cache/Rollcall/models/`
/// - Windows: `%LOCALAPPDATA%/Rollcall/models/`
pub fn default_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    let base = dirs::data_dir();
    #[cfg(not(target_os = "macos"))]
    let base = dirs::cache_dir();

    base.map(|d| d.join("Rollcall").join("models"))
        .ok_or(ModelResolveError::NoCacheDir)
}

/// Streams `url` into `dest` through a `.part` file renamed on success.
fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let download_err = |source| ModelResolveError::Download {
        url: url.to_string(),
        source,
    };
    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(download_err)?;
    let total = response.content_length().unwrap_or(0);

    let temp_path = dest.with_extension("part");
    let write_err = |source| ModelResolveError::Write {
        path: temp_path.clone(),
        source,
    };

    let result: Result<(), ModelResolveError> = (|| {
        let mut file = fs::File::create(&temp_path).map_err(write_err)?;
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut downloaded: u64 = 0;
        loop {
            let n = response.read(&mut buf).map_err(write_err)?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n]).map_err(write_err)?;
            downloaded += n as u64;
            if let Some(ref cb) = progress {
                cb(downloaded, total);
            }
        }
        file.flush().map_err(write_err)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    fs::rename(&temp_path, dest).map_err(|e| ModelResolveError::Write {
        path: dest.to_path_buf(),
        source: e,
    })
}
