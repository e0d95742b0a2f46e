use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use log::{debug, warn};

/// Where fetched pages are kept between runs. The cache is handed to
/// the session explicitly and keyed by URL; a miss is never an error,
/// only a reason to hit the network again.
pub trait PageCache {
    fn load(&self, url: &str) -> Option<String>;
    fn store(&self, url: &str, body: &str);
}

/// Cache that never remembers anything
pub struct NoCache;

impl PageCache for NoCache {
    fn load(&self, _url: &str) -> Option<String> {
        None
    }

    fn store(&self, _url: &str, _body: &str) {}
}

/// One file per URL under a cache directory
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, url: &str) -> PathBuf {
        let mut hasher = DefaultHasher::new();
        url.hash(&mut hasher);
        self.dir.join(format!("{:016x}.html", hasher.finish()))
    }
}

impl PageCache for FileCache {
    fn load(&self, url: &str) -> Option<String> {
        let path = self.path_for(url);
        let page = fs::read_to_string(&path).ok()?;
        debug!("loaded {url} from {}", path.display());
        Some(page)
    }

    fn store(&self, url: &str, body: &str) {
        let path = self.path_for(url);
        if let Err(error) = write_page(&self.dir, &path, body) {
            // Not being able to cache is not worth failing the fetch
            warn!("could not cache {url} at {}: {error}", path.display());
        }
    }
}

fn write_page(dir: &Path, path: &Path, body: &str) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    fs::write(path, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("catextor-{name}-{}", std::process::id()))
    }

    #[test]
    fn file_cache_round_trips_by_url() {
        let dir = scratch_dir("roundtrip");
        let cache = FileCache::new(&dir);

        assert!(cache.load("https://cate.doc.ic.ac.uk/a").is_none());
        cache.store("https://cate.doc.ic.ac.uk/a", "<html>a</html>");
        cache.store("https://cate.doc.ic.ac.uk/b", "<html>b</html>");

        assert_eq!(
            cache.load("https://cate.doc.ic.ac.uk/a").as_deref(),
            Some("<html>a</html>")
        );
        assert_eq!(
            cache.load("https://cate.doc.ic.ac.uk/b").as_deref(),
            Some("<html>b</html>")
        );

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn no_cache_forgets() {
        let cache = NoCache;
        cache.store("https://cate.doc.ic.ac.uk/a", "<html></html>");
        assert!(cache.load("https://cate.doc.ic.ac.uk/a").is_none());
    }
}
