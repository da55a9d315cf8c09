use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::models::{Certificate, Course, Material, UserProgress};

/// Consider cache stale after 1 hour.
const CACHE_STALE_MINUTES: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", (minutes + 30) / 60)
        } else {
            format!("{}d ago", (minutes + 720) / 1440)
        }
    }

    pub fn is_stale(&self) -> bool {
        self.age_minutes() > CACHE_STALE_MINUTES
    }
}

/// JSON file cache of course data, for painting the UI before the
/// first refresh completes and while the backend is unreachable.
pub struct CacheManager {
    cache_dir: PathBuf,
}

impl CacheManager {
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)?;
        Ok(Self { cache_dir })
    }

    fn cache_path(&self, name: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", name))
    }

    fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<CachedData<T>>> {
        let path = self.cache_path(name);
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache file: {}", name))?;

        let cached: CachedData<T> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache file: {}", name))?;

        Ok(Some(cached))
    }

    fn save<T: Serialize>(&self, name: &str, data: &T) -> Result<()> {
        let cached = CachedData::new(data);
        let contents = serde_json::to_string_pretty(&cached)?;
        std::fs::write(self.cache_path(name), contents)?;
        debug!(cache = name, "Cache written");
        Ok(())
    }

    pub fn load_courses(&self) -> Result<Option<CachedData<Vec<Course>>>> {
        self.load("courses")
    }

    pub fn save_courses(&self, courses: &[Course]) -> Result<()> {
        self.save("courses", &courses)
    }

    pub fn load_certificates(&self) -> Result<Option<CachedData<Vec<Certificate>>>> {
        self.load("certificates")
    }

    pub fn save_certificates(&self, certificates: &[Certificate]) -> Result<()> {
        self.save("certificates", &certificates)
    }

    pub fn load_materials(&self, course_id: i64) -> Result<Option<CachedData<Vec<Material>>>> {
        self.load(&format!("materials_{}", course_id))
    }

    pub fn save_materials(&self, course_id: i64, materials: &[Material]) -> Result<()> {
        self.save(&format!("materials_{}", course_id), &materials)
    }

    pub fn load_progress(&self, course_id: i64) -> Result<Option<CachedData<UserProgress>>> {
        self.load(&format!("progress_{}", course_id))
    }

    pub fn save_progress(&self, progress: &UserProgress) -> Result<()> {
        self.save(&format!("progress_{}", progress.course), progress)
    }

    /// Remove every cached file (used on logout so the next user starts clean)
    pub fn clear(&self) -> Result<()> {
        for entry in std::fs::read_dir(&self.cache_dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json")
                && path.file_name().is_some_and(|name| name != "tokens.json")
            {
                std::fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    /// Age of the course list, for the status bar
    pub fn courses_age(&self) -> Option<String> {
        match self.load_courses() {
            Ok(Some(cached)) => Some(cached.age_display()),
            Ok(None) => None,
            Err(e) => {
                debug!(error = %e, "Failed to load course cache for age");
                None
            }
        }
    }

    /// True when the course list is missing, unreadable or stale
    pub fn is_stale(&self) -> bool {
        match self.load_courses() {
            Ok(Some(cached)) => cached.is_stale(),
            Ok(None) => true,
            Err(e) => {
                debug!(error = %e, "Failed to load course cache for staleness check");
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn course(id: i64) -> Course {
        serde_json::from_value(serde_json::json!({"id": id, "title": format!("Course {}", id)}))
            .unwrap()
    }

    #[test]
    fn test_cached_data_age_display() {
        let mut cached = CachedData::new(vec![1]);
        assert_eq!(cached.age_display(), "just now");

        cached.cached_at = Utc::now() - Duration::minutes(5);
        assert_eq!(cached.age_display(), "5m ago");

        cached.cached_at = Utc::now() - Duration::minutes(95);
        assert_eq!(cached.age_display(), "2h ago");

        cached.cached_at = Utc::now() - Duration::days(3);
        assert_eq!(cached.age_display(), "3d ago");

        cached.cached_at = Utc::now() + Duration::minutes(10);
        assert_eq!(cached.age_display(), "just now");
    }

    #[test]
    fn test_cached_data_is_stale() {
        let fresh = CachedData::new(vec![1]);
        assert!(!fresh.is_stale());

        let mut old = CachedData::new(vec![1]);
        old.cached_at = Utc::now() - Duration::minutes(61);
        assert!(old.is_stale());
    }

    #[test]
    fn test_courses_round_trip_and_staleness() {
        let dir = TempDir::new().unwrap();
        let cache = CacheManager::new(dir.path().to_path_buf()).unwrap();
        assert!(cache.is_stale());
        assert!(cache.courses_age().is_none());

        cache.save_courses(&[course(1), course(2)]).unwrap();
        let loaded = cache.load_courses().unwrap().unwrap();
        assert_eq!(loaded.data.len(), 2);
        assert!(!cache.is_stale());
        assert_eq!(cache.courses_age().as_deref(), Some("just now"));
    }

    #[test]
    fn test_clear_keeps_token_file() {
        let dir = TempDir::new().unwrap();
        let cache = CacheManager::new(dir.path().to_path_buf()).unwrap();
        cache.save_courses(&[course(1)]).unwrap();
        std::fs::write(dir.path().join("tokens.json"), "{}").unwrap();

        cache.clear().unwrap();
        assert!(cache.load_courses().unwrap().is_none());
        assert!(dir.path().join("tokens.json").exists());
    }
}
