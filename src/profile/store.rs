use super::model::{validate_profile_name, Profile, DEFAULT_PROFILE_NAME};
use crate::error::{GesturepadError, ProfileError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Filesystem-backed profile collection: one `<name>.json` per profile plus a
/// text file naming the active one
#[derive(Debug, Clone)]
pub struct ProfileStore {
    profiles_dir: PathBuf,
    active_file: PathBuf,
}

impl ProfileStore {
    /// Open the store, creating directories, the default profile and the
    /// active pointer when they are missing
    pub async fn open<P: Into<PathBuf>, A: Into<PathBuf>>(
        profiles_dir: P,
        active_file: A,
        default_profile: Profile,
    ) -> Result<Self> {
        let store = Self {
            profiles_dir: profiles_dir.into(),
            active_file: active_file.into(),
        };

        create_dir(&store.profiles_dir).await?;
        if let Some(parent) = store.active_file.parent() {
            create_dir(parent).await?;
        }

        store.bootstrap(default_profile).await?;
        Ok(store)
    }

    async fn bootstrap(&self, mut default_profile: Profile) -> Result<()> {
        if !self.profile_path(DEFAULT_PROFILE_NAME).exists() {
            default_profile.name = DEFAULT_PROFILE_NAME.to_string();
            self.save(default_profile).await?;
            info!(
                "Created default profile in {}",
                self.profiles_dir.display()
            );
        }

        if !self.active_file.exists() {
            write_file(&self.active_file, DEFAULT_PROFILE_NAME).await?;
        }
        Ok(())
    }

    pub fn profiles_dir(&self) -> &Path {
        &self.profiles_dir
    }

    fn profile_path(&self, name: &str) -> PathBuf {
        self.profiles_dir.join(format!("{}.json", name))
    }

    /// All readable profiles sorted by file name. Corrupt or invalid files
    /// are skipped so the API stays usable.
    pub async fn list(&self) -> Result<Vec<Profile>> {
        let mut entries = fs::read_dir(&self.profiles_dir)
            .await
            .map_err(|e| storage_error(&self.profiles_dir, e))?;

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| storage_error(&self.profiles_dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut profiles = Vec::with_capacity(paths.len());
        for path in paths {
            match read_profile(&path).await {
                Ok(profile) => profiles.push(profile),
                Err(e) => warn!("Skipping profile file {}: {}", path.display(), e),
            }
        }
        Ok(profiles)
    }

    pub async fn get(&self, name: &str) -> Result<Profile> {
        validate_profile_name(name)?;
        let path = self.profile_path(name);
        if !path.exists() {
            return Err(ProfileError::NotFound {
                name: name.to_string(),
            }
            .into());
        }
        read_profile(&path).await
    }

    pub async fn save(&self, profile: Profile) -> Result<Profile> {
        profile.validate()?;
        let path = self.profile_path(&profile.name);
        let json = serde_json::to_string_pretty(&profile)?;
        write_file(&path, &json).await?;
        debug!("Saved profile '{}' to {}", profile.name, path.display());
        Ok(profile)
    }

    pub async fn activate(&self, name: &str) -> Result<Profile> {
        let profile = self.get(name).await?;
        write_file(&self.active_file, &profile.name).await?;
        info!("Activated profile '{}'", profile.name);
        Ok(profile)
    }

    /// Name stored in the active pointer; `default` when missing or empty
    pub async fn active_name(&self) -> String {
        match fs::read_to_string(&self.active_file).await {
            Ok(contents) if !contents.trim().is_empty() => contents.trim().to_string(),
            _ => DEFAULT_PROFILE_NAME.to_string(),
        }
    }

    /// The active profile, falling back to re-activating `default` when the
    /// pointer names a profile that no longer exists
    pub async fn active(&self) -> Result<Profile> {
        let name = self.active_name().await;
        match self.get(&name).await {
            Ok(profile) => Ok(profile),
            Err(GesturepadError::Profile(ProfileError::NotFound { .. }))
            | Err(GesturepadError::Profile(ProfileError::InvalidName { .. })) => {
                warn!(
                    "Active profile '{}' is unavailable, falling back to '{}'",
                    name, DEFAULT_PROFILE_NAME
                );
                self.activate(DEFAULT_PROFILE_NAME).await
            }
            Err(e) => Err(e),
        }
    }

    /// The profile after `current` in listing order, wrapping around. An
    /// unknown `current` yields the first profile.
    pub async fn next_after(&self, current: &str) -> Result<Option<Profile>> {
        let profiles = self.list().await?;
        if profiles.is_empty() {
            return Ok(None);
        }

        let next = match profiles.iter().position(|p| p.name == current) {
            Some(index) => (index + 1) % profiles.len(),
            None => 0,
        };
        Ok(profiles.into_iter().nth(next))
    }
}

async fn read_profile(path: &Path) -> Result<Profile> {
    let contents = fs::read_to_string(path)
        .await
        .map_err(|e| storage_error(path, e))?;
    let profile: Profile =
        serde_json::from_str(&contents).map_err(|e| ProfileError::Corrupt {
            path: path.display().to_string(),
            source: e,
        })?;
    profile.validate()?;
    Ok(profile)
}

async fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| storage_error(path, e).into())
}

async fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents)
        .await
        .map_err(|e| storage_error(path, e).into())
}

fn storage_error(path: &Path, source: std::io::Error) -> ProfileError {
    ProfileError::Storage {
        path: path.display().to_string(),
        source,
    }
}
