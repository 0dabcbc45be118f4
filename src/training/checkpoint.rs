use crate::error::Result;
use burn::{module::Module, record::CompactRecorder, tensor::backend::Backend};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Creates `{root}/{env_name}/{id}/` where `id` is one past the largest
/// numbered run already there.
pub fn next_experiment_dir(root: impl AsRef<Path>, env_name: &str) -> Result<PathBuf> {
    let env_dir = root.as_ref().join(env_name);
    fs::create_dir_all(&env_dir)?;

    let mut next_id = 0;
    for entry in fs::read_dir(&env_dir)? {
        let entry = entry?;
        if let Some(id) = entry
            .file_name()
            .to_str()
            .and_then(|name| name.parse::<u64>().ok())
        {
            next_id = next_id.max(id + 1);
        }
    }

    let dir = env_dir.join(next_id.to_string());
    fs::create_dir(&dir)?;
    Ok(dir)
}

/// Writes `module` to `{dir}/{name}.mpk`.
pub fn save<B: Backend, M: Module<B>>(module: &M, dir: &Path, name: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    module.clone().save_file(path.clone(), &CompactRecorder::new())?;
    tracing::debug!(path = %path.display(), "checkpoint written");
    Ok(path)
}

/// Loads a checkpoint written by [`save`] into a freshly initialised module.
pub fn load<B: Backend, M: Module<B>>(module: M, path: &Path, device: &B::Device) -> Result<M> {
    Ok(module.load_file(path.to_path_buf(), &CompactRecorder::new(), device)?)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Fresh, empty scratch directory for a test.
    pub fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rlsolver-{}-{name}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn experiment_ids_count_up() {
        let root = scratch_dir("experiment-ids");

        let first = next_experiment_dir(&root, "maxcut").unwrap();
        let second = next_experiment_dir(&root, "maxcut").unwrap();
        fs::create_dir(root.join("maxcut").join("notes")).unwrap();
        fs::create_dir(root.join("maxcut").join("7")).unwrap();
        let third = next_experiment_dir(&root, "maxcut").unwrap();

        assert_eq!(first, root.join("maxcut").join("0"));
        assert_eq!(second, root.join("maxcut").join("1"));
        assert_eq!(third, root.join("maxcut").join("8"));
        assert!(third.is_dir());
    }
}
