use anyhow::{bail, Result};
use std::{
    fs,
    path::{Component, Path, PathBuf},
};

use super::constants::MEMORY_DB_PATH;

/// Where the sqlite database lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbLocation {
    Memory,
    File(PathBuf),
}

/// Check a configured database path and resolve it to a location.
pub fn validate_db_path(db_path: &str) -> Result<DbLocation> {
    if db_path == MEMORY_DB_PATH {
        return Ok(DbLocation::Memory);
    }

    if db_path.trim().is_empty() {
        bail!("Empty database path");
    }

    if db_path.contains(['\0', '\n', '\r', '\t']) {
        bail!("Invalid control characters in database path");
    }

    let path = Path::new(db_path);

    if path
        .components()
        .any(|component| matches!(component, Component::ParentDir))
    {
        bail!("Parent directory traversal is not allowed in database path");
    }

    if path.file_name().is_none() {
        bail!("Database path must include a file name");
    }

    if let Ok(meta) = fs::symlink_metadata(path) {
        if meta.file_type().is_symlink() {
            bail!("Symlink path is not allowed for database path");
        }
        if meta.is_dir() {
            bail!("Database path points to a directory");
        }
    }

    Ok(DbLocation::File(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::{validate_db_path, DbLocation};
    use rand::{distributions::Alphanumeric, Rng};
    use std::{env, fs, path::PathBuf};

    fn random_name(prefix: &str) -> String {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();
        format!("{}{}", prefix, suffix)
    }

    #[test]
    fn resolves_memory() {
        assert_eq!(validate_db_path(":memory:").unwrap(), DbLocation::Memory);
    }

    #[test]
    fn resolves_relative_file() {
        assert_eq!(
            validate_db_path("data/polls.db").unwrap(),
            DbLocation::File(PathBuf::from("data/polls.db"))
        );
    }

    #[test]
    fn rejects_blank() {
        assert!(validate_db_path("").is_err());
        assert!(validate_db_path("   ").is_err());
    }

    #[test]
    fn rejects_control_chars() {
        assert!(validate_db_path("bad\nname.db").is_err());
        assert!(validate_db_path("bad\0name.db").is_err());
    }

    #[test]
    fn rejects_parent_traversal() {
        assert!(validate_db_path("../polls.db").is_err());
        assert!(validate_db_path("data/../../polls.db").is_err());
    }

    #[test]
    fn rejects_existing_directory() {
        let dir_path = env::temp_dir().join(random_name("ps_dir_"));
        fs::create_dir_all(&dir_path).unwrap();
        assert!(validate_db_path(dir_path.to_str().unwrap()).is_err());
        fs::remove_dir_all(&dir_path).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn rejects_symlink() {
        use std::os::unix::fs::symlink;

        let base = env::temp_dir().join(random_name("ps_sym_"));
        fs::create_dir_all(&base).unwrap();
        let target = base.join("target.db");
        fs::write(&target, b"").unwrap();
        let link = base.join("link.db");
        symlink(&target, &link).unwrap();

        assert!(validate_db_path(link.to_str().unwrap()).is_err());

        fs::remove_dir_all(&base).ok();
    }
}
