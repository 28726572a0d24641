use std::env;
use std::path::{Component, Path, PathBuf};

const HOME_PREFIX: &str = "~";

pub trait PathExt {
    /// Canonical form when the path exists, otherwise an absolute and
    /// lexically normalized rendition.
    fn best_effort_display(&self) -> String;

    /// Replaces a leading `~` component with `home`.
    fn expand_home(&self, home: Option<&Path>) -> PathBuf;
}

impl PathExt for Path {
    fn best_effort_display(&self) -> String {
        if let Ok(canonical) = self.canonicalize() {
            return canonical.display().to_string();
        }

        let absolute = if self.is_absolute() {
            self.to_path_buf()
        } else {
            match env::current_dir() {
                Ok(current) => current.join(self),
                Err(_) => self.to_path_buf(),
            }
        };
        normalize(&absolute).display().to_string()
    }

    fn expand_home(&self, home: Option<&Path>) -> PathBuf {
        match (self.strip_prefix(HOME_PREFIX), home) {
            (Ok(rest), Some(home)) => home.join(rest),
            _ => self.to_path_buf(),
        }
    }
}

impl PathExt for PathBuf {
    fn best_effort_display(&self) -> String {
        self.as_path().best_effort_display()
    }

    fn expand_home(&self, home: Option<&Path>) -> PathBuf {
        self.as_path().expand_home(home)
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !matches!(components.last(), None | Some(Component::RootDir)) {
                    components.pop();
                }
            }
            _ => components.push(component),
        }
    }

    components.iter().collect()
}
