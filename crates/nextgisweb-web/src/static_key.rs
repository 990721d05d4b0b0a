//! Cache-busting key for static assets.
//!
//! The key is derived from a listing of installed packages, so that every
//! deployment change yields new asset URLs.

use std::process::Command;

use sha2::{Digest, Sha256};

use nextgisweb_core::{NgwError, NgwResult};

/// A source of the package listing hashed into the static key.
pub trait PackageListing {
    fn listing(&self) -> NgwResult<String>;
}

/// Lists `identity==version` for each component plus the application.
#[derive(Debug, Clone, Default)]
pub struct ComponentListing {
    lines: Vec<String>,
}

impl ComponentListing {
    pub fn new(app_version: &str) -> Self {
        Self {
            lines: vec![format!("nextgisweb=={app_version}")],
        }
    }

    #[must_use]
    pub fn with_package(mut self, identity: &str, version: &str) -> Self {
        self.lines.push(format!("{identity}=={version}"));
        self
    }
}

impl PackageListing for ComponentListing {
    fn listing(&self) -> NgwResult<String> {
        let mut out = self.lines.join("\n");
        out.push('\n');
        Ok(out)
    }
}

/// Uses the standard output of a shell command, such as `pip freeze`.
#[derive(Debug, Clone)]
pub struct CommandListing {
    command: String,
}

impl CommandListing {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl PackageListing for CommandListing {
    fn listing(&self) -> NgwResult<String> {
        let output = Command::new("sh").arg("-c").arg(&self.command).output()?;
        if !output.status.success() {
            return Err(NgwError::ImproperlyConfigured(format!(
                "Package listing command '{}' failed with {}: {}",
                self.command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Computes `/` followed by the lower-hex SHA-256 of the listing.
pub fn static_key(listing: &dyn PackageListing) -> NgwResult<String> {
    let digest = Sha256::digest(listing.listing()?.as_bytes());
    Ok(format!("/{}", hex::encode(digest)))
}
