use url::Url;
use uuid::Uuid;

/// Convenience wrapper for URL generation functions.
#[derive(Clone)]
pub struct Urls {
    /// Top-level URL, including trailing slash.
    base: Url,

    /// Path for all workshop-related actions.
    pub(crate) workshops_path: String,

    /// Prefix for all workshop-related actions.
    workshops_prefix: String,

    /// Path for all account-related actions.
    pub(crate) auth_path: String,
}

impl Urls {
    /// Create a new instance. The prefixes should *not* include trailing slashes.
    pub fn new(
        base: impl AsRef<str>,
        workshops_prefix: impl Into<String>,
        auth_prefix: impl Into<String>,
    ) -> Self {
        let base =
            Url::parse(base.as_ref()).unwrap_or_else(|_| panic!("parse {} as URL", base.as_ref()));
        let workshops_path = workshops_prefix.into();
        let workshops_prefix = format!("{}/", workshops_path);

        Urls {
            base,
            workshops_path,
            workshops_prefix,
            auth_path: auth_prefix.into(),
        }
    }

    pub fn workshops(&self) -> Url {
        self.base
            .join(&self.workshops_prefix)
            .expect("get workshops URL")
    }

    pub fn workshop(&self, id: &Uuid) -> Url {
        let id = format!("{}", id);
        self.workshops()
            .join(&id)
            .unwrap_or_else(|_| panic!("get URL for workshop {}", id))
    }
}
