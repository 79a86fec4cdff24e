use super::alias::{alias_params, list_aliases, read_alias, write_alias, AliasDef, AliasUpdate};
use super::location::{service_bucket, validate_name, Location};
use super::resolver::resolve_service;
use super::settings::Settings;
use super::storage::{unset_settings, write_settings};
use crate::constants;
use crate::error::Error;
use crate::store::{BucketPath, Store, StoreRead};
use std::collections::BTreeSet;
use std::path::Path;

/// A service as listed by `service list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEntry {
    pub name: String,
    pub current: bool,
}

/// An alias together with the parameters it references.
#[derive(Debug, Clone)]
pub struct AliasTarget {
    pub service: String,
    pub alias: AliasDef,
    pub params: BTreeSet<String>,
}

/// Service-level configuration commands against the store.
pub struct ServiceManager {
    store: Store,
}

fn info_bucket() -> BucketPath {
    BucketPath::root(constants::BUCKET_INFO)
}

impl ServiceManager {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Opens the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened.
    pub fn open(path: &Path) -> Result<Self, Error> {
        Ok(Self::new(Store::open(path)?))
    }

    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    /// Creates a service seeded with the defaults, overridden by `settings`.
    ///
    /// The first service ever created becomes the current one. Returns whether
    /// the service is now current.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ServiceExists`] if the service exists and `force` is off.
    pub fn init(&self, name: &str, settings: &Settings, force: bool) -> Result<bool, Error> {
        validate_name(name)?;
        self.store.update(|tx| {
            let info = info_bucket();
            tx.put(&info, constants::KEY_VERSION, env!("CARGO_PKG_VERSION"))?;
            tx.create_bucket(&BucketPath::root(constants::BUCKET_SERVICES))?;

            let bucket = service_bucket(name);
            if tx.bucket_exists(&bucket)? {
                if !force {
                    return Err(Error::ServiceExists {
                        name: name.to_string(),
                    });
                }
                tx.delete_bucket(&bucket)?;
            }
            write_settings(tx, &bucket, &Settings::defaults().merge(settings))?;

            let current = tx
                .get(&info, constants::KEY_CURRENT)?
                .filter(|c| !c.is_empty());
            match current {
                Some(current) => Ok(current == name),
                None => {
                    tx.put(&info, constants::KEY_CURRENT, name)?;
                    Ok(true)
                }
            }
        })
    }

    /// Deletes a service, clearing the current service if it was this one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchService`] if it does not exist.
    pub fn remove(&self, name: &str) -> Result<(), Error> {
        self.store.update(|tx| {
            let name = resolve_service(&*tx, Some(name))?;
            tx.delete_bucket(&service_bucket(&name))?;
            let info = info_bucket();
            if tx.get(&info, constants::KEY_CURRENT)?.as_deref() == Some(name.as_str()) {
                tx.delete(&info, constants::KEY_CURRENT)?;
            }
            Ok(())
        })
    }

    /// Writes the set fields of `settings` at `location`, creating path and
    /// method buckets as needed. Aliases are only created by `add_alias`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchService`] if the service does not exist, or
    /// [`Error::NoAlias`] for an alias that was never defined.
    pub fn set(&self, location: &Location, settings: &Settings) -> Result<(), Error> {
        self.store.update(|tx| {
            resolve_service(&*tx, Some(location.service()))?;
            let bucket = location.bucket();
            if matches!(location, Location::Alias { .. }) && !tx.bucket_exists(&bucket)? {
                return Err(location.missing());
            }
            write_settings(tx, &bucket, settings)
        })
    }

    /// Removes the fields selected by `selector`, or the whole location when
    /// `all` is set. Returns how many values were removed.
    ///
    /// # Errors
    ///
    /// Returns the location's "missing" error if nothing is stored there.
    pub fn unset(&self, location: &Location, selector: &Settings, all: bool) -> Result<usize, Error> {
        self.store.update(|tx| {
            resolve_service(&*tx, Some(location.service()))?;
            let bucket = location.bucket();
            if !tx.bucket_exists(&bucket)? {
                return Err(location.missing());
            }
            if all {
                let removed = tx.delete_bucket(&bucket)?;
                if let Location::Service { .. } = location {
                    // the service itself stays, emptied
                    tx.create_bucket(&bucket)?;
                }
                return Ok(removed);
            }
            unset_settings(tx, &bucket, selector)
        })
    }

    /// Makes `name` the current service.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchService`] if it does not exist.
    pub fn use_service(&self, name: &str) -> Result<(), Error> {
        self.store.update(|tx| {
            let name = resolve_service(&*tx, Some(name))?;
            tx.put(&info_bucket(), constants::KEY_CURRENT, &name)
        })
    }

    /// All services by name, marking the current one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedDatabase`] if the store was never initialised.
    pub fn list(&self) -> Result<Vec<ServiceEntry>, Error> {
        self.store.view(|tx| {
            let info = info_bucket();
            if !tx.bucket_exists(&info)? {
                return Err(Error::malformed(constants::BUCKET_INFO));
            }
            let current = tx.get(&info, constants::KEY_CURRENT)?;
            Ok(tx
                .buckets(&BucketPath::root(constants::BUCKET_SERVICES))?
                .into_iter()
                .map(|name| ServiceEntry {
                    current: current.as_deref() == Some(name.as_str()),
                    name,
                })
                .collect())
        })
    }

    /// The version recorded when the store was initialised.
    ///
    /// # Errors
    ///
    /// Returns a store error if the store cannot be read.
    pub fn store_version(&self) -> Result<Option<String>, Error> {
        self.store
            .view(|tx| tx.get(&info_bucket(), constants::KEY_VERSION))
    }

    /// Renders stored configuration: everything, one service, or one key or
    /// sub-bucket of a service. A dotted key descends into sub-buckets.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] if the key does not exist.
    pub fn config(&self, name: Option<&str>, key: Option<&str>) -> Result<Vec<String>, Error> {
        self.store.view(|tx| {
            let Some(name) = name else {
                let mut lines = Vec::new();
                for root in [constants::BUCKET_INFO, constants::BUCKET_SERVICES] {
                    let bucket = BucketPath::root(root);
                    if tx.bucket_exists(&bucket)? {
                        lines.push(format!("{root}:"));
                        lines.extend(tx.dump(&bucket, 1)?);
                    }
                }
                return Ok(lines);
            };

            let name = resolve_service(tx, Some(name))?;
            let service = service_bucket(&name);
            let Some(key) = key else {
                return tx.dump(&service, 0);
            };

            let segments: Vec<&str> = key.split('.').collect();
            let (leaf, parents) = segments
                .split_last()
                .ok_or_else(|| Error::InvalidPath {
                    path: key.to_string(),
                })?;
            let parent = parents.iter().fold(service, |b, s| b.child(s));

            if let Some(value) = tx.get(&parent, leaf)? {
                return Ok(vec![format!("{leaf}: {value}")]);
            }
            let bucket = parent.child(leaf);
            if tx.bucket_exists(&bucket)? {
                return tx.dump(&bucket, 0);
            }
            Err(Error::InvalidPath {
                path: key.to_string(),
            })
        })
    }

    /// Creates or updates an alias on the given or current service.
    /// Returns the service name.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`write_alias`] and service resolution.
    pub fn add_alias(&self, service: Option<&str>, update: &AliasUpdate) -> Result<String, Error> {
        self.store.update(|tx| {
            let service = resolve_service(&*tx, service)?;
            write_alias(tx, &service, update)?;
            Ok(service)
        })
    }

    /// Aliases of the given or current service.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoAliases`] if there are none.
    pub fn aliases(&self, service: Option<&str>) -> Result<(String, Vec<AliasDef>), Error> {
        self.store.view(|tx| {
            let service = resolve_service(tx, service)?;
            let aliases = list_aliases(tx, &service)?;
            Ok((service, aliases))
        })
    }

    /// Loads an alias and the parameters it references.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoAlias`] or [`Error::NoAliases`] if it does not exist.
    pub fn alias_target(&self, service: Option<&str>, name: &str) -> Result<AliasTarget, Error> {
        self.store.view(|tx| {
            let service = resolve_service(tx, service)?;
            let alias = read_alias(tx, &service, name)?;
            let params = alias_params(tx, &service, &alias)?;
            Ok(AliasTarget {
                service,
                alias,
                params,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::storage::read_settings;
    use crate::invocation::HttpMethod;

    fn manager() -> (tempfile::TempDir, ServiceManager) {
        let dir = tempfile::tempdir().unwrap();
        let manager = ServiceManager::open(&dir.path().join("rest.db")).unwrap();
        (dir, manager)
    }

    fn current(manager: &ServiceManager) -> Option<String> {
        manager
            .list()
            .unwrap()
            .into_iter()
            .find(|entry| entry.current)
            .map(|entry| entry.name)
    }

    fn service_settings(manager: &ServiceManager, name: &str) -> Settings {
        manager
            .store()
            .view(|tx| read_settings(tx, &service_bucket(name)))
            .unwrap()
    }

    #[test]
    fn test_init_seeds_defaults_under_flags() {
        let (_dir, manager) = manager();
        let flags = Settings {
            host: Some("api.example.com".into()),
            ..Settings::new()
        };
        assert!(manager.init("api", &flags, false).unwrap());

        let stored = service_settings(&manager, "api");
        assert_eq!(stored.host.as_deref(), Some("api.example.com"));
        assert_eq!(stored.scheme.as_deref(), Some("https"));
        assert_eq!(stored.retries, Some(2));
        assert_eq!(current(&manager).as_deref(), Some("api"));
        assert_eq!(
            manager.store_version().unwrap().as_deref(),
            Some(env!("CARGO_PKG_VERSION"))
        );
    }

    #[test]
    fn test_second_init_does_not_change_current() {
        let (_dir, manager) = manager();
        manager.init("api", &Settings::new(), false).unwrap();
        assert!(!manager.init("other", &Settings::new(), false).unwrap());
        assert_eq!(current(&manager).as_deref(), Some("api"));
    }

    #[test]
    fn test_init_existing_requires_force() {
        let (_dir, manager) = manager();
        manager.init("api", &Settings::new(), false).unwrap();
        let err = manager.init("api", &Settings::new(), false).unwrap_err();
        assert!(matches!(err, Error::ServiceExists { .. }));
        manager.init("api", &Settings::new(), true).unwrap();
    }

    #[test]
    fn test_remove_clears_current() {
        let (_dir, manager) = manager();
        manager.init("api", &Settings::new(), false).unwrap();
        manager.remove("api").unwrap();
        assert_eq!(current(&manager), None);
        assert!(manager.list().unwrap().is_empty());
        assert!(matches!(
            manager.remove("api"),
            Err(Error::NoSuchService { .. })
        ));
    }

    #[test]
    fn test_use_and_list() {
        let (_dir, manager) = manager();
        manager.init("api", &Settings::new(), false).unwrap();
        manager.init("billing", &Settings::new(), false).unwrap();
        manager.use_service("billing").unwrap();
        assert_eq!(
            manager.list().unwrap(),
            vec![
                ServiceEntry {
                    name: "api".into(),
                    current: false
                },
                ServiceEntry {
                    name: "billing".into(),
                    current: true
                },
            ]
        );
        assert!(manager.use_service("nope").is_err());
    }

    #[test]
    fn test_set_and_unset_method_location() {
        let (_dir, manager) = manager();
        manager.init("api", &Settings::new(), false).unwrap();
        let location = Location::Method {
            service: "api".into(),
            path: "/users".into(),
            method: HttpMethod::Post,
        };
        let settings = Settings {
            port: Some(8080),
            ..Settings::new()
        };
        manager.set(&location, &settings).unwrap();

        let removed = manager.unset(&location, &Settings::new(), true).unwrap();
        assert!(removed > 0);
        let err = manager
            .unset(&location, &Settings::new(), false)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPath { .. }));
    }

    #[test]
    fn test_unset_all_on_service_keeps_service() {
        let (_dir, manager) = manager();
        manager.init("api", &Settings::new(), false).unwrap();
        let location = Location::Service {
            service: "api".into(),
        };
        manager.unset(&location, &Settings::new(), true).unwrap();
        assert_eq!(service_settings(&manager, "api"), Settings::new());
        assert_eq!(manager.list().unwrap().len(), 1);
    }

    #[test]
    fn test_set_on_unknown_service() {
        let (_dir, manager) = manager();
        manager.init("api", &Settings::new(), false).unwrap();
        let location = Location::Service {
            service: "nope".into(),
        };
        assert!(matches!(
            manager.set(&location, &Settings::new()),
            Err(Error::NoSuchService { .. })
        ));
    }

    #[test]
    fn test_set_on_undefined_alias_leaves_aliases_intact() {
        let (_dir, manager) = manager();
        manager.init("api", &Settings::new(), false).unwrap();
        manager
            .add_alias(
                None,
                &AliasUpdate {
                    name: "user".into(),
                    method: Some(HttpMethod::Get),
                    path: Some("/users/:id".into()),
                    data: None,
                    description: None,
                    settings: Settings::new(),
                },
            )
            .unwrap();

        let typo = Location::Alias {
            service: "api".into(),
            alias: "usr".into(),
        };
        let host = Settings {
            host: Some("h".into()),
            ..Settings::new()
        };
        assert!(matches!(
            manager.set(&typo, &host),
            Err(Error::NoAlias { alias }) if alias == "usr"
        ));

        let (_, aliases) = manager.aliases(None).unwrap();
        assert_eq!(aliases.len(), 1);
        assert_eq!(aliases[0].name, "user");

        let defined = Location::Alias {
            service: "api".into(),
            alias: "user".into(),
        };
        manager.set(&defined, &host).unwrap();
        assert_eq!(
            manager.config(Some("api"), Some("aliases.user.host")).unwrap(),
            vec!["host: h"]
        );
    }

    #[test]
    fn test_config_key_lookup() {
        let (_dir, manager) = manager();
        manager.init("api", &Settings::new(), false).unwrap();
        assert_eq!(
            manager.config(Some("api"), Some("host")).unwrap(),
            vec!["host: localhost"]
        );
        assert_eq!(
            manager.config(Some("api"), Some("retry.retries")).unwrap(),
            vec!["retries: 2"]
        );
        assert!(manager
            .config(Some("api"), Some("retry"))
            .unwrap()
            .contains(&"jitter: true".to_string()));
        assert!(matches!(
            manager.config(Some("api"), Some("nope")),
            Err(Error::InvalidPath { .. })
        ));

        let all = manager.config(None, None).unwrap();
        assert_eq!(all[0], "info:");
        assert!(all.contains(&"    api:".to_string()));
    }
}
