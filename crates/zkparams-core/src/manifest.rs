//! Registry of parameter files: name, expected SHA-256 and where to fetch it.
//!
//! The built-in table is the Sapling/Sprout set published under
//! `https://z.cash/downloads/`. A TOML manifest can replace it:
//!
//! ```toml
//! [[params]]
//! name = "sapling-spend.params"
//! sha256 = "8e48ffd23abb3a5fd9c5589204f32d9c31285a04b78096ba40a79b75677efc13"
//! # url is optional; defaults to base_url + name
//! url = "https://mirror.example/sapling-spend.params"
//! ```

use crate::checksum::Sha256Digest;
use crate::error::ParamsError;
use crate::storage;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use url::Url;

/// Where the reference deployment publishes the parameter files.
pub const DEFAULT_BASE_URL: &str = "https://z.cash/downloads/";

const SAPLING_PARAMS: [(&str, &str); 3] = [
    (
        "sapling-spend.params",
        "8e48ffd23abb3a5fd9c5589204f32d9c31285a04b78096ba40a79b75677efc13",
    ),
    (
        "sapling-output.params",
        "2f0ebbcbb9bb0bcffe95a397e7eba89c29eb4dde6191c339db88570e3f3fb0e4",
    ),
    (
        "sprout-groth16.params",
        "b685d700c60328498fbde589c8c7c484c722b788b265b72af448a5bf0ee55b50",
    ),
];

/// One file the engine is responsible for. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    name: String,
    expected_digest: Sha256Digest,
    locator: Url,
}

impl ManifestEntry {
    /// Validates that `name` is a bare file name and `locator` parses as a URL.
    pub fn new(
        name: impl Into<String>,
        expected_digest: Sha256Digest,
        locator: &str,
    ) -> Result<Self, ParamsError> {
        let name = name.into();
        validate_name(&name)?;
        let locator = Url::parse(locator)
            .map_err(|e| ParamsError::manifest(format!("{}: bad url {:?}: {}", name, locator, e)))?;
        Ok(ManifestEntry {
            name,
            expected_digest,
            locator,
        })
    }

    /// Entry whose locator is `base_url` joined with `name`.
    pub fn under_base(
        name: impl Into<String>,
        expected_digest: Sha256Digest,
        base_url: &str,
    ) -> Result<Self, ParamsError> {
        let name = name.into();
        validate_name(&name)?;
        let locator = join_base(base_url, &name)?;
        Ok(ManifestEntry {
            name,
            expected_digest,
            locator,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expected_digest(&self) -> &Sha256Digest {
        &self.expected_digest
    }

    pub fn locator(&self) -> &Url {
        &self.locator
    }

    /// `<dir>/<name>`
    pub fn final_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.name)
    }

    /// `<dir>/<name>.dl`
    pub fn temp_path(&self, dir: &Path) -> PathBuf {
        storage::temp_path(&self.final_path(dir))
    }
}

fn validate_name(name: &str) -> Result<(), ParamsError> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(ParamsError::manifest(format!("invalid file name {:?}", name)));
    }
    if name.contains(&['/', '\\'][..]) {
        return Err(ParamsError::manifest(format!(
            "file name {:?} must not contain a path separator",
            name
        )));
    }
    if name.ends_with(storage::TEMP_SUFFIX) {
        return Err(ParamsError::manifest(format!(
            "file name {:?} collides with the temp suffix {}",
            name,
            storage::TEMP_SUFFIX
        )));
    }
    Ok(())
}

fn join_base(base_url: &str, name: &str) -> Result<Url, ParamsError> {
    let mut base = base_url.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    Url::parse(&base)
        .and_then(|b| b.join(name))
        .map_err(|e| ParamsError::manifest(format!("bad base url {:?}: {}", base_url, e)))
}

/// Ordered set of entries with unique names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Fails on duplicate names.
    pub fn new(entries: Vec<ManifestEntry>) -> Result<Self, ParamsError> {
        let mut seen = HashSet::new();
        for e in &entries {
            if !seen.insert(e.name()) {
                return Err(ParamsError::manifest(format!(
                    "duplicate entry {:?}",
                    e.name()
                )));
            }
        }
        Ok(Manifest { entries })
    }

    /// The built-in Sapling/Sprout table, fetched from `base_url`.
    pub fn sapling(base_url: &str) -> Result<Self, ParamsError> {
        let entries = SAPLING_PARAMS
            .iter()
            .map(|(name, sha)| ManifestEntry::under_base(*name, sha.parse()?, base_url))
            .collect::<Result<Vec<_>, _>>()?;
        Manifest::new(entries)
    }

    /// Parse a TOML manifest. Entries without `url` are placed under `base_url`.
    pub fn from_toml_str(data: &str, base_url: &str) -> Result<Self, ParamsError> {
        let file: ManifestFile =
            toml::from_str(data).map_err(|e| ParamsError::manifest(e.to_string()))?;
        let entries = file
            .params
            .into_iter()
            .map(|raw| match raw.url {
                Some(url) => ManifestEntry::new(raw.name, raw.sha256, &url),
                None => ManifestEntry::under_base(raw.name, raw.sha256, base_url),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Manifest::new(entries)
    }

    /// Read and parse a TOML manifest file.
    pub fn load(path: &Path, base_url: &str) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("read manifest {}", path.display()))?;
        let manifest = Manifest::from_toml_str(&data, base_url)
            .with_context(|| format!("parse manifest {}", path.display()))?;
        tracing::debug!(
            path = %path.display(),
            entries = manifest.len(),
            "loaded manifest"
        );
        Ok(manifest)
    }

    pub fn get(&self, name: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.name() == name)
    }

    /// Entry at manifest position `index`.
    pub fn at(&self, index: usize) -> Option<&ManifestEntry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ManifestEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a ManifestEntry;
    type IntoIter = std::slice::Iter<'a, ManifestEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    params: Vec<RawEntry>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    name: String,
    sha256: Sha256Digest,
    #[serde(default)]
    url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn sapling_table_has_three_entries_under_base() {
        let m = Manifest::sapling(DEFAULT_BASE_URL).unwrap();
        assert_eq!(m.len(), 3);
        let spend = m.get("sapling-spend.params").unwrap();
        assert_eq!(
            spend.locator().as_str(),
            "https://z.cash/downloads/sapling-spend.params"
        );
        assert_eq!(
            spend.expected_digest().as_str(),
            "8e48ffd23abb3a5fd9c5589204f32d9c31285a04b78096ba40a79b75677efc13"
        );
        let names: Vec<_> = m.iter().map(|e| e.name()).collect();
        assert_eq!(
            names,
            [
                "sapling-spend.params",
                "sapling-output.params",
                "sprout-groth16.params"
            ]
        );
    }

    #[test]
    fn base_without_trailing_slash_keeps_last_segment() {
        let e = ManifestEntry::under_base("a.params", HELLO.parse().unwrap(), "https://m.example/zk")
            .unwrap();
        assert_eq!(e.locator().as_str(), "https://m.example/zk/a.params");
    }

    #[test]
    fn paths_inside_destination() {
        let e = ManifestEntry::new("a.params", HELLO.parse().unwrap(), "https://h/a.params").unwrap();
        let dir = Path::new("/data/zk");
        assert_eq!(e.final_path(dir), Path::new("/data/zk/a.params"));
        assert_eq!(e.temp_path(dir), Path::new("/data/zk/a.params.dl"));
    }

    #[test]
    fn rejects_bad_names() {
        let d: Sha256Digest = HELLO.parse().unwrap();
        assert!(ManifestEntry::new("../etc/passwd", d.clone(), "https://h/x").is_err());
        assert!(ManifestEntry::new("", d.clone(), "https://h/x").is_err());
        assert!(ManifestEntry::new("a.params.dl", d.clone(), "https://h/x").is_err());
        assert!(ManifestEntry::new("a.params", d, "not a url").is_err());
    }

    #[test]
    fn rejects_duplicates() {
        let d: Sha256Digest = HELLO.parse().unwrap();
        let a = ManifestEntry::new("a.params", d.clone(), "https://h/a").unwrap();
        let b = ManifestEntry::new("a.params", d, "https://h/b").unwrap();
        assert!(Manifest::new(vec![a, b]).is_err());
    }

    #[test]
    fn toml_manifest_with_and_without_url() {
        let data = format!(
            r#"
            [[params]]
            name = "a.params"
            sha256 = "{HELLO}"

            [[params]]
            name = "b.params"
            sha256 = "{HELLO}"
            url = "https://mirror.example/b"
            "#
        );
        let m = Manifest::from_toml_str(&data, "https://base.example/dl/").unwrap();
        assert_eq!(m.len(), 2);
        assert_eq!(
            m.get("a.params").unwrap().locator().as_str(),
            "https://base.example/dl/a.params"
        );
        assert_eq!(
            m.get("b.params").unwrap().locator().as_str(),
            "https://mirror.example/b"
        );
    }

    #[test]
    fn toml_manifest_bad_digest_is_error() {
        let data = r#"
            [[params]]
            name = "a.params"
            sha256 = "nothex"
        "#;
        let err = Manifest::from_toml_str(data, DEFAULT_BASE_URL).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.toml");
        std::fs::write(
            &path,
            format!("[[params]]\nname = \"a.params\"\nsha256 = \"{HELLO}\"\n"),
        )
        .unwrap();
        let m = Manifest::load(&path, DEFAULT_BASE_URL).unwrap();
        assert_eq!(m.get("a.params").unwrap().expected_digest().as_str(), HELLO);
    }
}
