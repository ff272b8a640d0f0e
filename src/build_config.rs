//! Link configuration for the BLAS-backed native targets.
//!
//! A host BLAS installation is described by a [`BlasInfo`], usually read from
//! the environment. [`configuration`] turns it into the three native targets
//! of the package, falling back to a plain `cblas` library when no usable
//! installation is reported.
//!
//! ```rust
//! use priorsgd::build_config::{configuration, BlasInfo, Platform};
//!
//! let config = configuration(BlasInfo::default(), Platform::Posix);
//! let sgd = config.extension("sgd_fast").unwrap();
//! assert_eq!(sgd.libraries, vec!["cblas", "m"]);
//! ```

use std::env;
use std::path::PathBuf;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

pub const PACKAGE_NAME: &str = "priorsgd";

/// Library linked when no BLAS installation is found.
pub const FALLBACK_CBLAS: &str = "cblas";

pub const MATH_LIBRARY: &str = "m";

/// `(name, value)` preprocessor definition.
pub type DefineMacro = (String, Option<String>);

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BlasInfo {
    pub libraries: Vec<String>,
    pub library_dirs: Vec<PathBuf>,
    pub include_dirs: Vec<PathBuf>,
    pub define_macros: Vec<DefineMacro>,
    pub extra_compile_args: Vec<String>,
    pub extra_link_args: Vec<String>,
}

impl BlasInfo {
    /// Reads `BLAS_LIBS`, `BLAS_LIBRARY_DIRS`, `BLAS_INCLUDE_DIRS`,
    /// `BLAS_DEFINE_MACROS`, `BLAS_EXTRA_COMPILE_ARGS` and
    /// `BLAS_EXTRA_LINK_ARGS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`BlasInfo::from_env`], reading variables through `lookup`.
    ///
    /// Library and argument lists are separated by commas or whitespace,
    /// directory lists by the platform path separator, and macros are
    /// `NAME` or `NAME=VALUE` separated by commas.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let words = |key: &str| lookup(key).map(|v| split_words(&v)).unwrap_or_default();
        let dirs = |key: &str| {
            lookup(key)
                .map(|v| {
                    env::split_paths(&v)
                        .filter(|p| !p.as_os_str().is_empty())
                        .collect::<Vec<PathBuf>>()
                })
                .unwrap_or_default()
        };

        Self {
            libraries: words("BLAS_LIBS"),
            library_dirs: dirs("BLAS_LIBRARY_DIRS"),
            include_dirs: dirs("BLAS_INCLUDE_DIRS"),
            define_macros: lookup("BLAS_DEFINE_MACROS")
                .map(|v| parse_macros(&v))
                .unwrap_or_default(),
            extra_compile_args: words("BLAS_EXTRA_COMPILE_ARGS"),
            extra_link_args: words("BLAS_EXTRA_LINK_ARGS"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
            && self.library_dirs.is_empty()
            && self.include_dirs.is_empty()
            && self.define_macros.is_empty()
            && self.extra_compile_args.is_empty()
            && self.extra_link_args.is_empty()
    }
}

fn split_words(value: &str) -> Vec<String> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_macros(value: &str) -> Vec<DefineMacro> {
    value
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(|m| match m.split_once('=') {
            Some((name, value)) => (name.trim().to_string(), Some(value.trim().to_string())),
            None => (m.to_string(), None),
        })
        .collect()
}

/// True when the BLAS description says ATLAS is missing or broken.
///
/// `NO_ATLAS_INFO` marks a missing ATLAS; an `ATLAS_INFO` whose value
/// contains `None` shows up on some BSD installations.
pub fn atlas_not_found(info: &BlasInfo) -> bool {
    info.define_macros.iter().any(|(name, value)| match name.as_str() {
        "NO_ATLAS_INFO" => true,
        "ATLAS_INFO" => value.as_deref().is_some_and(|v| v.contains("None")),
        _ => false,
    })
}

/// Splits `info` into the CBLAS libraries to link and the remaining settings.
pub fn get_blas_info(mut info: BlasInfo) -> (Vec<String>, BlasInfo) {
    let libraries = std::mem::take(&mut info.libraries);

    if (info.is_empty() && libraries.is_empty()) || atlas_not_found(&info) {
        if !libraries.is_empty() {
            warn!("ignoring BLAS libraries {:?}: ATLAS not found", libraries);
        }
        debug!("falling back to {}", FALLBACK_CBLAS);
        (vec![FALLBACK_CBLAS.to_string()], info)
    } else {
        (libraries, info)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    Posix,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(unix) { Platform::Posix } else { Platform::Other }
    }
}

/// One native build target.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Extension {
    pub name: String,
    pub sources: Vec<PathBuf>,
    pub include_dirs: Vec<PathBuf>,
    pub libraries: Vec<String>,
    pub library_dirs: Vec<PathBuf>,
    pub define_macros: Vec<DefineMacro>,
    pub extra_compile_args: Vec<String>,
    pub extra_link_args: Vec<String>,
}

impl Extension {
    pub fn new(name: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self { name: name.into(), sources: vec![source.into()], ..Self::default() }
    }

    fn with_blas(mut self, libraries: &[String], include_dirs: &[PathBuf], info: &BlasInfo) -> Self {
        self.include_dirs = include_dirs.to_vec();
        self.libraries = libraries.to_vec();
        self.library_dirs = info.library_dirs.clone();
        self.define_macros = info.define_macros.clone();
        self.extra_compile_args = info.extra_compile_args.clone();
        self.extra_link_args = info.extra_link_args.clone();
        self
    }

    /// Cargo build-script directives linking this target's libraries.
    pub fn link_directives(&self) -> Vec<String> {
        let search = self
            .library_dirs
            .iter()
            .map(|dir| format!("cargo:rustc-link-search=native={}", dir.display()));
        let libs = self.libraries.iter().map(|lib| format!("cargo:rustc-link-lib={}", lib));
        search.chain(libs).collect()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub name: String,
    pub extensions: Vec<Extension>,
}

impl Configuration {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), extensions: Vec::new() }
    }

    pub fn add_extension(&mut self, extension: Extension) {
        self.extensions.push(extension);
    }

    pub fn extension(&self, name: &str) -> Option<&Extension> {
        self.extensions.iter().find(|ext| ext.name == name)
    }

    pub fn extension_names(&self) -> Vec<&str> {
        self.extensions.iter().map(|ext| ext.name.as_str()).collect()
    }
}

/// Declares the `seq_dataset`, `weight_vector` and `sgd_fast` targets.
pub fn configuration(info: BlasInfo, platform: Platform) -> Configuration {
    let mut config = Configuration::new(PACKAGE_NAME);

    let (mut cblas_libs, info) = get_blas_info(info);
    let mut cblas_includes = vec![PathBuf::from("src").join("cblas")];
    cblas_includes.extend(info.include_dirs.iter().cloned());

    if platform == Platform::Posix {
        cblas_libs.push(MATH_LIBRARY.to_string());
    }

    config.add_extension(Extension::new("seq_dataset", PathBuf::from("src").join("seq_dataset.rs")));
    config.add_extension(
        Extension::new("weight_vector", PathBuf::from("src").join("weight_vector.rs"))
            .with_blas(&cblas_libs, &cblas_includes, &info),
    );
    config.add_extension(
        Extension::new(
            "sgd_fast",
            PathBuf::from("src").join("linear_model").join("sgd_fast.rs"),
        )
        .with_blas(&cblas_libs, &cblas_includes, &info),
    );

    debug!("{} targets: {:?}", config.name, config.extension_names());
    config
}

/// Package metadata, as recorded in the crate manifest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PackageMetadata {
    pub name: &'static str,
    pub version: &'static str,
    pub authors: Vec<&'static str>,
    pub description: &'static str,
    pub license: &'static str,
    pub repository: Option<&'static str>,
}

impl PackageMetadata {
    pub fn current() -> Self {
        let repository = env!("CARGO_PKG_REPOSITORY");
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            authors: env!("CARGO_PKG_AUTHORS")
                .split(':')
                .filter(|a| !a.is_empty())
                .collect(),
            description: env!("CARGO_PKG_DESCRIPTION"),
            license: env!("CARGO_PKG_LICENSE"),
            repository: if repository.is_empty() { None } else { Some(repository) },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    fn openblas() -> BlasInfo {
        BlasInfo {
            libraries: vec!["openblas".to_string()],
            library_dirs: vec![PathBuf::from("/opt/openblas/lib")],
            include_dirs: vec![PathBuf::from("/opt/openblas/include")],
            define_macros: vec![("HAVE_CBLAS".to_string(), None)],
            extra_compile_args: vec!["-O3".to_string()],
            extra_link_args: Vec::new(),
        }
    }

    #[test]
    fn test_from_lookup_parses_lists() {
        let info = BlasInfo::from_lookup(lookup(&[
            ("BLAS_LIBS", "openblas, gfortran"),
            ("BLAS_DEFINE_MACROS", "HAVE_CBLAS,ATLAS_INFO=\"3.10\""),
            ("BLAS_EXTRA_COMPILE_ARGS", "-O3 -march=native"),
        ]));

        assert_eq!(info.libraries, vec!["openblas", "gfortran"]);
        assert_eq!(info.define_macros[0], ("HAVE_CBLAS".to_string(), None));
        assert_eq!(
            info.define_macros[1],
            ("ATLAS_INFO".to_string(), Some("\"3.10\"".to_string()))
        );
        assert_eq!(info.extra_compile_args.len(), 2);
        assert!(info.library_dirs.is_empty());
        assert!(BlasInfo::from_lookup(|_| None).is_empty());
    }

    #[test]
    fn test_atlas_not_found() {
        let mut info = BlasInfo::default();
        assert!(!atlas_not_found(&info));

        info.define_macros = vec![("NO_ATLAS_INFO".to_string(), Some("1".to_string()))];
        assert!(atlas_not_found(&info));

        info.define_macros = vec![("ATLAS_INFO".to_string(), Some("\"None\"".to_string()))];
        assert!(atlas_not_found(&info));

        info.define_macros = vec![("ATLAS_INFO".to_string(), Some("\"3.10.3\"".to_string()))];
        assert!(!atlas_not_found(&info));
    }

    #[test]
    fn test_get_blas_info_uses_discovered_libraries() {
        let (libs, rest) = get_blas_info(openblas());
        assert_eq!(libs, vec!["openblas"]);
        assert!(rest.libraries.is_empty());
        assert_eq!(rest.include_dirs, vec![PathBuf::from("/opt/openblas/include")]);
    }

    #[test]
    fn test_get_blas_info_falls_back_without_atlas() {
        let mut info = openblas();
        info.define_macros.push(("NO_ATLAS_INFO".to_string(), Some("1".to_string())));
        let (libs, rest) = get_blas_info(info);
        assert_eq!(libs, vec![FALLBACK_CBLAS]);
        assert!(rest.libraries.is_empty());

        let (libs, _) = get_blas_info(BlasInfo::default());
        assert_eq!(libs, vec![FALLBACK_CBLAS]);
    }

    #[test]
    fn test_configuration_with_blas() {
        let config = configuration(openblas(), Platform::Posix);
        assert_eq!(config.name, PACKAGE_NAME);
        assert_eq!(config.extension_names(), vec!["seq_dataset", "weight_vector", "sgd_fast"]);

        let seq = config.extension("seq_dataset").unwrap();
        assert!(seq.libraries.is_empty());

        for name in ["weight_vector", "sgd_fast"] {
            let ext = config.extension(name).unwrap();
            assert!(!ext.libraries.is_empty());
            assert_eq!(ext.libraries, vec!["openblas", "m"]);
            assert_eq!(ext.include_dirs[0], PathBuf::from("src").join("cblas"));
            assert_eq!(ext.include_dirs[1], PathBuf::from("/opt/openblas/include"));
            assert_eq!(ext.extra_compile_args, vec!["-O3"]);
        }
    }

    #[test]
    fn test_configuration_without_blas() {
        let posix = configuration(BlasInfo::default(), Platform::Posix);
        assert_eq!(posix.extension("weight_vector").unwrap().libraries, vec!["cblas", "m"]);

        let other = configuration(BlasInfo::default(), Platform::Other);
        assert_eq!(other.extension("sgd_fast").unwrap().libraries, vec!["cblas"]);
    }

    #[test]
    fn test_link_directives() {
        let config = configuration(openblas(), Platform::Posix);
        let directives = config.extension("sgd_fast").unwrap().link_directives();
        assert_eq!(
            directives,
            vec![
                "cargo:rustc-link-search=native=/opt/openblas/lib",
                "cargo:rustc-link-lib=openblas",
                "cargo:rustc-link-lib=m",
            ]
        );
    }

    #[test]
    fn test_configuration_serializes() {
        let config = configuration(openblas(), Platform::Other);
        let json = serde_json::to_string(&config).unwrap();
        let back: Configuration = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_package_metadata() {
        let meta = PackageMetadata::current();
        assert_eq!(meta.name, "priorsgd");
        assert!(!meta.version.is_empty());
        assert!(!meta.description.is_empty());
    }
}
