//! The target catalog: which components the host must converge to.
//!
//! Each [`Component`] pins an exact version and carries everything the
//! engine needs to detect, remove, and install it. The catalog is built
//! once at process start and never mutated.

use crate::version::Version;
use serde::Serialize;
use std::path::PathBuf;

/// Where a component's files must live after a successful install.
///
/// Venv-scoped installs may only write under the virtual environment
/// root; system-scoped installs may never resolve into it. The two
/// namespaces are disjoint by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Lives inside the isolated virtual environment.
    Venv,
    /// Lives in a system-wide location.
    System,
}

/// How the inspector discovers a component's installed state.
#[derive(Debug, Clone)]
pub enum Probe {
    /// Run a version-reporting command and pattern-match its output.
    Command { command: String },
    /// Query the venv's pip for a package (yields version and location).
    VenvPackage { package: String },
    /// Query the global module installer for a module (yields version
    /// and the global module root).
    GlobalModule { module: String },
}

/// Parameters for a from-source build.
#[derive(Debug, Clone)]
pub struct SourceBuild {
    /// URL of the source archive (gzipped tarball).
    pub archive_url: String,
    /// Install prefix passed to `./configure`.
    pub prefix: PathBuf,
    /// Extra `./configure` arguments.
    pub configure_args: Vec<String>,
}

/// How the executor installs a component.
#[derive(Debug, Clone)]
pub enum InstallStrategy {
    /// Download, unpack, configure, compile, install to a fixed prefix.
    BuildFromSource(SourceBuild),
    /// Exact-pin install through the virtual environment's pip.
    PackageManager { package: String },
    /// Same mechanism as [`InstallStrategy::PackageManager`], for
    /// secondary pinned dependencies.
    LanguageRuntimePackage { package: String },
    /// Exact-pin install through the global module installer, outside
    /// any isolated environment.
    GlobalModuleInstall { module: String },
    /// Install by name through the system package manager.
    SystemPackage { package: String },
}

impl InstallStrategy {
    /// Short label for log lines and reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::BuildFromSource(_) => "build from source",
            Self::PackageManager { .. } => "venv package",
            Self::LanguageRuntimePackage { .. } => "venv package (dependency)",
            Self::GlobalModuleInstall { .. } => "global module",
            Self::SystemPackage { .. } => "system package",
        }
    }
}

/// A single convergence target. Immutable once the catalog is built.
#[derive(Debug, Clone)]
pub struct Component {
    /// Component name, unique within the catalog.
    pub name: String,
    /// Exact version pin. Anything else on the host is a mismatch.
    pub required_version: Version,
    /// Which namespace the install must land in.
    pub scope: Scope,
    /// Detection strategy.
    pub probe: Probe,
    /// Install strategy.
    pub strategy: InstallStrategy,
    /// Ordered removal commands run before a reinstall. `{venv}` is
    /// interpolated with the environment root. Failures here are
    /// warnings, never fatal.
    pub removal_commands: Vec<String>,
}

impl Component {
    /// Whether this component's install must land under the venv root.
    pub fn is_venv_scoped(&self) -> bool {
        self.scope == Scope::Venv
    }
}

/// The pinned reverse-engineering toolchain.
///
/// Order matters: the interpreter comes first because the virtual
/// environment is created from it, venv packages follow, and the global
/// compiler comes after Node.js which provides its runtime.
pub fn builtin_catalog() -> Vec<Component> {
    vec![
        Component {
            name: "python".into(),
            required_version: Version::new("3.11.0"),
            scope: Scope::System,
            probe: Probe::Command {
                command: "python3.11 --version".into(),
            },
            strategy: InstallStrategy::BuildFromSource(SourceBuild {
                archive_url: "https://www.python.org/ftp/python/3.11.0/Python-3.11.0.tgz".into(),
                prefix: PathBuf::from("/usr/local"),
                configure_args: vec!["--enable-optimizations".into()],
            }),
            removal_commands: vec![
                "rm -rf /usr/local/lib/python3.11".into(),
                "rm -f /usr/local/bin/python3.11 /usr/local/bin/pip3.11".into(),
            ],
        },
        Component {
            name: "frida".into(),
            required_version: Version::new("16.1.4"),
            scope: Scope::Venv,
            probe: Probe::VenvPackage {
                package: "frida".into(),
            },
            strategy: InstallStrategy::PackageManager {
                package: "frida".into(),
            },
            removal_commands: vec!["{venv}/bin/pip uninstall -y frida".into()],
        },
        Component {
            name: "frida-tools".into(),
            required_version: Version::new("12.3.0"),
            scope: Scope::Venv,
            probe: Probe::VenvPackage {
                package: "frida-tools".into(),
            },
            strategy: InstallStrategy::PackageManager {
                package: "frida-tools".into(),
            },
            removal_commands: vec!["{venv}/bin/pip uninstall -y frida-tools".into()],
        },
        Component {
            name: "pyro4".into(),
            required_version: Version::new("4.82"),
            scope: Scope::Venv,
            probe: Probe::VenvPackage {
                package: "Pyro4".into(),
            },
            strategy: InstallStrategy::LanguageRuntimePackage {
                package: "Pyro4".into(),
            },
            removal_commands: vec!["{venv}/bin/pip uninstall -y Pyro4".into()],
        },
        Component {
            name: "node".into(),
            required_version: Version::new("18.19.0"),
            scope: Scope::System,
            probe: Probe::Command {
                command: "node --version".into(),
            },
            strategy: InstallStrategy::SystemPackage {
                package: "nodejs".into(),
            },
            removal_commands: vec!["apt-get remove -y nodejs".into()],
        },
        Component {
            name: "frida-compile".into(),
            required_version: Version::new("10.2.5"),
            scope: Scope::System,
            probe: Probe::GlobalModule {
                module: "frida-compile".into(),
            },
            strategy: InstallStrategy::GlobalModuleInstall {
                module: "frida-compile".into(),
            },
            removal_commands: vec!["npm uninstall -g frida-compile".into()],
        },
    ]
}
