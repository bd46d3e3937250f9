//! End-to-end convergence scenarios over a scripted fake host.
//!
//! The fake implements the `CommandRunner` seam: probes read from an
//! in-memory host model and install commands mutate it, so a full run
//! (inspect, decide, execute, reverify) can be asserted without touching
//! the real machine.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use toolpin::catalog::{Component, InstallStrategy, Probe, Scope};
use toolpin::context::RunContext;
use toolpin::engine::{Engine, RunProgress};
use toolpin::reconcile::Action;
use toolpin::shell::{CommandOptions, CommandResult, CommandRunner};
use toolpin::version::Version;

/// In-memory host model answering every command the engine can issue.
#[derive(Default)]
struct FakeHost {
    /// System packages by name -> installed version ("python3.11", "nodejs").
    system: Mutex<HashMap<String, String>>,
    /// The venv: None when absent, otherwise package -> version.
    venv: Mutex<Option<HashMap<String, String>>>,
    /// Global npm modules by name -> version.
    npm_globals: Mutex<HashMap<String, String>>,
    /// Every command the engine ran, in order.
    log: Mutex<Vec<String>>,
    /// Simulate the fatal prerequisite: venv creation exits non-zero.
    fail_venv_create: bool,
    /// Venv creation only works once the interpreter is installed, like
    /// on a real host.
    venv_requires_python: bool,
}

impl FakeHost {
    fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn mutating_commands(&self) -> Vec<String> {
        self.log()
            .into_iter()
            .filter(|c| {
                c.contains("install") || c.contains("uninstall") || c.contains("remove") || c.contains("-m venv")
            })
            .collect()
    }
}

fn ok(stdout: String) -> CommandResult {
    CommandResult::success(stdout, String::new(), Duration::ZERO)
}

fn fail(code: i32) -> CommandResult {
    CommandResult::failure(Some(code), String::new(), String::new(), Duration::ZERO)
}

impl CommandRunner for FakeHost {
    fn run(&self, command: &str, _options: &CommandOptions) -> toolpin::Result<CommandResult> {
        self.log.lock().unwrap().push(command.to_string());

        // Version probes for system binaries.
        if command == "python3.11 --version" {
            return Ok(match self.system.lock().unwrap().get("python3.11") {
                Some(v) => ok(format!("Python {}\n", v)),
                None => fail(127),
            });
        }
        if command == "node --version" {
            return Ok(match self.system.lock().unwrap().get("nodejs") {
                Some(v) => ok(format!("v{}\n", v)),
                None => fail(127),
            });
        }

        // Venv creation.
        if command.contains("-m venv") {
            if self.fail_venv_create {
                return Ok(fail(1));
            }
            if self.venv_requires_python && !self.system.lock().unwrap().contains_key("python3.11")
            {
                return Ok(fail(127));
            }
            *self.venv.lock().unwrap() = Some(HashMap::new());
            return Ok(ok(String::new()));
        }

        // Pip inside the venv. The pip path is the first token.
        if command.contains("/bin/pip ") {
            let (pip_path, rest) = command.split_once(' ').expect("pip command has args");
            let venv_root = pip_path.trim_end_matches("/bin/pip").to_string();
            let mut venv = self.venv.lock().unwrap();

            if let Some(pkg) = rest.strip_prefix("show ") {
                return Ok(match venv.as_ref().and_then(|pkgs| pkgs.get(pkg)) {
                    Some(v) => ok(format!(
                        "Name: {}\nVersion: {}\nLocation: {}/lib/python3.11/site-packages\n",
                        pkg, v, venv_root
                    )),
                    None => fail(1),
                });
            }
            if let Some(spec) = rest.strip_prefix("install ") {
                let Some(pkgs) = venv.as_mut() else {
                    return Ok(fail(1));
                };
                let (pkg, version) = spec.split_once("==").expect("exact pin");
                pkgs.insert(pkg.to_string(), version.to_string());
                return Ok(ok(String::new()));
            }
            if rest.starts_with("uninstall") {
                let pkg = rest.rsplit(' ').next().unwrap_or_default();
                return Ok(match venv.as_mut().and_then(|pkgs| pkgs.remove(pkg)) {
                    Some(_) => ok(String::new()),
                    None => fail(1),
                });
            }
        }

        // System package manager.
        if let Some(spec) = command.strip_prefix("apt-get install -y --allow-downgrades ") {
            let (pkg, version) = spec.split_once('=').expect("pinned apt spec");
            self.system
                .lock()
                .unwrap()
                .insert(pkg.to_string(), version.trim_end_matches('*').to_string());
            return Ok(ok(String::new()));
        }
        if let Some(pkg) = command.strip_prefix("apt-get remove -y ") {
            self.system.lock().unwrap().remove(pkg);
            return Ok(ok(String::new()));
        }

        // Global module installer.
        if let Some(rest) = command.strip_prefix("npm ls -g ") {
            let module = rest.split(' ').next().unwrap_or_default();
            return Ok(match self.npm_globals.lock().unwrap().get(module) {
                Some(v) => ok(format!("/usr/lib\n`-- {}@{}\n", module, v)),
                None => fail(1),
            });
        }
        if command == "npm root -g" {
            return Ok(ok("/usr/lib/node_modules\n".to_string()));
        }
        if let Some(spec) = command.strip_prefix("npm install -g ") {
            let (module, version) = spec.split_once('@').expect("pinned npm spec");
            self.npm_globals
                .lock()
                .unwrap()
                .insert(module.to_string(), version.to_string());
            return Ok(ok(String::new()));
        }
        if let Some(module) = command.strip_prefix("npm uninstall -g ") {
            self.npm_globals.lock().unwrap().remove(module);
            return Ok(ok(String::new()));
        }

        Ok(fail(127))
    }
}

/// A catalog shaped like the builtin one, with the interpreter installable
/// through the fake's package manager instead of a real source build.
fn test_catalog() -> Vec<Component> {
    vec![
        Component {
            name: "python".into(),
            required_version: Version::new("3.11.0"),
            scope: Scope::System,
            probe: Probe::Command {
                command: "python3.11 --version".into(),
            },
            strategy: InstallStrategy::SystemPackage {
                package: "python3.11".into(),
            },
            removal_commands: vec!["apt-get remove -y python3.11".into()],
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

/// A fake host already converged to the catalog pins.
fn converged_host() -> FakeHost {
    let host = FakeHost::default();
    {
        let mut system = host.system.lock().unwrap();
        system.insert("python3.11".into(), "3.11.0".into());
        system.insert("nodejs".into(), "18.19.0".into());
    }
    {
        let mut pkgs = HashMap::new();
        pkgs.insert("frida".to_string(), "16.1.4".to_string());
        pkgs.insert("Pyro4".to_string(), "4.82".to_string());
        *host.venv.lock().unwrap() = Some(pkgs);
    }
    host.npm_globals
        .lock()
        .unwrap()
        .insert("frida-compile".into(), "10.2.5".into());
    host
}

fn venv_root(temp: &tempfile::TempDir) -> PathBuf {
    temp.path().join("venv")
}

#[test]
fn converged_host_yields_all_keep_and_zero_errors() {
    let temp = tempfile::TempDir::new().unwrap();
    let host = converged_host();
    let ctx = RunContext::new(venv_root(&temp), &host, None);
    let catalog = test_catalog();
    let engine = Engine::new(&catalog, &ctx);

    let outcome = engine.run(|_| {});

    for component in &outcome.components {
        assert_eq!(
            component.decision.action,
            Action::Keep,
            "{} should be kept",
            component.decision.component
        );
        assert!(component.execution.succeeded);
    }
    assert_eq!(outcome.report.error_count, 0);
    assert!(outcome.report.passed());
    assert!(
        host.mutating_commands().is_empty(),
        "no destructive action on a converged host: {:?}",
        host.mutating_commands()
    );
}

#[test]
fn second_run_after_convergence_is_all_keep() {
    let temp = tempfile::TempDir::new().unwrap();
    let host = FakeHost::default();
    let ctx = RunContext::new(venv_root(&temp), &host, None);
    let catalog = test_catalog();
    let engine = Engine::new(&catalog, &ctx);

    // First run starts from an empty host and must converge everything.
    let first = engine.run(|_| {});
    assert_eq!(first.report.error_count, 0, "first run must converge");
    for component in &first.components {
        assert_eq!(component.decision.action, Action::Install);
    }

    // Second run finds the converged host and does nothing.
    host.log.lock().unwrap().clear();
    let second = engine.run(|_| {});
    assert_eq!(second.report.error_count, 0);
    for component in &second.components {
        assert_eq!(component.decision.action, Action::Keep);
    }
    assert!(host.mutating_commands().is_empty());
}

#[test]
fn newer_runtime_is_downgraded_to_the_pin() {
    let temp = tempfile::TempDir::new().unwrap();
    let host = converged_host();
    host.system
        .lock()
        .unwrap()
        .insert("python3.11".into(), "3.11.9".into());

    let ctx = RunContext::new(venv_root(&temp), &host, None);
    let catalog = test_catalog();
    let engine = Engine::new(&catalog, &ctx);

    let outcome = engine.run(|_| {});

    let python = &outcome.components[0];
    assert_eq!(python.decision.action, Action::Reinstall);
    assert_eq!(
        python.initial.detected_version,
        Some(Version::new("3.11.9"))
    );

    // Removal ran strictly before the install.
    let log = host.log();
    let remove_idx = log
        .iter()
        .position(|c| c == "apt-get remove -y python3.11")
        .expect("removal command ran");
    let install_idx = log
        .iter()
        .position(|c| c.starts_with("apt-get install") && c.contains("python3.11"))
        .expect("install command ran");
    assert!(remove_idx < install_idx);

    // Reverification sees the pin.
    assert!(outcome.report.passed());
    let report = &outcome.report.components[0];
    assert_eq!(report.detected_version, Some(Version::new("3.11.0")));
}

#[test]
fn mismatched_venv_package_recreates_environment_and_converges() {
    let temp = tempfile::TempDir::new().unwrap();
    let host = converged_host();
    host.venv
        .lock()
        .unwrap()
        .as_mut()
        .unwrap()
        .insert("frida".into(), "16.0.2".into());

    let ctx = RunContext::new(venv_root(&temp), &host, None);
    let catalog = test_catalog();
    let engine = Engine::new(&catalog, &ctx);

    let mut env_recreated = false;
    let outcome = engine.run(|progress| {
        if matches!(progress, RunProgress::EnvironmentRecreating) {
            env_recreated = true;
        }
    });

    assert!(env_recreated, "environment must be wiped and recreated");
    assert!(outcome.report.passed());

    // Pyro4 was decided Keep, but the recreated environment means its
    // package had to be put back too.
    let pyro = outcome
        .components
        .iter()
        .find(|c| c.decision.component == "pyro4")
        .unwrap();
    assert_eq!(pyro.decision.action, Action::Keep);
    assert!(host
        .log()
        .iter()
        .any(|c| c.contains("pip install Pyro4==4.82")));
}

#[test]
fn fresh_host_converges_in_one_pass_when_venv_needs_the_interpreter() {
    // Nothing installed, and venv creation only works once the
    // interpreter exists. The environment must be created after the
    // interpreter install, not hoisted ahead of it.
    let temp = tempfile::TempDir::new().unwrap();
    let host = FakeHost {
        venv_requires_python: true,
        ..FakeHost::default()
    };
    let ctx = RunContext::new(venv_root(&temp), &host, None);
    let catalog = test_catalog();
    let engine = Engine::new(&catalog, &ctx);

    let outcome = engine.run(|_| {});

    assert!(!outcome.prerequisite_failed);
    assert_eq!(outcome.report.error_count, 0);
    assert!(outcome.report.passed());

    let log = host.log();
    let python_install = log
        .iter()
        .position(|c| c.starts_with("apt-get install") && c.contains("python3.11"))
        .expect("interpreter install ran");
    let venv_create = log
        .iter()
        .position(|c| c.contains("-m venv"))
        .expect("venv creation ran");
    assert!(
        python_install < venv_create,
        "environment must be created after the interpreter: {:?}",
        log
    );
}

#[test]
fn venv_creation_failure_fails_venv_components_without_attempt() {
    let temp = tempfile::TempDir::new().unwrap();
    let host = FakeHost {
        fail_venv_create: true,
        ..FakeHost::default()
    };
    let ctx = RunContext::new(venv_root(&temp), &host, None);
    let catalog = test_catalog();
    let engine = Engine::new(&catalog, &ctx);

    let mut executing: Vec<String> = Vec::new();
    let outcome = engine.run(|progress| {
        if let RunProgress::Executing { component, .. } = progress {
            executing.push(component.to_string());
        }
    });

    assert!(outcome.prerequisite_failed);

    // Venv-scoped components: failed, never entered execution.
    for name in ["frida", "pyro4"] {
        let component = outcome
            .components
            .iter()
            .find(|c| c.decision.component == name)
            .unwrap();
        assert!(!component.execution.succeeded);
        assert!(component
            .execution
            .error_detail
            .as_deref()
            .unwrap()
            .contains("not attempted"));
        assert!(
            !executing.contains(&name.to_string()),
            "{} must not enter execution",
            name
        );
    }

    // System-scoped components were still attempted and converged.
    for name in ["python", "node", "frida-compile"] {
        let component = outcome
            .components
            .iter()
            .find(|c| c.decision.component == name)
            .unwrap();
        assert!(component.execution.succeeded, "{} should converge", name);
        assert!(executing.contains(&name.to_string()));
    }

    assert_eq!(outcome.report.error_count, 2);
}

#[test]
fn pinned_global_tool_is_kept_without_invoking_the_installer() {
    let temp = tempfile::TempDir::new().unwrap();
    let host = converged_host();
    let ctx = RunContext::new(venv_root(&temp), &host, None);
    let catalog = test_catalog();
    let engine = Engine::new(&catalog, &ctx);

    let outcome = engine.run(|_| {});

    let compiler = outcome
        .components
        .iter()
        .find(|c| c.decision.component == "frida-compile")
        .unwrap();
    assert_eq!(compiler.decision.action, Action::Keep);

    let report = outcome
        .report
        .components
        .iter()
        .find(|c| c.component == "frida-compile")
        .unwrap();
    assert!(report.passed);
    assert!(!host.log().iter().any(|c| c.starts_with("npm install")));
}

#[test]
fn separation_invariant_holds_after_convergence() {
    let temp = tempfile::TempDir::new().unwrap();
    let host = FakeHost::default();
    let root = venv_root(&temp);
    let ctx = RunContext::new(root.clone(), &host, None);
    let catalog = test_catalog();
    let engine = Engine::new(&catalog, &ctx);

    let outcome = engine.run(|_| {});
    assert!(outcome.report.passed());

    for report in &outcome.report.components {
        let component = catalog
            .iter()
            .find(|c| c.name == report.component)
            .unwrap();
        if let Some(path) = &report.install_path {
            if component.scope == Scope::Venv {
                assert!(
                    path.starts_with(&root),
                    "{} must resolve under the venv root",
                    report.component
                );
            } else {
                assert!(
                    !path.starts_with(&root),
                    "{} must resolve outside the venv root",
                    report.component
                );
            }
        }
    }
}

#[test]
fn failed_install_is_collected_and_run_continues() {
    // A host where npm is entirely absent: the global compiler install
    // fails, but every other component still converges.
    struct NoNpmHost(FakeHost);
    impl CommandRunner for NoNpmHost {
        fn run(
            &self,
            command: &str,
            options: &CommandOptions,
        ) -> toolpin::Result<CommandResult> {
            if command.starts_with("npm") {
                self.0.log.lock().unwrap().push(command.to_string());
                return Ok(fail(127));
            }
            self.0.run(command, options)
        }
    }

    let temp = tempfile::TempDir::new().unwrap();
    let host = NoNpmHost(FakeHost::default());
    let ctx = RunContext::new(venv_root(&temp), &host, None);
    let catalog = test_catalog();
    let engine = Engine::new(&catalog, &ctx);

    let outcome = engine.run(|_| {});

    let compiler = outcome
        .components
        .iter()
        .find(|c| c.decision.component == "frida-compile")
        .unwrap();
    assert!(!compiler.execution.succeeded);
    assert!(compiler.execution.error_detail.is_some());

    // Everything else converged regardless.
    assert_eq!(outcome.report.error_count, 1);
    let failing: Vec<_> = outcome.report.failing().collect();
    assert_eq!(failing[0].component, "frida-compile");
    assert!(failing[0].detail.contains("expected 10.2.5"));
}
