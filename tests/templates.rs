// ABOUTME: Integration tests for loading templates from a templates directory.
// ABOUTME: Exercises lookup, hook slot reporting, and env resolution into a container config.

use rollover::adapter::{AdapterCapabilities, CapabilityError, Hook};
use rollover::template::{MANAGED_LABEL, TemplateError, TemplateStore};
use rollover::types::ContainerName;
use std::fs;

const GITEA: &str = r#"
image: gitea/gitea:1.22
run:
  ports: ["3000:3000", "127.0.0.1:2222:22"]
  volumes: ["/srv/gitea:/data"]
  env:
    USER_UID: "1000"
    GITEA__database__PASSWD: { env: ROLLOVER_IT_GITEA_DB_PASS }
  restart: unless-stopped
health: running
version: { exec: ["gitea", "--version"] }
"#;

fn store_with(files: &[(&str, &str)]) -> (tempfile::TempDir, TemplateStore) {
    let dir = tempfile::tempdir().unwrap();
    for (name, body) in files {
        fs::write(dir.path().join(name), body).unwrap();
    }
    let store = TemplateStore::new(dir.path());
    (dir, store)
}

#[test]
fn loaded_template_reports_capabilities() {
    let (_dir, store) = store_with(&[("gitea.yml", GITEA)]);
    let template = store.load("gitea").unwrap();

    let caps = AdapterCapabilities::detect(template.hook_slots()).unwrap();
    assert!(caps.version);
    assert!(!caps.maintenance && !caps.backup && !caps.post_start);
}

#[test]
fn unpaired_backup_fails_validation() {
    let (_dir, store) = store_with(&[(
        "app.yaml",
        "image: app:1\nrun: {}\nhealth: running\nbackup:\n  create: { host: [\"true\"] }\n",
    )]);
    let template = store.load("app").unwrap();

    assert_eq!(
        AdapterCapabilities::detect(template.hook_slots()),
        Err(CapabilityError::Unpaired {
            present: Hook::Backup,
            missing: Hook::Restore,
        })
    );
}

#[test]
fn env_references_resolve_when_building_container_config() {
    let (_dir, store) = store_with(&[("gitea.yml", GITEA)]);
    let template = store.load("gitea").unwrap();
    let run = template.run.as_ref().unwrap();
    let name = ContainerName::new("gitea-sha256-beef").unwrap();

    temp_env::with_var("ROLLOVER_IT_GITEA_DB_PASS", Some("hunter2"), || {
        let config = run.container_config(&name, &template.image).unwrap();
        assert_eq!(config.env["GITEA__database__PASSWD"], "hunter2");
        assert_eq!(config.env["USER_UID"], "1000");
        assert_eq!(config.labels[MANAGED_LABEL], "true");
        assert_eq!(config.ports.len(), 2);
        assert_eq!(config.ports[1].host_ip.as_deref(), Some("127.0.0.1"));
    });

    temp_env::with_var_unset("ROLLOVER_IT_GITEA_DB_PASS", || {
        assert!(matches!(
            run.container_config(&name, &template.image),
            Err(TemplateError::MissingEnvVar(var)) if var == "ROLLOVER_IT_GITEA_DB_PASS"
        ));
    });
}

#[test]
fn unknown_template_is_not_found() {
    let (_dir, store) = store_with(&[("gitea.yml", GITEA)]);
    assert!(matches!(
        store.load("nextcloud"),
        Err(TemplateError::NotFound { id, .. }) if id == "nextcloud"
    ));
}
