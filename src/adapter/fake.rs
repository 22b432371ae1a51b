// ABOUTME: Scriptable adapter for unit tests, journaling hook calls into a FakeRuntime.
// ABOUTME: Health, failing hooks and reported versions are configured per test.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};

use super::{ApplicationAdapter, Hook, HookError, HookSlots};
use crate::runtime::fake::{Call, FakeRuntime};
use crate::template::TemplateError;
use crate::types::{ContainerName, ImageRef};

pub struct FakeAdapter<'r> {
    runtime: &'r FakeRuntime,
    slots: HookSlots,
    /// First evaluation that reports healthy; `None` never does.
    healthy_from: Option<u32>,
    evaluations: AtomicU32,
    failing: Mutex<HashSet<Hook>>,
    /// Version reported per image identity.
    versions: HashMap<String, String>,
    /// Env var reported missing by `preflight`.
    missing_env: Option<String>,
    /// Health evaluations never complete.
    hangs: bool,
}

impl<'r> FakeAdapter<'r> {
    /// Mandatory hooks only, healthy on the first evaluation.
    pub fn new(runtime: &'r FakeRuntime) -> Self {
        Self {
            runtime,
            slots: HookSlots {
                start_instance: true,
                is_running: true,
                ..HookSlots::default()
            },
            healthy_from: Some(1),
            evaluations: AtomicU32::new(0),
            failing: Mutex::new(HashSet::new()),
            versions: HashMap::new(),
            missing_env: None,
            hangs: false,
        }
    }

    pub fn with_slots(mut self, slots: HookSlots) -> Self {
        self.slots = slots;
        self
    }

    pub fn with_maintenance(mut self) -> Self {
        self.slots.enter_maintenance = true;
        self.slots.exit_maintenance = true;
        self
    }

    pub fn with_backup(mut self) -> Self {
        self.slots.backup = true;
        self.slots.restore = true;
        self
    }

    pub fn with_post_start(mut self) -> Self {
        self.slots.post_start = true;
        self
    }

    pub fn with_version(mut self, image: &str, version: &str) -> Self {
        self.slots.version = true;
        self.versions.insert(image.to_string(), version.to_string());
        self
    }

    pub fn healthy_from(mut self, attempt: u32) -> Self {
        self.healthy_from = Some(attempt);
        self
    }

    pub fn never_healthy(mut self) -> Self {
        self.healthy_from = None;
        self
    }

    pub fn hanging(mut self) -> Self {
        self.hangs = true;
        self
    }

    pub fn failing(self, hook: Hook) -> Self {
        self.failing.lock().insert(hook);
        self
    }

    pub fn missing_env(mut self, var: &str) -> Self {
        self.missing_env = Some(var.to_string());
        self
    }

    pub fn evaluations(&self) -> u32 {
        self.evaluations.load(Ordering::SeqCst)
    }

    fn invoke(&self, hook: Hook, name: &ContainerName) -> Result<(), HookError> {
        self.runtime.record(Call::Hook(hook, name.to_string()));
        if self.failing.lock().contains(&hook) {
            return Err(HookError::Failed {
                hook,
                code: 1,
                stderr: "scripted failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ApplicationAdapter for FakeAdapter<'_> {
    fn hook_slots(&self) -> HookSlots {
        self.slots
    }

    fn preflight(&self, _container: &ContainerName) -> Result<(), HookError> {
        match &self.missing_env {
            Some(var) => Err(TemplateError::MissingEnvVar(var.clone()).into()),
            None => Ok(()),
        }
    }

    async fn start_instance(
        &self,
        name: &ContainerName,
        image: &ImageRef,
    ) -> Result<(), HookError> {
        self.invoke(Hook::StartInstance, name)?;
        self.runtime.launch(name.as_str(), image);
        Ok(())
    }

    async fn is_running(&self, name: &ContainerName) -> bool {
        self.runtime
            .record(Call::Hook(Hook::IsRunning, name.to_string()));
        let n = self.evaluations.fetch_add(1, Ordering::SeqCst) + 1;
        if self.hangs {
            std::future::pending::<()>().await;
        }
        self.healthy_from.is_some_and(|first| n >= first) && self.runtime.is_running(name.as_str())
    }

    async fn enter_maintenance(&self, name: &ContainerName) -> Result<(), HookError> {
        self.invoke(Hook::EnterMaintenance, name)
    }

    async fn exit_maintenance(&self, name: &ContainerName) -> Result<(), HookError> {
        self.invoke(Hook::ExitMaintenance, name)
    }

    async fn backup(&self, name: &ContainerName) -> Result<(), HookError> {
        self.invoke(Hook::Backup, name)
    }

    async fn restore(&self, name: &ContainerName) -> Result<(), HookError> {
        self.invoke(Hook::Restore, name)
    }

    async fn post_start(&self, name: &ContainerName) -> Result<(), HookError> {
        self.invoke(Hook::PostStart, name)
    }

    async fn get_version(&self, name: &ContainerName) -> Result<String, HookError> {
        self.invoke(Hook::Version, name)?;
        self.runtime
            .image_of(name.as_str())
            .and_then(|image| self.versions.get(&image).cloned())
            .ok_or(HookError::EmptyOutput(Hook::Version))
    }
}
