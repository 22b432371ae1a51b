// ABOUTME: In-memory runtime for unit tests: records every call in order.
// ABOUTME: Containers, image identities, exec results and failures are scripted per test.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use super::traits::sealed::Sealed;
use super::traits::{
    ContainerConfig, ContainerError, ContainerInfo, ContainerOps, ContainerState, ExecConfig,
    ExecError, ExecOps, ExecResult, ImageError, ImageOps,
};
use crate::adapter::Hook;
use crate::types::{ContainerId, ContainerName, ImageId, ImageRef};

/// One observed interaction, runtime or adapter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Call {
    Pull(String),
    InspectImage(String),
    Create(String),
    Start(String),
    Stop(String),
    Remove(String),
    Inspect(String),
    Rename(String, String),
    Exec(String, Vec<String>),
    Hook(Hook, String),
}

impl Call {
    /// Whether the call changes runtime state.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Call::Create(_) | Call::Start(_) | Call::Stop(_) | Call::Remove(_) | Call::Rename(..)
        ) || matches!(self, Call::Hook(Hook::StartInstance, _))
    }
}

#[derive(Debug, Clone)]
struct FakeContainer {
    id: ContainerId,
    image: ImageId,
    running: bool,
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    containers: HashMap<String, FakeContainer>,
    images: HashMap<String, ImageId>,
    exec_results: HashMap<Vec<String>, (i64, String)>,
    failures: HashSet<Call>,
    next_id: u32,
}

#[derive(Default)]
pub struct FakeRuntime {
    state: Mutex<State>,
}

impl Sealed for FakeRuntime {}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn mutating_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutating).collect()
    }

    pub fn record(&self, call: Call) {
        self.state.lock().calls.push(call);
    }

    /// Make the next and every later matching call fail.
    pub fn fail_on(&self, call: Call) {
        self.state.lock().failures.insert(call);
    }

    pub fn add_container(&self, name: &str, image: &str, running: bool) {
        let mut state = self.state.lock();
        let id = next_container_id(&mut state);
        state.containers.insert(
            name.to_string(),
            FakeContainer {
                id,
                image: ImageId::new(image),
                running,
            },
        );
    }

    /// Create a running instance of `image` without journaling runtime calls.
    pub fn launch(&self, name: &str, image: &ImageRef) {
        let mut state = self.state.lock();
        let image = state
            .images
            .get(&image.to_string())
            .cloned()
            .unwrap_or_else(|| ImageId::new(image.to_string()));
        let id = next_container_id(&mut state);
        state.containers.insert(
            name.to_string(),
            FakeContainer {
                id,
                image,
                running: true,
            },
        );
    }

    /// Identity `image` resolves to after a pull.
    pub fn set_image(&self, image: &str, id: &str) {
        self.state
            .lock()
            .images
            .insert(image.to_string(), ImageId::new(id));
    }

    pub fn set_exec_result(&self, cmd: &[&str], exit_code: i64, stdout: &str) {
        let cmd = cmd.iter().map(|s| s.to_string()).collect();
        self.state
            .lock()
            .exec_results
            .insert(cmd, (exit_code, stdout.to_string()));
    }

    pub fn exists(&self, name: &str) -> bool {
        self.state.lock().containers.contains_key(name)
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.state
            .lock()
            .containers
            .get(name)
            .is_some_and(|c| c.running)
    }

    pub fn container_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.state.lock().containers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn image_of(&self, name: &str) -> Option<String> {
        self.state
            .lock()
            .containers
            .get(name)
            .map(|c| c.image.to_string())
    }

    /// Record `call` and report whether it was scripted to fail.
    fn observe(&self, call: Call) -> bool {
        let mut state = self.state.lock();
        let failing = state.failures.contains(&call);
        state.calls.push(call);
        failing
    }
}

fn next_container_id(state: &mut State) -> ContainerId {
    state.next_id += 1;
    ContainerId::new(format!("{:012x}{:052x}", state.next_id, 0))
}

#[async_trait]
impl ImageOps for FakeRuntime {
    async fn pull_image(&self, reference: &ImageRef) -> Result<(), ImageError> {
        if self.observe(Call::Pull(reference.to_string())) {
            return Err(ImageError::PullFailed(format!(
                "{}: scripted failure",
                reference
            )));
        }
        Ok(())
    }

    async fn inspect_image(&self, reference: &ImageRef) -> Result<ImageId, ImageError> {
        let key = reference.to_string();
        if self.observe(Call::InspectImage(key.clone())) {
            return Err(ImageError::Runtime("scripted failure".to_string()));
        }
        self.state
            .lock()
            .images
            .get(&key)
            .cloned()
            .ok_or(ImageError::NotFound(key))
    }
}

#[async_trait]
impl ContainerOps for FakeRuntime {
    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<ContainerId, ContainerError> {
        let name = config.name.to_string();
        if self.observe(Call::Create(name.clone())) {
            return Err(ContainerError::Runtime("scripted failure".to_string()));
        }
        let mut state = self.state.lock();
        if state.containers.contains_key(&name) {
            return Err(ContainerError::AlreadyExists(name));
        }
        let image = state
            .images
            .get(&config.image.to_string())
            .cloned()
            .unwrap_or_else(|| ImageId::new(config.image.to_string()));
        let id = next_container_id(&mut state);
        state.containers.insert(
            name,
            FakeContainer {
                id: id.clone(),
                image,
                running: false,
            },
        );
        Ok(id)
    }

    async fn start_container(&self, name: &ContainerName) -> Result<(), ContainerError> {
        if self.observe(Call::Start(name.to_string())) {
            return Err(ContainerError::Runtime("scripted failure".to_string()));
        }
        let mut state = self.state.lock();
        let container = state
            .containers
            .get_mut(name.as_str())
            .ok_or_else(|| ContainerError::NotFound(name.to_string()))?;
        container.running = true;
        Ok(())
    }

    async fn stop_container(
        &self,
        name: &ContainerName,
        _timeout: Duration,
    ) -> Result<(), ContainerError> {
        if self.observe(Call::Stop(name.to_string())) {
            return Err(ContainerError::Runtime("scripted failure".to_string()));
        }
        let mut state = self.state.lock();
        let container = state
            .containers
            .get_mut(name.as_str())
            .ok_or_else(|| ContainerError::NotFound(name.to_string()))?;
        container.running = false;
        Ok(())
    }

    async fn remove_container(
        &self,
        name: &ContainerName,
        _force: bool,
    ) -> Result<(), ContainerError> {
        if self.observe(Call::Remove(name.to_string())) {
            return Err(ContainerError::Runtime("scripted failure".to_string()));
        }
        self.state
            .lock()
            .containers
            .remove(name.as_str())
            .map(drop)
            .ok_or_else(|| ContainerError::NotFound(name.to_string()))
    }

    async fn inspect_container(&self, name: &ContainerName) -> Result<ContainerInfo, ContainerError> {
        if self.observe(Call::Inspect(name.to_string())) {
            return Err(ContainerError::Runtime("scripted failure".to_string()));
        }
        let state = self.state.lock();
        let container = state
            .containers
            .get(name.as_str())
            .ok_or_else(|| ContainerError::NotFound(name.to_string()))?;
        Ok(ContainerInfo {
            id: container.id.clone(),
            name: name.to_string(),
            image: container.image.clone(),
            state: if container.running {
                ContainerState::Running
            } else {
                ContainerState::Exited
            },
            health: None,
        })
    }

    async fn rename_container(
        &self,
        name: &ContainerName,
        new_name: &ContainerName,
    ) -> Result<(), ContainerError> {
        if self.observe(Call::Rename(name.to_string(), new_name.to_string())) {
            return Err(ContainerError::Runtime("scripted failure".to_string()));
        }
        let mut state = self.state.lock();
        if state.containers.contains_key(new_name.as_str()) {
            return Err(ContainerError::AlreadyExists(new_name.to_string()));
        }
        let container = state
            .containers
            .remove(name.as_str())
            .ok_or_else(|| ContainerError::NotFound(name.to_string()))?;
        state.containers.insert(new_name.to_string(), container);
        Ok(())
    }
}

#[async_trait]
impl ExecOps for FakeRuntime {
    async fn exec(
        &self,
        container: &ContainerName,
        config: &ExecConfig,
    ) -> Result<ExecResult, ExecError> {
        if self.observe(Call::Exec(container.to_string(), config.cmd.clone())) {
            return Err(ExecError::Failed("scripted failure".to_string()));
        }
        let state = self.state.lock();
        match state.containers.get(container.as_str()) {
            None => return Err(ExecError::ContainerNotFound(container.to_string())),
            Some(c) if !c.running => {
                return Err(ExecError::ContainerNotRunning(container.to_string()));
            }
            Some(_) => {}
        }
        let (exit_code, stdout) = state
            .exec_results
            .get(&config.cmd)
            .cloned()
            .unwrap_or((0, String::new()));
        Ok(ExecResult {
            exit_code,
            stdout: stdout.into_bytes(),
            stderr: Vec::new(),
        })
    }
}
