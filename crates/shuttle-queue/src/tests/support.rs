//! Test doubles shared by the queue unit and behaviour tests.

use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use shuttle_session::ClientSessionState;
use shuttle_sidecar::{Action, SidecarError, SidecarInvoker, SidecarOutput};

use crate::reporter::JobReporter;
use crate::sidecar_job::ConnectionResolver;

/// Job events captured by [`RecordingReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    Started(String),
    Coalesced(String),
    Succeeded(String),
    Failed { key: String, message: String },
}

/// Records job events for assertions.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<JobEvent>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<JobEvent> {
        self.events
            .lock()
            .expect("reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: JobEvent) {
        self.events
            .lock()
            .expect("reporter mutex poisoned")
            .push(event);
    }
}

impl JobReporter for RecordingReporter {
    fn job_started(&self, key: &str) {
        self.record(JobEvent::Started(key.to_owned()));
    }

    fn job_coalesced(&self, key: &str) {
        self.record(JobEvent::Coalesced(key.to_owned()));
    }

    fn job_succeeded(&self, key: &str, _elapsed: Duration) {
        self.record(JobEvent::Succeeded(key.to_owned()));
    }

    fn job_failed(&self, key: &str, _elapsed: Duration, error: &dyn Error) {
        self.record(JobEvent::Failed {
            key: key.to_owned(),
            message: error.to_string(),
        });
    }
}

/// Latch that holds workers until a test opens it.
#[derive(Debug, Clone, Default)]
pub struct Gate {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Gate {
    pub fn open(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock().expect("gate mutex poisoned") = true;
        cvar.notify_all();
    }

    pub fn wait(&self) {
        let (lock, cvar) = &*self.inner;
        let mut open = lock.lock().expect("gate mutex poisoned");
        while !*open {
            open = cvar.wait(open).expect("gate mutex poisoned during wait");
        }
    }
}

/// Resolver backed by a fixed table of connections.
#[derive(Debug, Default)]
pub struct StaticResolver {
    connections: HashMap<String, (Vec<String>, ClientSessionState)>,
}

impl StaticResolver {
    pub fn with_connection(mut self, session: ClientSessionState, base_args: &[&str]) -> Self {
        let args = base_args.iter().map(|arg| (*arg).to_owned()).collect();
        self.connections
            .insert(session.connection_id().to_owned(), (args, session));
        self
    }
}

impl ConnectionResolver for StaticResolver {
    type Connection = String;

    fn connection_from_connection_id(&self, connection_id: &str) -> Option<String> {
        self.connections
            .contains_key(connection_id)
            .then(|| connection_id.to_owned())
    }

    fn sidecar_args_from_connection(&self, connection: &String) -> Vec<String> {
        self.connections
            .get(connection)
            .map(|(args, _)| args.clone())
            .unwrap_or_default()
    }

    fn session_state_from_connection(&self, connection: &String) -> Option<ClientSessionState> {
        self.connections
            .get(connection)
            .map(|(_, session)| session.clone())
    }
}

/// One recorded sidecar call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokerCall {
    pub action: Action,
    pub args: Vec<String>,
}

#[derive(Debug, Default)]
struct ScriptState {
    responses: HashMap<Action, SidecarOutput>,
    calls: Vec<InvokerCall>,
    active: usize,
    max_active: usize,
}

/// Invoker answering from canned outputs, optionally held at a [`Gate`].
#[derive(Debug, Clone, Default)]
pub struct ScriptedInvoker {
    state: Arc<Mutex<ScriptState>>,
    gate: Option<Gate>,
}

impl ScriptedInvoker {
    pub fn gated(gate: Gate) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn respond(&self, action: Action, output: SidecarOutput) {
        self.lock().responses.insert(action, output);
    }

    pub fn calls(&self) -> Vec<InvokerCall> {
        self.lock().calls.clone()
    }

    pub fn max_active(&self) -> usize {
        self.lock().max_active
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        self.state.lock().expect("invoker mutex poisoned")
    }
}

impl SidecarInvoker for ScriptedInvoker {
    fn run(&self, action: Action, args: &[String]) -> Result<SidecarOutput, SidecarError> {
        {
            let mut state = self.lock();
            state.calls.push(InvokerCall {
                action,
                args: args.to_vec(),
            });
            state.active += 1;
            state.max_active = state.max_active.max(state.active);
        }
        if let Some(gate) = &self.gate {
            gate.wait();
        }
        let mut state = self.lock();
        state.active -= 1;
        Ok(state
            .responses
            .get(&action)
            .cloned()
            .unwrap_or_else(|| SidecarOutput::success("[]")))
    }
}

/// Sidecar output listing classes with the given keys.
pub fn classes_json(keys: &[&str]) -> String {
    let entries: Vec<String> = keys
        .iter()
        .map(|key| format!(r#"{{"key":"{key}"}}"#))
        .collect();
    format!("[{}]", entries.join(","))
}
