pub mod lifecycle_tests;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::library_test::lifecycle::run_blocking;
use crate::library_test::traits::{LibraryTest, Phase, PhaseResult};

/// How a scripted phase behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    Pass,
    Fail,
    Panic,
    Sleep(Duration),
    /// Block a thread the way a hung foreign call would.
    Block(Duration),
}

/// Library test whose phases follow a script and log every invocation.
pub struct ScriptedTest {
    pub name: &'static str,
    pub script: [Behaviour; 4],
    pub calls: Arc<Mutex<Vec<Phase>>>,
}

impl ScriptedTest {
    pub fn passing(name: &'static str) -> Self {
        Self {
            name,
            script: [Behaviour::Pass; 4],
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with(mut self, phase: Phase, behaviour: Behaviour) -> Self {
        self.script[phase as usize] = behaviour;
        self
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<Phase>>> {
        self.calls.clone()
    }

    async fn step(&mut self, phase: Phase) -> PhaseResult {
        self.calls.lock().unwrap().push(phase);
        match self.script[phase as usize] {
            Behaviour::Pass => Ok(()),
            Behaviour::Fail => Err(format!("{} failed on purpose", phase).into()),
            Behaviour::Panic => panic!("{} panicked on purpose", phase),
            Behaviour::Sleep(duration) => {
                tokio::time::sleep(duration).await;
                Ok(())
            }
            Behaviour::Block(duration) => {
                run_blocking(move || std::thread::sleep(duration)).await?;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl LibraryTest for ScriptedTest {
    fn library_name(&self) -> &str {
        self.name
    }

    fn library_version(&self) -> &str {
        "1.0.0"
    }

    async fn initialize(&mut self) -> PhaseResult {
        self.step(Phase::Initialize).await
    }

    async fn verify_version(&mut self) -> PhaseResult {
        self.step(Phase::VerifyVersion).await
    }

    async fn execute_tests(&mut self) -> PhaseResult {
        self.step(Phase::ExecuteTests).await
    }

    async fn cleanup(&mut self) -> PhaseResult {
        self.step(Phase::Cleanup).await
    }
}
