//! Small node types shared by the runtime integration tests.
#![allow(dead_code)]

use algocore::{NodeError, NodeEventKind, NodeHandle, NodeType, RunContext, SlotDef, Value, ValueType};
use std::sync::{Arc, Mutex};
use std::thread::ThreadId;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;
use tokio::time::timeout;

pub fn node(kind: impl NodeType + 'static, label: &str) -> NodeHandle {
    NodeHandle::new(Arc::new(kind), label)
}

/// Source emitting a fixed number on its `Value` output.
pub struct Emit(pub f64);

impl NodeType for Emit {
    fn type_name(&self) -> &str {
        "test.emit"
    }

    fn slots(&self) -> Vec<SlotDef> {
        vec![SlotDef::output("Value", ValueType::Number)]
    }

    fn run(&self, ctx: &mut RunContext) -> Result<(), NodeError> {
        ctx.set_output("Value", self.0);
        Ok(())
    }
}

/// Like [`Emit`], but sleeps first to keep the pool busy for a while.
pub struct SlowEmit {
    pub value: f64,
    pub millis: u64,
}

impl NodeType for SlowEmit {
    fn type_name(&self) -> &str {
        "test.slow_emit"
    }

    fn slots(&self) -> Vec<SlotDef> {
        vec![SlotDef::output("Value", ValueType::Number)]
    }

    fn run(&self, ctx: &mut RunContext) -> Result<(), NodeError> {
        std::thread::sleep(Duration::from_millis(self.millis));
        ctx.set_output("Value", self.value);
        Ok(())
    }
}

/// Adds one to its `Value` input. Reads by reference so retained inputs
/// stay observable.
pub struct Forward;

impl NodeType for Forward {
    fn type_name(&self) -> &str {
        "test.forward"
    }

    fn slots(&self) -> Vec<SlotDef> {
        vec![
            SlotDef::input("Value", ValueType::Number),
            SlotDef::output("Value", ValueType::Number),
        ]
    }

    fn run(&self, ctx: &mut RunContext) -> Result<(), NodeError> {
        let value = ctx
            .require_input("Value")?
            .as_f64()
            .ok_or_else(|| NodeError::InvalidInputType {
                field: "Value".to_string(),
                expected: "number".to_string(),
            })?;
        ctx.set_output("Value", value + 1.0);
        Ok(())
    }
}

/// Fails validation unconditionally; its output is never written.
pub struct Fail;

impl NodeType for Fail {
    fn type_name(&self) -> &str {
        "test.fail"
    }

    fn slots(&self) -> Vec<SlotDef> {
        vec![SlotDef::output("Value", ValueType::Number)]
    }

    fn run(&self, _ctx: &mut RunContext) -> Result<(), NodeError> {
        Err(NodeError::validation("boom"))
    }
}

/// Sums every value accumulated on its `Value` input list.
pub struct Collect;

impl NodeType for Collect {
    fn type_name(&self) -> &str {
        "test.collect"
    }

    fn slots(&self) -> Vec<SlotDef> {
        vec![
            SlotDef::input_list("Value", ValueType::Number),
            SlotDef::output("Sum", ValueType::Number),
        ]
    }

    fn run(&self, ctx: &mut RunContext) -> Result<(), NodeError> {
        let sum = ctx
            .input("Value")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_f64).sum())
            .unwrap_or(0.0);
        ctx.set_output("Sum", sum);
        Ok(())
    }
}

/// Records which thread ran it.
pub struct Record(pub Arc<Mutex<Vec<ThreadId>>>);

impl NodeType for Record {
    fn type_name(&self) -> &str {
        "test.record"
    }

    fn slots(&self) -> Vec<SlotDef> {
        Vec::new()
    }

    fn run(&self, _ctx: &mut RunContext) -> Result<(), NodeError> {
        self.0.lock().unwrap().push(std::thread::current().id());
        Ok(())
    }
}

/// Node type with no slots and a no-op computation.
pub struct Noop;

impl NodeType for Noop {
    fn type_name(&self) -> &str {
        "test.noop"
    }

    fn slots(&self) -> Vec<SlotDef> {
        Vec::new()
    }

    fn run(&self, _ctx: &mut RunContext) -> Result<(), NodeError> {
        Ok(())
    }
}

/// Wait until the subscribed node publishes `Finished`.
pub async fn wait_finished(rx: &mut Receiver<algocore::NodeEvent>) {
    timeout(Duration::from_secs(10), async {
        loop {
            match rx.recv().await {
                Ok(event) if matches!(event.kind, NodeEventKind::Finished) => break,
                Ok(_) => continue,
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => panic!("event channel closed before Finished"),
            }
        }
    })
    .await
    .expect("node did not finish in time");
}

/// Wait until the subscribed node receives an advisory abort; returns its
/// message.
pub async fn wait_aborted(rx: &mut Receiver<algocore::NodeEvent>) -> String {
    timeout(Duration::from_secs(10), async {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let NodeEventKind::Aborted { message, .. } = event.kind {
                        break message;
                    }
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => panic!("event channel closed before Aborted"),
            }
        }
    })
    .await
    .expect("abort was not relayed in time")
}
