//! Ordered steps with compensations, for writes that span stores with no
//! shared transaction.
//!
//! Steps run in order and stop at the first failure. Every step that had
//! already completed is then compensated in reverse order. Compensation is
//! best effort: a failing compensation is logged and reported in the
//! [`SagaFailure`], and never replaces the error that started the unwind.

use async_trait::async_trait;

use super::error::VaultError;

#[async_trait]
pub trait SagaStep<C: Send>: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, ctx: &mut C) -> Result<(), VaultError>;

    /// Undo a completed `run`. Steps with nothing to undo keep the default.
    async fn compensate(&self, _ctx: &mut C) -> Result<(), VaultError> {
        Ok(())
    }
}

/// Outcome of one compensation during an unwind.
#[derive(Debug)]
pub struct Compensation {
    pub step: &'static str,
    /// `None` when the compensation succeeded.
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct SagaFailure {
    pub failed_step: &'static str,
    pub error: VaultError,
    /// Compensations attempted, in the order they ran.
    pub unwound: Vec<Compensation>,
}

impl SagaFailure {
    /// True when every compensation succeeded.
    pub fn fully_unwound(&self) -> bool {
        self.unwound.iter().all(|c| c.error.is_none())
    }
}

pub struct Saga<C: Send> {
    name: &'static str,
    steps: Vec<Box<dyn SagaStep<C>>>,
}

impl<C: Send> Saga<C> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, step: impl SagaStep<C> + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub async fn execute(&self, ctx: &mut C) -> Result<(), SagaFailure> {
        for (completed, step) in self.steps.iter().enumerate() {
            if let Err(error) = step.run(ctx).await {
                tracing::debug!(
                    saga = self.name,
                    step = step.name(),
                    error = %error,
                    "Saga step failed, unwinding"
                );
                let unwound = self.unwind(completed, ctx).await;
                return Err(SagaFailure {
                    failed_step: step.name(),
                    error,
                    unwound,
                });
            }
        }
        Ok(())
    }

    async fn unwind(&self, completed: usize, ctx: &mut C) -> Vec<Compensation> {
        let mut unwound = Vec::with_capacity(completed);
        for step in self.steps[..completed].iter().rev() {
            let error = match step.compensate(ctx).await {
                Ok(()) => None,
                Err(e) => {
                    tracing::error!(
                        saga = self.name,
                        step = step.name(),
                        error = %e,
                        "Compensation failed; partial write left behind"
                    );
                    Some(e.to_string())
                }
            };
            unwound.push(Compensation {
                step: step.name(),
                error,
            });
        }
        unwound
    }
}
