//! # Survey: request/response through a delivery queue.
//!
//! [`Owner::ask`](crate::Owner::ask) wraps a question and an answer sender
//! into a [`Questionnaire`] and pushes it to every live queue of the survey,
//! like any other item. The bound replier computes the answer once the host
//! is started and hands it to the questionnaire; the invocation then returns
//! normally, which completes the delivery attempt.
//!
//! The returned [`Answers`] stream yields one answer per host that replied
//! and ends once every copy of the questionnaire was delivered or discarded.
//!
//! ## Example
//! ```rust
//! use handover::{Config, DeliveryMode, Lifecycle, LifecycleState, Owner, RetainedId};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), handover::DeliveryError> {
//! let owner = Owner::new(Config::default());
//! let survey = owner.survey::<u32, String>();
//!
//! let id = RetainedId::new();
//! let host = Lifecycle::new();
//! host.move_to(LifecycleState::Started);
//! survey.bind(&id, &host, DeliveryMode::All, |n| async move { n.to_string() });
//! tokio::time::sleep(std::time::Duration::from_millis(10)).await;
//!
//! let answers = owner.ask(&survey, 1234)?;
//! assert_eq!(answers.single().await.as_deref(), Some("1234"));
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use crate::channels::delivery::Delivery;
use crate::config::DeliveryMode;
use crate::core::ReceiverState;
use crate::lifecycle::{Lifecycle, RetainedId};
use crate::receivers::{ReceiverFn, ReceiverRef};

/// A question paired with the channel its answers go to.
pub struct Questionnaire<Q, A> {
    question: Q,
    answers: mpsc::UnboundedSender<A>,
}

impl<Q: Clone, A> Clone for Questionnaire<Q, A> {
    fn clone(&self) -> Self {
        Self {
            question: self.question.clone(),
            answers: self.answers.clone(),
        }
    }
}

impl<Q, A> Questionnaire<Q, A> {
    pub(crate) fn new(question: Q, answers: mpsc::UnboundedSender<A>) -> Self {
        Self { question, answers }
    }

    /// The question.
    pub fn question(&self) -> &Q {
        &self.question
    }

    /// Sends an answer to the asker.
    ///
    /// Returns `false` if the asker stopped listening.
    pub fn answer(&self, answer: A) -> bool {
        self.answers.send(answer).is_ok()
    }
}

/// Stream of answers to one question.
pub struct Answers<A> {
    rx: mpsc::UnboundedReceiver<A>,
}

impl<A> Answers<A> {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<A>) -> Self {
        Self { rx }
    }

    /// Next answer, or `None` once no host can answer anymore.
    pub async fn next(&mut self) -> Option<A> {
        self.rx.recv().await
    }

    /// Waits for the stream to end and returns the answer if there was
    /// exactly one.
    pub async fn single(mut self) -> Option<A> {
        let first = self.rx.recv().await?;
        match self.rx.recv().await {
            None => Some(first),
            Some(_) => None,
        }
    }

    /// Waits for the stream to end and returns every answer.
    pub async fn collect_all(mut self) -> Vec<A> {
        let mut out = Vec::new();
        while let Some(a) = self.rx.recv().await {
            out.push(a);
        }
        out
    }
}

impl<A> Stream for Answers<A> {
    type Item = A;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<A>> {
        self.rx.poll_recv(cx)
    }
}

/// Handle to a request/response channel. Cheap to clone.
pub struct Survey<Q, A> {
    pub(crate) delivery: Arc<Delivery<Questionnaire<Q, A>>>,
}

impl<Q, A> Clone for Survey<Q, A> {
    fn clone(&self) -> Self {
        Self {
            delivery: Arc::clone(&self.delivery),
        }
    }
}

impl<Q, A> Survey<Q, A>
where
    Q: Clone + Send + 'static,
    A: Send + 'static,
{
    /// Channel label.
    pub fn name(&self) -> &str {
        &self.delivery.label
    }

    /// Installs `replier` for `lifecycle`, attached through `id`.
    ///
    /// Same replacement rules as [`Signal::bind`](crate::Signal::bind). The
    /// replier stays cancellable while it runs: a newer question under
    /// `Latest`, or a host change, interrupts it.
    pub fn bind<F, Fut>(&self, id: &RetainedId, lifecycle: &Lifecycle, mode: DeliveryMode, replier: F)
    where
        F: Fn(Q) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = A> + Send + 'static,
    {
        let replier = Arc::new(replier);
        let host = lifecycle.clone();
        let receiver: ReceiverRef<Questionnaire<Q, A>> =
            ReceiverFn::arc(move |_state: ReceiverState, qn: Questionnaire<Q, A>| {
                let replier = Arc::clone(&replier);
                let host = host.clone();
                async move {
                    let question = qn.question.clone();
                    match host.when_started(async move { replier(question).await }).await {
                        Some(answer) => {
                            qn.answer(answer);
                        }
                        None => std::future::pending::<()>().await,
                    }
                }
            });

        self.delivery.bindings.replace(
            &self.delivery.registry,
            id,
            lifecycle,
            self.delivery.cfg.params(mode),
            receiver,
        );
    }

    /// Removes the replier bound for `lifecycle`.
    pub fn unbind(&self, lifecycle: &Lifecycle) -> bool {
        self.delivery.bindings.unbind(lifecycle.key())
    }

    /// Number of identities with a live queue.
    pub fn queue_count(&self) -> usize {
        self.delivery.registry.len()
    }
}

impl<Q, A> std::fmt::Debug for Survey<Q, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Survey")
            .field("name", &self.delivery.label)
            .finish()
    }
}
