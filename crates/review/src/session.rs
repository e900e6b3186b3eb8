use std::sync::Arc;

use crate::{
    ReviewError,
    dates::{Clock, SystemClock},
    dispatcher::{self, Action, NextRecord, TransitionDispatcher, TransitionResult, TransitionState},
    effects::BackgroundEffects,
    form::{FormError, FormField, ReviewForm, ReviewFormState},
    services::{
        AgentContext, AgentQueue, EstablishmentDirectory, Loyalty, Notifier, QueueBadge,
        Rejections,
    },
};

/// One agent's review screen: establishments, the current invoice and the
/// transitions applied to it.
pub struct ReviewSession {
    context: AgentContext,
    directory: Arc<dyn EstablishmentDirectory>,
    queue: Arc<dyn AgentQueue>,
    dispatcher: TransitionDispatcher,
    forms: ReviewFormState,
    badge: QueueBadge,
    effects: Arc<BackgroundEffects>,
}

impl ReviewSession {
    /// Return a builder for `ReviewSession`.
    pub fn builder() -> ReviewSessionBuilder {
        ReviewSessionBuilder::default()
    }

    pub fn context(&self) -> &AgentContext {
        &self.context
    }

    pub fn forms(&self) -> &ReviewFormState {
        &self.forms
    }

    pub fn form(&self) -> &ReviewForm {
        self.forms.form()
    }

    pub fn badge(&self) -> &QueueBadge {
        &self.badge
    }

    pub fn transition_state(&self) -> TransitionState {
        self.dispatcher.state()
    }

    /// Loads establishments and the first pending invoice concurrently, then
    /// seeds the form.
    ///
    /// A failing establishment list only costs the name autofill; a failing
    /// record fetch is returned as [`ReviewError::Load`].
    pub async fn start(&mut self) -> Result<NextRecord, ReviewError> {
        tracing::info!(agent_id = self.context.agent_id, "starting review session");
        self.forms.begin_loading();

        let (establishments, pending) = tokio::join!(
            self.directory.list(),
            self.queue.next(self.context.agent_id)
        );

        match establishments {
            Ok(items) => {
                tracing::info!(count = items.len(), "establishments loaded");
                self.forms.set_establishments(items);
            }
            Err(err) => tracing::warn!("establishment list unavailable: {err}"),
        }

        match dispatcher::apply_next(&mut self.forms, pending) {
            NextRecord::Failed(err) => Err(ReviewError::Load(err)),
            next => Ok(next),
        }
    }

    /// Fetches the pending invoice again, discarding local edits.
    pub async fn reload(&mut self) -> Result<NextRecord, ReviewError> {
        self.forms.begin_loading();
        let pending = self.queue.next(self.context.agent_id).await;
        match dispatcher::apply_next(&mut self.forms, pending) {
            NextRecord::Failed(err) => Err(ReviewError::Load(err)),
            next => Ok(next),
        }
    }

    pub fn edit(&mut self, field: FormField, text: &str) -> Result<(), FormError> {
        self.forms.edit(field, text)
    }

    pub async fn submit(&mut self, action: Action, reject_reason: Option<&str>) -> TransitionResult {
        self.dispatcher
            .submit(action, &mut self.forms, &self.context, reject_reason)
            .await
    }

    pub async fn approve(&mut self) -> TransitionResult {
        self.submit(Action::Approve, None).await
    }

    pub async fn reject(&mut self, reason: &str) -> TransitionResult {
        self.submit(Action::Reject, Some(reason)).await
    }

    pub async fn skip(&mut self) -> TransitionResult {
        self.submit(Action::Skip, None).await
    }

    /// Asks the queue how many invoices are left and publishes the count.
    pub async fn refresh_count(&self) -> Result<u64, ReviewError> {
        dispatcher::refresh_count(self.queue.as_ref(), &self.badge, self.context.agent_id)
            .await
            .map_err(ReviewError::Load)
    }

    /// Waits for the best-effort effects still running.
    pub async fn shutdown(&self) {
        self.effects.drain().await;
    }
}

#[derive(Default)]
pub struct ReviewSessionBuilder {
    context: Option<AgentContext>,
    directory: Option<Arc<dyn EstablishmentDirectory>>,
    queue: Option<Arc<dyn AgentQueue>>,
    loyalty: Option<Arc<dyn Loyalty>>,
    rejections: Option<Arc<dyn Rejections>>,
    notifier: Option<Arc<dyn Notifier>>,
    clock: Option<Arc<dyn Clock>>,
    badge: Option<QueueBadge>,
}

impl ReviewSessionBuilder {
    pub fn context(mut self, context: AgentContext) -> ReviewSessionBuilder {
        self.context = Some(context);
        self
    }

    pub fn directory(mut self, directory: Arc<dyn EstablishmentDirectory>) -> ReviewSessionBuilder {
        self.directory = Some(directory);
        self
    }

    pub fn queue(mut self, queue: Arc<dyn AgentQueue>) -> ReviewSessionBuilder {
        self.queue = Some(queue);
        self
    }

    pub fn loyalty(mut self, loyalty: Arc<dyn Loyalty>) -> ReviewSessionBuilder {
        self.loyalty = Some(loyalty);
        self
    }

    pub fn rejections(mut self, rejections: Arc<dyn Rejections>) -> ReviewSessionBuilder {
        self.rejections = Some(rejections);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> ReviewSessionBuilder {
        self.notifier = Some(notifier);
        self
    }

    /// Defaults to [`SystemClock`] on the machine's local time.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> ReviewSessionBuilder {
        self.clock = Some(clock);
        self
    }

    /// Share an existing badge instead of creating a fresh one.
    pub fn badge(mut self, badge: QueueBadge) -> ReviewSessionBuilder {
        self.badge = Some(badge);
        self
    }

    /// Construct `ReviewSession`
    pub fn build(self) -> Result<ReviewSession, ReviewError> {
        let context = self
            .context
            .ok_or(ReviewError::MissingCollaborator("agent context"))?;
        let directory = self
            .directory
            .ok_or(ReviewError::MissingCollaborator("establishment directory"))?;
        let queue = self
            .queue
            .ok_or(ReviewError::MissingCollaborator("agent queue"))?;
        let loyalty = self
            .loyalty
            .ok_or(ReviewError::MissingCollaborator("loyalty"))?;
        let rejections = self
            .rejections
            .ok_or(ReviewError::MissingCollaborator("rejections"))?;
        let notifier = self
            .notifier
            .ok_or(ReviewError::MissingCollaborator("notifier"))?;
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::default()));
        let badge = self.badge.unwrap_or_default();
        let effects = Arc::new(BackgroundEffects::new());

        let dispatcher = TransitionDispatcher::new(
            queue.clone(),
            loyalty,
            rejections,
            notifier,
            clock,
            badge.clone(),
            effects.clone(),
        );

        Ok(ReviewSession {
            context,
            directory,
            queue,
            dispatcher,
            forms: ReviewFormState::default(),
            badge,
            effects,
        })
    }
}
