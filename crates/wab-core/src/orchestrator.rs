//! Client-driven bulk send loop.
//!
//! One cooperative timeline: contacts are attempted strictly one after another,
//! with a configurable delay between sends. Pause and stop are flags observed
//! at the top of each iteration and during the inter-message delay; a send that
//! is already in flight always completes first.

use std::{sync::Arc, sync::OnceLock, time::Duration};

use regex::{NoExpand, Regex};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::time::sleep;

use crate::{
    attachment::Attachment,
    contacts::ContactStore,
    domain::{AttachmentRef, Contact, ContactStatus},
    errors::Error,
    phone::{is_valid_phone, normalize_phone},
    ports::{BotStatusProbe, SendRequest, SendService, UploadService},
    utils::local_clock,
    Result,
};

pub const DEFAULT_DELAY: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunState {
    #[default]
    Idle,
    Sending,
    Paused,
}

/// What to send: shared by every contact of a run.
#[derive(Clone, Debug)]
pub struct SendJob {
    pub message: String,
    pub attachment: Option<Attachment>,
    pub delay: Duration,
}

impl SendJob {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            attachment: None,
            delay: DEFAULT_DELAY,
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.message.trim().is_empty() && self.attachment.is_none() {
            return Err(Error::validation(
                "Please enter a message or select an attachment",
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    pub at: String,
    pub level: LogLevel,
    pub text: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Progress {
    pub sent: usize,
    pub failed: usize,
    pub total: usize,
}

impl Progress {
    pub fn processed(&self) -> usize {
        self.sent + self.failed
    }

    /// Completion ratio in `[0, 1]`; an empty run counts as complete.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.processed() as f64 / self.total as f64
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub sent: usize,
    pub failed: usize,
    pub total: usize,
    pub stopped: bool,
}

/// Observable side effects of the orchestrator, consumed by a renderer.
#[derive(Clone, Debug, PartialEq)]
pub enum RunEvent {
    State(RunState),
    Log(LogEntry),
    Progress(Progress),
    ContactUpdated { phone: String, status: ContactStatus },
    /// An inter-message delay has started.
    Waiting(Duration),
    Finished(RunSummary),
}

#[derive(Clone, Copy, Debug, Default)]
struct Signals {
    paused: bool,
    stopped: bool,
}

/// Owns the run state and drives sends against the ports.
pub struct BulkSender {
    contacts: Arc<Mutex<ContactStore>>,
    sender: Arc<dyn SendService>,
    uploader: Arc<dyn UploadService>,
    probe: Arc<dyn BotStatusProbe>,
    events: Option<mpsc::UnboundedSender<RunEvent>>,
    state: watch::Sender<RunState>,
    progress: watch::Sender<Progress>,
    signals: watch::Sender<Signals>,
}

impl BulkSender {
    pub fn new(
        contacts: Arc<Mutex<ContactStore>>,
        sender: Arc<dyn SendService>,
        uploader: Arc<dyn UploadService>,
        probe: Arc<dyn BotStatusProbe>,
    ) -> Self {
        Self {
            contacts,
            sender,
            uploader,
            probe,
            events: None,
            state: watch::Sender::new(RunState::Idle),
            progress: watch::Sender::new(Progress::default()),
            signals: watch::Sender::new(Signals::default()),
        }
    }

    /// Route run events to a renderer.
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<RunEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn contacts(&self) -> Arc<Mutex<ContactStore>> {
        self.contacts.clone()
    }

    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    pub fn progress(&self) -> Progress {
        *self.progress.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    /// Suspend before the next contact. No-op unless sending.
    pub fn pause(&self) -> bool {
        let changed = self.state.send_if_modified(|s| {
            if *s == RunState::Sending {
                *s = RunState::Paused;
                true
            } else {
                false
            }
        });
        if changed {
            self.signals.send_modify(|s| s.paused = true);
            self.emit(RunEvent::State(RunState::Paused));
            self.log(LogLevel::Info, "Paused".to_string());
        }
        changed
    }

    /// Continue with the next unattempted contact. No-op unless paused.
    pub fn resume(&self) -> bool {
        let changed = self.state.send_if_modified(|s| {
            if *s == RunState::Paused {
                *s = RunState::Sending;
                true
            } else {
                false
            }
        });
        if changed {
            self.signals.send_modify(|s| s.paused = false);
            self.emit(RunEvent::State(RunState::Sending));
            self.log(LogLevel::Info, "Resumed".to_string());
        }
        changed
    }

    pub fn toggle_pause(&self) -> RunState {
        if !self.pause() {
            self.resume();
        }
        self.state()
    }

    /// Ask the running loop to exit. Takes effect once any in-flight send resolves.
    pub fn stop(&self) -> bool {
        if self.state() == RunState::Idle {
            return false;
        }
        self.signals.send_modify(|s| {
            s.stopped = true;
            s.paused = false;
        });
        true
    }

    /// Send `job` to every selected contact with a valid phone, in list order.
    pub async fn start(&self, job: SendJob) -> Result<RunSummary> {
        if self.state() != RunState::Idle {
            return Err(Error::Busy);
        }
        job.validate()?;

        let targets = self.contacts.lock().await.selected_valid();
        if targets.is_empty() {
            return Err(Error::validation(
                "Please select at least one contact with a valid phone number",
            ));
        }
        self.ensure_connected().await?;
        self.claim()?;

        let total = targets.len();
        self.progress.send_replace(Progress {
            total,
            ..Progress::default()
        });
        self.emit(RunEvent::Progress(self.progress()));
        tracing::info!(total, delay_secs = job.delay.as_secs(), "bulk run started");

        let attachment = match self.upload_once(&job).await {
            Ok(a) => a,
            Err(e) => {
                self.release();
                return Err(e);
            }
        };

        let mut signals = self.signals.subscribe();
        let mut stopped = false;

        for (i, contact) in targets.iter().enumerate() {
            if current(&signals).stopped {
                stopped = true;
                break;
            }
            if current(&signals).paused {
                let _ = signals.wait_for(|s| !s.paused || s.stopped).await;
            }
            if current(&signals).stopped {
                stopped = true;
                break;
            }

            let status = self.attempt(contact, &job, attachment.as_ref()).await;
            self.record(&contact.phone, status, true).await;

            if i + 1 < total && !current(&signals).stopped {
                self.emit(RunEvent::Waiting(job.delay));
                tokio::select! {
                    _ = sleep(job.delay) => {}
                    _ = signals.wait_for(|s| s.stopped) => {}
                }
            }
        }

        let p = self.progress();
        let summary = RunSummary {
            sent: p.sent,
            failed: p.failed,
            total,
            stopped,
        };

        if stopped {
            self.log(LogLevel::Info, "Stopped".to_string());
        }
        let level = if summary.sent > 0 {
            LogLevel::Success
        } else {
            LogLevel::Error
        };
        self.log(
            level,
            format!("Completed! Sent: {}, Failed: {}", summary.sent, summary.failed),
        );
        tracing::info!(
            sent = summary.sent,
            failed = summary.failed,
            stopped,
            "bulk run finished"
        );

        self.release();
        self.emit(RunEvent::Finished(summary));
        Ok(summary)
    }

    /// Send `job` to the stored contact at `index` only.
    ///
    /// Other contacts' statuses and the bulk queue are left untouched.
    pub async fn send_to_single(&self, index: usize, job: SendJob) -> Result<ContactStatus> {
        let contact = {
            let store = self.contacts.lock().await;
            let len = store.len();
            store
                .get(index)
                .cloned()
                .ok_or_else(|| Error::validation(format!("no contact at index {index} (have {len})")))?
        };
        if !contact.is_valid() {
            return Err(Error::validation(format!(
                "{} is not a valid phone number",
                contact.phone
            )));
        }
        self.send_one(contact, job, true).await
    }

    /// Send `job` to an ad-hoc number that is not in the contact list.
    pub async fn send_direct(&self, raw_phone: &str, job: SendJob) -> Result<ContactStatus> {
        let cc = self.contacts.lock().await.default_country_code().to_string();
        let phone = normalize_phone(raw_phone, &cc);
        if !is_valid_phone(&phone) {
            return Err(Error::validation(format!(
                "{raw_phone} is not a valid phone number"
            )));
        }
        self.send_one(Contact::new(phone, ""), job, false).await
    }

    async fn send_one(
        &self,
        contact: Contact,
        job: SendJob,
        record: bool,
    ) -> Result<ContactStatus> {
        if self.state() != RunState::Idle {
            return Err(Error::Busy);
        }
        job.validate()?;
        self.ensure_connected().await?;
        self.claim()?;

        let result = async {
            let attachment = self.upload_once(&job).await?;
            let status = self.attempt(&contact, &job, attachment.as_ref()).await;
            if record {
                self.record(&contact.phone, status, false).await;
            }
            Ok::<_, Error>(status)
        }
        .await;

        self.release();
        result
    }

    async fn ensure_connected(&self) -> Result<()> {
        let status = self.probe.bot_status().await;
        if !status.is_connected() {
            tracing::warn!(%status, "refusing to send: bot not connected");
            return Err(Error::NotConnected(status));
        }
        Ok(())
    }

    /// Idle -> Sending, atomically.
    fn claim(&self) -> Result<()> {
        let claimed = self.state.send_if_modified(|s| {
            if *s == RunState::Idle {
                *s = RunState::Sending;
                true
            } else {
                false
            }
        });
        if !claimed {
            return Err(Error::Busy);
        }
        self.signals.send_replace(Signals::default());
        self.emit(RunEvent::State(RunState::Sending));
        Ok(())
    }

    fn release(&self) {
        self.state.send_replace(RunState::Idle);
        self.signals.send_replace(Signals::default());
        self.emit(RunEvent::State(RunState::Idle));
    }

    async fn upload_once(&self, job: &SendJob) -> Result<Option<AttachmentRef>> {
        let Some(attachment) = &job.attachment else {
            return Ok(None);
        };

        self.log(LogLevel::Info, "Uploading attachment...".to_string());
        match self.uploader.upload_attachment(attachment).await {
            Ok(r) => {
                self.log(
                    LogLevel::Success,
                    "Attachment uploaded successfully".to_string(),
                );
                Ok(Some(r))
            }
            Err(e) => {
                let msg = match e {
                    Error::Upload(m) | Error::Rejected(m) => m,
                    other => other.to_string(),
                };
                self.log(LogLevel::Error, format!("Attachment upload failed: {msg}"));
                Err(Error::Upload(msg))
            }
        }
    }

    async fn attempt(
        &self,
        contact: &Contact,
        job: &SendJob,
        attachment: Option<&AttachmentRef>,
    ) -> ContactStatus {
        let req = SendRequest {
            phone: contact.phone.clone(),
            message: personalize(job.message.trim(), contact.greeting_name()),
            attachment: attachment.cloned(),
            file_type: attachment
                .and(job.attachment.as_ref())
                .map(|a| a.file_type),
        };

        self.log(LogLevel::Info, format!("Sending to {}...", contact.phone));
        match self.sender.send_message(&req).await {
            Ok(()) => {
                self.log(LogLevel::Success, format!("Sent to {}", contact.phone));
                ContactStatus::Sent
            }
            Err(Error::Rejected(e)) => {
                self.log(LogLevel::Error, format!("Failed: {} - {e}", contact.phone));
                ContactStatus::Failed
            }
            Err(e) => {
                self.log(LogLevel::Error, format!("Error: {} - {e}", contact.phone));
                ContactStatus::Failed
            }
        }
    }

    async fn record(&self, phone: &str, status: ContactStatus, count: bool) {
        if let Err(e) = self.contacts.lock().await.set_status(phone, status) {
            tracing::warn!(phone, "failed to persist contact status: {e}");
        }
        self.emit(RunEvent::ContactUpdated {
            phone: phone.to_string(),
            status,
        });

        if count {
            self.progress.send_modify(|p| match status {
                ContactStatus::Sent => p.sent += 1,
                ContactStatus::Failed => p.failed += 1,
                ContactStatus::Pending => {}
            });
            self.emit(RunEvent::Progress(self.progress()));
        }
    }

    fn log(&self, level: LogLevel, text: String) {
        match level {
            LogLevel::Error => tracing::warn!("{text}"),
            _ => tracing::info!("{text}"),
        }
        self.emit(RunEvent::Log(LogEntry {
            at: local_clock(),
            level,
            text,
        }));
    }

    fn emit(&self, ev: RunEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(ev);
        }
    }
}

fn current(rx: &watch::Receiver<Signals>) -> Signals {
    *rx.borrow()
}

fn name_placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\{name\}").expect("valid regex"))
}

/// Replace every `{name}` (any case) with `name`, literally.
pub fn personalize(template: &str, name: &str) -> String {
    name_placeholder_re()
        .replace_all(template, NoExpand(name))
        .into_owned()
}
