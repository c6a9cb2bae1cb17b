use std::{io::BufRead, sync::Arc, time::Duration};

use anyhow::{bail, Context};
use clap::Parser;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use wab_core::{
    attachment::Attachment,
    automation::AutoSendRequest,
    config::Config,
    contacts::{ContactEdit, ContactStore},
    domain::ContactStatus,
    orchestrator::{BulkSender, SendJob},
    ports::BotStatusProbe,
    schedule::ScheduleRequest,
    status::StatusMonitor,
};
use wab_http::ApiClient;

mod cli;
mod render;

use crate::cli::{BotCommand, Cli, Command, Content, ContactsCommand, ServerContactsCommand};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    wab_core::logging::init("wab")?;

    let mut cfg = Config::load()?;
    if let Some(url) = cli.api_url {
        cfg.api_base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(path) = cli.contacts_file {
        cfg.contacts_file = path;
    }

    let api = Arc::new(ApiClient::from_config(&cfg)?);
    if needs_server_settings(&cli.command) {
        hydrate_settings(&api, &mut cfg).await;
    }

    match cli.command {
        Command::Status { watch } => status(api, &cfg, watch).await,
        Command::Bot(cmd) => bot(&api, cmd).await,
        Command::Contacts(cmd) => contacts(&cfg, cmd),
        Command::Send {
            phone,
            contact,
            content,
        } => send(api, &cfg, phone, contact, content).await,
        Command::Bulk { content, delay } => bulk(api, &cfg, content, delay).await,
        Command::Schedule { phone, message, at } => {
            let req = ScheduleRequest::new(&phone, &message, &at)?;
            println!("{}", api.schedule_message(&req).await?);
            Ok(())
        }
        Command::Scan => {
            let report = api.scan_attachments().await.context("Scan failed")?;
            println!("{}", render::scan_report(&report));
            Ok(())
        }
        Command::AutoSend { message, delay } => auto_send(&api, message, delay).await,
        Command::Stats => {
            println!("{}", render::statistics(&api.statistics().await?));
            Ok(())
        }
        Command::ServerContacts(cmd) => server_contacts(&api, cmd).await,
    }
}

/// Commands that normalize phone numbers with the default country code.
fn needs_server_settings(cmd: &Command) -> bool {
    match cmd {
        Command::Contacts(c) => matches!(
            c,
            ContactsCommand::Add { .. } | ContactsCommand::Import { .. } | ContactsCommand::Edit { .. }
        ),
        Command::Send { .. } | Command::Bulk { .. } => true,
        Command::Status { .. }
        | Command::Bot(_)
        | Command::Schedule { .. }
        | Command::Scan
        | Command::AutoSend { .. }
        | Command::Stats
        | Command::ServerContacts(_) => false,
    }
}

/// Prefer the server's default country code when it is reachable.
async fn hydrate_settings(api: &ApiClient, cfg: &mut Config) {
    match api.default_country_code().await {
        Ok(Some(cc)) => {
            tracing::debug!(country_code = %cc, "using server default country code");
            cfg.default_country_code = cc;
        }
        Ok(None) => {}
        Err(e) => tracing::debug!("settings unavailable, keeping local defaults: {e}"),
    }
}

fn open_store(cfg: &Config) -> anyhow::Result<ContactStore> {
    ContactStore::load(&cfg.contacts_file, &cfg.default_country_code).with_context(|| {
        format!(
            "Failed to load contacts from {}",
            cfg.contacts_file.display()
        )
    })
}

/// Convert a 1-based CLI index.
fn zero_based(index: usize) -> anyhow::Result<usize> {
    index
        .checked_sub(1)
        .context("contact numbers start at 1")
}

async fn status(api: Arc<ApiClient>, cfg: &Config, watch: bool) -> anyhow::Result<()> {
    if !watch {
        println!("{}", api.bot_status().await);
        return Ok(());
    }

    let monitor = StatusMonitor::new(api, cfg.status_poll_interval);
    let mut rx = monitor.subscribe();
    monitor.start().await;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *rx.borrow_and_update();
                println!("[{}] {current}", wab_core::utils::local_clock());
            }
        }
    }
    monitor.stop().await;
    Ok(())
}

async fn bot(api: &ApiClient, cmd: BotCommand) -> anyhow::Result<()> {
    let msg = match cmd {
        BotCommand::Init { headless } => api.initialize_bot(headless).await?,
        BotCommand::Close => api.close_bot().await?,
    };
    println!("{msg}");
    Ok(())
}

fn contacts(cfg: &Config, cmd: ContactsCommand) -> anyhow::Result<()> {
    let mut store = open_store(cfg)?;
    match cmd {
        ContactsCommand::List => {
            println!("{}", render::contacts_table(store.contacts()));
        }
        ContactsCommand::Add { numbers } => {
            let added = store.add_lines(&numbers.join("\n"))?;
            println!("Added {added} contacts");
        }
        ContactsCommand::Import { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let added = store.import_csv(&text)?;
            println!("Imported {added} contacts");
        }
        ContactsCommand::Edit {
            index,
            country_code,
            number,
            name,
        } => {
            store.edit(
                zero_based(index)?,
                ContactEdit {
                    country_code,
                    local_number: number,
                    name,
                },
            )?;
            println!("Contact updated");
        }
        ContactsCommand::Remove { index } => {
            let removed = store.remove(zero_based(index)?)?;
            println!("Removed {}", removed.phone);
        }
        ContactsCommand::RemoveSelected => {
            let n = store.remove_selected()?;
            println!("Removed {n} contacts");
        }
        ContactsCommand::Clear => {
            let n = store.clear()?;
            println!("Cleared {n} contacts");
        }
        ContactsCommand::Select { index } => {
            let now = store.toggle_select(zero_based(index)?)?;
            println!("{}", if now { "Selected" } else { "Unselected" });
        }
        ContactsCommand::SelectAll => {
            store.set_all_selected(true)?;
            println!("{} contacts selected", store.selected_count());
        }
        ContactsCommand::UnselectAll => {
            store.set_all_selected(false)?;
            println!("No contacts selected");
        }
    }
    Ok(())
}

fn job_from(content: Content, delay: Duration) -> anyhow::Result<SendJob> {
    let mut job = SendJob::new(content.message).with_delay(delay);
    if let Some(path) = content.attachment {
        let attachment = Attachment::from_path(&path)
            .with_context(|| format!("Cannot attach {}", path.display()))?;
        println!(
            "Attachment: {} ({}, {})",
            attachment.file_name,
            attachment.file_type,
            wab_core::utils::format_file_size(attachment.size)
        );
        job = job.with_attachment(attachment);
    }
    Ok(job)
}

fn bulk_sender(
    api: Arc<ApiClient>,
    store: ContactStore,
) -> (Arc<BulkSender>, mpsc::UnboundedReceiver<wab_core::orchestrator::RunEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sender = BulkSender::new(
        Arc::new(Mutex::new(store)),
        api.clone(),
        api.clone(),
        api,
    )
    .with_events(tx);
    (Arc::new(sender), rx)
}

async fn send(
    api: Arc<ApiClient>,
    cfg: &Config,
    phone: Option<String>,
    contact: Option<usize>,
    content: Content,
) -> anyhow::Result<()> {
    let job = job_from(content, cfg.message_delay)?;
    let (sender, rx) = bulk_sender(api, open_store(cfg)?);
    let renderer = tokio::spawn(render::run(rx));

    let result = match (contact, phone) {
        (Some(index), _) => sender.send_to_single(zero_based(index)?, job).await,
        (None, Some(phone)) => sender.send_direct(&phone, job).await,
        (None, None) => bail!("a phone number or --contact is required"),
    };

    drop(sender);
    let _ = renderer.await;
    if result? == ContactStatus::Failed {
        bail!("message was not delivered");
    }
    Ok(())
}

async fn bulk(
    api: Arc<ApiClient>,
    cfg: &Config,
    content: Content,
    delay: Option<u64>,
) -> anyhow::Result<()> {
    let delay = delay.map(Duration::from_secs).unwrap_or(cfg.message_delay);
    let job = job_from(content, delay)?;
    let (sender, rx) = bulk_sender(api, open_store(cfg)?);
    let renderer = tokio::spawn(render::run(rx));

    let controls = CancellationToken::new();
    let keys = tokio::spawn(drive_controls(
        sender.clone(),
        stdin_lines(),
        controls.clone(),
    ));
    let interrupt = {
        let sender = sender.clone();
        let cancel = controls.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("interrupt received, stopping after the current send");
                    sender.stop();
                }
            }
        })
    };

    println!("Controls: `p` + Enter pauses/resumes, `s` + Enter or Ctrl-C stops");
    let result = sender.start(job).await;

    controls.cancel();
    let _ = keys.await;
    let _ = interrupt.await;
    drop(sender);
    let _ = renderer.await;

    let summary = result?;
    if summary.sent == 0 && summary.failed > 0 {
        bail!("no messages were delivered");
    }
    Ok(())
}

/// Forward stdin lines from a plain thread.
///
/// The thread is never joined: a blocked read on tokio's stdin would keep the
/// runtime from shutting down once the run is over.
fn stdin_lines() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

#[derive(Debug, PartialEq, Eq)]
enum Control {
    TogglePause,
    Stop,
    Ignore,
    Unknown,
}

fn parse_control(line: &str) -> Control {
    match line.trim() {
        "p" | "P" => Control::TogglePause,
        "s" | "S" => Control::Stop,
        "" => Control::Ignore,
        _ => Control::Unknown,
    }
}

async fn drive_controls(
    sender: Arc<BulkSender>,
    mut lines: mpsc::UnboundedReceiver<String>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.recv() => {
                let Some(line) = line else {
                    break;
                };
                match parse_control(&line) {
                    Control::TogglePause => {
                        sender.toggle_pause();
                    }
                    Control::Stop => {
                        sender.stop();
                    }
                    Control::Ignore => {}
                    Control::Unknown => {
                        eprintln!("unknown control {:?} (use p or s)", line.trim())
                    }
                }
            }
        }
    }
}

async fn auto_send(api: &ApiClient, message: String, delay: u64) -> anyhow::Result<()> {
    let scan = api.scan_attachments().await.context("Scan failed")?;
    scan.ensure_sendable()?;

    let total = scan.statistics.matched;
    println!(
        "Sending to {total} contacts... Estimated time: {} seconds",
        total as u64 * delay
    );
    let report = api
        .auto_send_attachments(&AutoSendRequest { message, delay })
        .await
        .context("Automation failed")?;
    println!("{}", render::auto_send_report(&report));
    Ok(())
}

async fn server_contacts(api: &ApiClient, cmd: ServerContactsCommand) -> anyhow::Result<()> {
    match cmd {
        ServerContactsCommand::Add { name, phone } => {
            println!("{}", api.add_server_contact(&name, &phone).await?);
        }
        ServerContactsCommand::Delete { id } => {
            println!("{}", api.delete_server_contact(id).await?);
        }
        ServerContactsCommand::Import { file } => {
            let report = api.import_contacts_file(&file).await?;
            println!("{}", report.message);
        }
    }
    Ok(())
}
