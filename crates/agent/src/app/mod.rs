mod toast;

use std::{
    io::Write,
    sync::Arc,
    time::Duration,
};

use chrono_tz::Tz;
use review::{
    Action, FormField, NextRecord, Presentation, ReviewError, ReviewFormState, ReviewSession,
    dates::SystemClock,
};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{
    client::Client,
    command::{self, Command},
    config::AppConfig,
    error::{AppError, Result},
    local_state::LocalState,
};

use toast::{ToastLevel, ToastNotifier};

pub struct App {
    session: ReviewSession,
    toasts: Arc<ToastNotifier>,
    should_quit: bool,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        let mut local = LocalState::load(&config.session_path)?;
        let context = local.agent_context(config.agent_id).ok_or_else(|| {
            AppError::Setup("no agent identity: log in first or pass --agent-id".to_string())
        })?;
        if let Some(agent_id) = config.agent_id {
            if local.remember(agent_id) {
                local.save(&config.session_path)?;
            }
        }

        let timezone = config
            .timezone
            .as_deref()
            .map(str::parse::<Tz>)
            .transpose()
            .map_err(|err| AppError::Setup(format!("invalid timezone: {err}")))?;

        let client = Arc::new(Client::new(
            &config.base_url,
            config.api_token.as_deref(),
            Duration::from_secs(config.timeout_secs),
        )?);
        let toasts = Arc::new(ToastNotifier::default());

        let session = ReviewSession::builder()
            .context(context)
            .directory(client.clone())
            .queue(client.clone())
            .loyalty(client.clone())
            .rejections(client)
            .notifier(toasts.clone())
            .clock(Arc::new(SystemClock::new(timezone)))
            .build()?;

        Ok(Self {
            session,
            toasts,
            should_quit: false,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        match self.session.start().await {
            Ok(next) => tracing::debug!(?next, "session started"),
            Err(err) => self.toasts.push(ToastLevel::Error, "Error", message_for_error(&err)),
        }
        if let Err(err) = self.session.refresh_count().await {
            tracing::warn!("failed to refresh pending count: {err}");
        }
        self.render()?;

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while !self.should_quit {
            prompt()?;
            let Some(line) = lines.next_line().await? else {
                break;
            };
            self.handle_line(&line).await?;
            self.flush_toasts()?;
        }

        self.session.shutdown().await;
        Ok(())
    }

    async fn handle_line(&mut self, line: &str) -> Result<()> {
        let command = match command::parse(line) {
            Ok(command) => command,
            Err(message) => {
                self.toasts.push(ToastLevel::Info, "", message);
                return Ok(());
            }
        };

        match command {
            Command::Show => self.render()?,
            Command::Set(field, value) => match self.session.edit(field, &value) {
                Ok(()) => self.render()?,
                Err(err) => self
                    .toasts
                    .push(ToastLevel::Error, "Error", format!("Valor no valido: {err}")),
            },
            Command::Approve => self.transition(Action::Approve, None).await?,
            Command::Reject(reason) => self.transition(Action::Reject, Some(reason.as_str())).await?,
            Command::Skip => self.transition(Action::Skip, None).await?,
            Command::Reload => match self.session.reload().await {
                Ok(_) => self.render()?,
                Err(err) => self
                    .toasts
                    .push(ToastLevel::Error, "Error", message_for_error(&err)),
            },
            Command::Count => match self.session.refresh_count().await {
                Ok(count) => self.toasts.push(
                    ToastLevel::Info,
                    "",
                    format!("Facturas pendientes: {count}"),
                ),
                Err(err) => self
                    .toasts
                    .push(ToastLevel::Error, "Error", message_for_error(&err)),
            },
            Command::Help => {
                let mut out = std::io::stdout().lock();
                writeln!(out, "{}", command::HELP)?;
            }
            Command::Quit => self.should_quit = true,
        }

        Ok(())
    }

    async fn transition(&mut self, action: Action, reason: Option<&str>) -> Result<()> {
        match self.session.submit(action, reason).await {
            Ok(report) => {
                if let NextRecord::Failed(err) = &report.next {
                    tracing::warn!("next invoice unavailable: {err}");
                }
                self.flush_toasts()?;
                self.render()?;
            }
            // The notifier already told the agent.
            Err(ReviewError::Update(_)) => {}
            Err(err) => self
                .toasts
                .push(ToastLevel::Error, "Error", message_for_error(&err)),
        }
        Ok(())
    }

    fn render(&self) -> Result<()> {
        let screen = render_form(self.session.forms(), self.session.badge().current());
        let mut out = std::io::stdout().lock();
        writeln!(out, "{screen}")?;
        Ok(())
    }

    fn flush_toasts(&self) -> Result<()> {
        let mut out = std::io::stdout().lock();
        for toast in self.toasts.take() {
            writeln!(out, "{}", toast.render())?;
        }
        Ok(())
    }
}

fn prompt() -> Result<()> {
    let mut out = std::io::stdout().lock();
    write!(out, "> ")?;
    out.flush()?;
    Ok(())
}

fn render_form(forms: &ReviewFormState, pending: u64) -> String {
    let mut lines = Vec::new();
    match forms.presentation() {
        Presentation::Loading => lines.push("Cargando...".to_string()),
        Presentation::Empty => lines.push("No hay facturas pendientes.".to_string()),
        Presentation::Failed(message) => lines.push(format!("Error: {message}")),
        Presentation::Ready => {
            if let Some(record) = forms.record() {
                lines.push(format!(
                    "Factura #{} (cliente {})",
                    record.id, record.id_client
                ));
                lines.push(format!("  imagen: {}", record.invoice_url));
            }
            let form = forms.form();
            for field in FormField::ALL {
                let marker = if form.is_blank(field) { "*" } else { " " };
                lines.push(format!("{marker} {:<14} {}", field.label(), form.text(field)));
            }
        }
    }
    lines.push(format!("Pendientes: {pending}"));
    lines.join("\n")
}

fn message_for_error(err: &ReviewError) -> String {
    match err {
        ReviewError::Validation(gap) => {
            let names: Vec<&str> = gap.missing.iter().map(|field| field.label()).collect();
            format!("Complete los campos obligatorios: {}", names.join(", "))
        }
        ReviewError::MissingRejectReason => "Indique el motivo del rechazo.".to_string(),
        ReviewError::NoPendingRecord => "No hay facturas pendientes.".to_string(),
        ReviewError::SubmissionInFlight => "Ya se esta enviando la factura.".to_string(),
        ReviewError::Update(_) => review::services::UPDATE_FAILED_MESSAGE.to_string(),
        ReviewError::Load(err) => format!("No se pudo cargar la factura: {err}"),
        ReviewError::ClockOutOfRange(now) => format!("Fecha del sistema no valida: {now}"),
        ReviewError::MissingCollaborator(name) => format!("Configuracion incompleta: {name}"),
    }
}
