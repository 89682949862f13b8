use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::BufReader;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use outreach::api::{ApiState, api_routes};
use outreach::attachments::{Attachment, load_dir};
use outreach::campaign::{Orchestrator, OrchestratorDeps, StartRequest};
use outreach::config::AppConfig;
use outreach::contacts::ContactImporter;
use outreach::dispatch::{DispatchClient, RelayCredentials, SmtpRelay};
use outreach::generation::GenerationClient;
use outreach::llm::create_provider;
use outreach::review::Reviewer;
use outreach::store::{ContactStore, InMemoryStore, TemplateStore};
use outreach::templates::{NewTemplate, Template};

/// What the session inputs put into the stores.
struct Seeded {
    template: Option<Template>,
    attachments: Vec<Attachment>,
    inline_image: Option<Attachment>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let config = AppConfig::from_env()?;

    // Initialize tracing; the guard flushes the file writer on exit.
    let (file_layer, _log_guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "outreach.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();

    let mode = std::env::args().nth(1).unwrap_or_else(|| "review".to_string());

    eprintln!("📬 Outreach v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.llm.model);
    eprintln!("   Relay: {}:{}", config.relay.host, config.relay.port);
    eprintln!("   Sender: {}", config.sender.display());

    // ── Collaborators ───────────────────────────────────────────────────
    let store = Arc::new(InMemoryStore::new());
    let llm = create_provider(&config.llm)?;
    let generator = Arc::new(GenerationClient::new(llm, config.generation.clone()));
    let dispatcher = Arc::new(DispatchClient::new(
        Arc::new(SmtpRelay::new(config.relay.clone())),
        store.clone(),
    ));
    let orchestrator = Orchestrator::new(OrchestratorDeps {
        owner_id: config.owner_id.clone(),
        sender: config.sender.clone(),
        contacts: store.clone(),
        templates: store.clone(),
        attachments: store.clone(),
        generator,
        dispatcher,
    });

    let seeded = seed(&config, &store).await?;

    match mode.as_str() {
        "serve" => serve(&config, store, orchestrator).await,
        "review" => review(&config, &store, orchestrator, seeded).await,
        other => {
            eprintln!("Unknown mode '{other}'. Use `review` (default) or `serve`.");
            std::process::exit(2);
        }
    }
}

/// Load the contact CSV, template file and attachment directory, if configured.
async fn seed(config: &AppConfig, store: &Arc<InMemoryStore>) -> anyhow::Result<Seeded> {
    let owner = config.owner_id.as_str();
    let inputs = &config.inputs;

    if let Some(path) = &inputs.contacts_csv {
        let payload = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading contacts from {}", path.display()))?;
        let report = ContactImporter::new(store.clone())
            .import(owner, &payload)
            .await
            .with_context(|| format!("importing {}", path.display()))?;
        eprintln!(
            "   Contacts: {} imported, {} duplicates, {} without email, {} bad rows",
            report.inserted,
            report.skipped_duplicates,
            report.dropped_without_email,
            report.row_errors.len()
        );
        for row in &report.row_errors {
            tracing::warn!(line = row.line, reason = %row.reason, "Skipped unreadable row");
        }
    }

    let template = match &inputs.template_file {
        Some(path) => Some(load_template(store, owner, path).await?),
        None => None,
    };

    let mut attachments = match &inputs.attachments_dir {
        Some(dir) => load_dir(store.as_ref(), owner, dir)
            .await
            .with_context(|| format!("registering attachments from {}", dir.display()))?,
        None => Vec::new(),
    };

    let inline_image = match &inputs.inline_image {
        Some(name) => {
            let pos = attachments
                .iter()
                .position(|a| &a.file_name == name)
                .with_context(|| format!("inline image '{name}' is not in the attachments dir"))?;
            Some(attachments.remove(pos))
        }
        None => None,
    };

    Ok(Seeded {
        template,
        attachments,
        inline_image,
    })
}

async fn load_template(
    store: &Arc<InMemoryStore>,
    owner: &str,
    path: &Path,
) -> anyhow::Result<Template> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading template {}", path.display()))?;
    let new: NewTemplate = serde_json::from_str(&raw)
        .with_context(|| format!("parsing template {}", path.display()))?;
    let template = TemplateStore::create(store.as_ref(), owner, new)
        .await
        .with_context(|| format!("storing template {}", path.display()))?;
    eprintln!("   Template: {}", template.name);
    Ok(template)
}

fn credentials_from_env() -> Option<RelayCredentials> {
    let username = std::env::var("SMTP_USERNAME").ok()?;
    let password = std::env::var("SMTP_PASSWORD").ok()?;
    Some(RelayCredentials::new(username, password))
}

/// Run the HTTP control API until the process is stopped.
async fn serve(
    config: &AppConfig,
    store: Arc<InMemoryStore>,
    orchestrator: Orchestrator,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = ApiState::new(
        config.owner_id.clone(),
        store.clone(),
        store.clone(),
        store,
        orchestrator,
    );
    let app = api_routes(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.api_port)).await?;
    eprintln!("   API: http://0.0.0.0:{}/api/campaign", config.api_port);
    tracing::info!(port = config.api_port, "API server started");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Run one campaign over every imported contact, reviewing drafts on stdin.
async fn review(
    config: &AppConfig,
    store: &Arc<InMemoryStore>,
    mut orchestrator: Orchestrator,
    seeded: Seeded,
) -> Result<(), Box<dyn std::error::Error>> {
    let contacts = ContactStore::list(store.as_ref(), &config.owner_id).await?;
    eprintln!("   Recipients: {}\n", contacts.len());

    let request = StartRequest {
        contact_ids: contacts.iter().map(|c| c.id).collect(),
        template_id: seeded.template.map(|t| t.id),
        attachment_ids: seeded.attachments.iter().map(|a| a.id).collect(),
        inline_image_id: seeded.inline_image.map(|a| a.id),
        credentials: credentials_from_env(),
    };

    if let Err(e) = orchestrator.start(request).await {
        eprintln!("Cannot start campaign: {e}");
        eprintln!("  Set OUTREACH_CONTACTS_CSV, OUTREACH_TEMPLATE_FILE, SMTP_USERNAME and SMTP_PASSWORD.");
        std::process::exit(1);
    }

    let mut reviewer = Reviewer::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout());
    reviewer.run(&mut orchestrator).await?;
    Ok(())
}
