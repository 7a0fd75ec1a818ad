use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use resume_builder::auth::TokenStore;
use resume_builder::config::Config;
use resume_builder::store::HttpResumeStore;
use resume_builder::wizard::Wizard;
use resume_builder::ResumeSession;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("resume_builder={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume builder v{}", env!("CARGO_PKG_VERSION"));

    let token_store = TokenStore::new(&config.session_file);
    let tokens = token_store.load().context("loading saved session")?;
    if tokens.is_none() {
        warn!(
            "no session at {}; requests will be anonymous",
            token_store.path().display()
        );
    }

    let store = HttpResumeStore::new(&config.api_url, tokens.map(|t| t.access))
        .context("building Resume Store client")?;
    info!("Resume Store at {}", store.base_url());

    let session = ResumeSession::new(Arc::new(store), &config.sync);
    let loaded = match session.load().await {
        Ok(loaded) => Some(loaded),
        Err(e) => {
            warn!("could not load resume: {}", e.message);
            None
        }
    };

    let profile = session.snapshot();
    let wizard = Wizard::default();
    println!("Steps:");
    for step in wizard.completion(&profile) {
        let mark = if step.complete { "x" } else { " " };
        println!("  [{mark}] {}. {}", step.step, step.title);
    }
    if let Some(loaded) = &loaded {
        for (section, percent) in &loaded.progress {
            println!("  {section}: {percent:.0}%");
        }
    }

    let preview = session.preview();
    println!();
    if preview.is_empty() {
        println!("No content yet");
    } else {
        print!("{}", preview.render_text());
        println!();
        println!("Export as {}", preview.export_file_name());
    }

    Ok(())
}
