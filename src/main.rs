use std::sync::Arc;

use lead_intake::api::lead_routes;
use lead_intake::channels::{ChannelManager, ChannelSlot};
use lead_intake::config::AppConfig;
use lead_intake::gate::AbuseGate;
use lead_intake::pipeline::LeadDispatcher;

#[tokio::main]
async fn main() -> lead_intake::error::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env()?;

    eprintln!("📋 Lead Intake v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Lead API: http://0.0.0.0:{}/api/lead", config.port);

    // ── Abuse gate ──────────────────────────────────────────────────────
    let gate = AbuseGate::from_config(&config.gate)?;
    if gate.is_bypass() {
        tracing::warn!("CAPTCHA_BYPASS is set — leads are accepted without bot verification");
        eprintln!("   Captcha: BYPASSED (development mode)");
    } else {
        eprintln!(
            "   Captcha: enabled (min score: {})",
            config
                .gate
                .min_score
                .map(|s| s.to_string())
                .unwrap_or_else(|| "off".to_string())
        );
    }

    // ── Channels ────────────────────────────────────────────────────────
    let channels = ChannelManager::from_config(&config);
    for slot in channels.slots() {
        match slot {
            ChannelSlot::Active(_) => eprintln!("   {}: enabled", slot.name()),
            ChannelSlot::Disabled { name, reason } => {
                tracing::warn!(channel = %name, reason = %reason, "Channel not configured, notifications will be skipped");
                eprintln!("   {}: disabled ({})", name, reason);
            }
        }
    }

    let dispatcher = Arc::new(LeadDispatcher::new(gate, channels, config.dispatch.clone()));
    let app = lead_routes(dispatcher);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!(port = config.port, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}
